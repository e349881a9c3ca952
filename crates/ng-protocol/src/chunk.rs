//! Chunk types for the nailgun protocol
//!
//! Every chunk carries a single ASCII tag identifying what its payload means.
//! The tag set is closed: anything not listed in [`ChunkType`] is a protocol
//! violation.
//!
//! # Message Flow
//!
//! A single invocation over one connection:
//!
//! 1. Client sends one `Argument` per forwarded argument
//! 2. Client sends one `Environment` per `NAME=VALUE` entry
//! 3. Client sends `WorkingDirectory`, then `Command` (the server starts here)
//! 4. Server streams `Stdout` / `Stderr` blocks, optionally `StartInput`
//! 5. Client streams `Stdin` blocks followed by one empty `StdinEof`
//! 6. Server sends `Exit` with the decimal exit code and the exchange ends

use std::fmt;

/// Chunk type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChunkType {
    /// One command-line argument
    Argument = b'A',
    /// One `NAME=VALUE` environment entry
    Environment = b'E',
    /// Absolute working directory of the caller
    WorkingDirectory = b'D',
    /// Command to run; ends the request phase
    Command = b'C',
    /// A block of standard input
    Stdin = b'0',
    /// End of standard input (empty payload)
    StdinEof = b'.',
    /// A block of standard output
    Stdout = b'1',
    /// A block of standard error
    Stderr = b'2',
    /// Server is ready to receive input (empty payload)
    StartInput = b'S',
    /// Exit status as decimal text
    Exit = b'X',
}

/// Which side of the connection emits a chunk type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl ChunkType {
    /// Every chunk type, in tag order of the protocol table
    pub const ALL: [ChunkType; 10] = [
        ChunkType::Argument,
        ChunkType::Environment,
        ChunkType::WorkingDirectory,
        ChunkType::Command,
        ChunkType::Stdin,
        ChunkType::StdinEof,
        ChunkType::Stdout,
        ChunkType::Stderr,
        ChunkType::StartInput,
        ChunkType::Exit,
    ];

    /// Convert to the wire tag
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from the wire tag
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            b'A' => Some(Self::Argument),
            b'E' => Some(Self::Environment),
            b'D' => Some(Self::WorkingDirectory),
            b'C' => Some(Self::Command),
            b'0' => Some(Self::Stdin),
            b'.' => Some(Self::StdinEof),
            b'1' => Some(Self::Stdout),
            b'2' => Some(Self::Stderr),
            b'S' => Some(Self::StartInput),
            b'X' => Some(Self::Exit),
            _ => None,
        }
    }

    /// Side of the connection that sends this chunk type
    pub fn direction(&self) -> Direction {
        match self {
            Self::Argument
            | Self::Environment
            | Self::WorkingDirectory
            | Self::Command
            | Self::Stdin
            | Self::StdinEof => Direction::ClientToServer,
            Self::Stdout | Self::Stderr | Self::StartInput | Self::Exit => {
                Direction::ServerToClient
            }
        }
    }

    /// Whether the payload of this chunk type must be empty
    pub fn requires_empty_payload(&self) -> bool {
        matches!(self, Self::StdinEof | Self::StartInput)
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ('{}')", self, self.as_u8() as char)
    }
}
