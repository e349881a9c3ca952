//! User-facing diagnostics
//!
//! Everything here goes to stderr: stdout belongs to the remote command.

use std::io::Write;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::tty::IsTty;

use ng_core::SessionError;

use crate::session::ExitResult;

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    print_prefixed(Color::Red, "✗", msg);
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    print_prefixed(Color::Yellow, "⚠", msg);
}

/// Colour only when stderr is a terminal, so redirected logs stay plain
fn print_prefixed(color: Color, symbol: &str, msg: &str) {
    let mut stderr = std::io::stderr();
    if stderr.is_tty() {
        let _ = crossterm::execute!(
            stderr,
            SetForegroundColor(color),
            Print(symbol),
            Print(" "),
            ResetColor,
            Print(msg),
            Print("\n")
        );
    } else {
        let _ = writeln!(stderr, "{} {}", symbol, msg);
    }
}

/// One-line description of a session failure
pub fn describe(error: &SessionError) -> String {
    match error {
        SessionError::Protocol(inner) => format!("protocol violation from server: {}", inner),
        SessionError::Transport(inner) => format!("connection to server lost: {}", inner),
        other => other.to_string(),
    }
}

/// Report the failures carried by a finished session
pub fn report(result: &ExitResult) {
    if let Some(error) = &result.error {
        print_error(&describe(error));
    }
    if let Some(error) = &result.input_error {
        print_warning(&format!("stdin was not fully forwarded: {}", error));
    }
}
