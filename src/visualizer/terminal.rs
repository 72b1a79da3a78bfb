//! Terminal control strategies.
//!
//! Rendering produces plain text; everything that moves or hides the cursor
//! lives here so frames can be produced and inspected without a terminal.

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    terminal::{Clear, ClearType},
    Command,
};

/// Escape sequences emitted around rendered output.
pub trait TerminalControl: Send + Sync {
    /// Written before every frame: cursor to the canvas origin, cursor hidden.
    fn frame_prefix(&self) -> String;

    /// Written before the now-playing line: cursor to the top row, line cleared.
    fn header_prefix(&self) -> String;

    fn clear_screen(&self) -> String;

    /// Makes the cursor visible again.
    fn restore_cursor(&self) -> String;
}

/// ANSI escape sequences, generated from crossterm commands.
///
/// The header occupies the first row and the canvas starts on the second.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiTerminal;

impl TerminalControl for AnsiTerminal {
    fn frame_prefix(&self) -> String {
        let mut out = ansi(MoveTo(0, 1));
        out.push_str(&ansi(Hide));
        out
    }

    fn header_prefix(&self) -> String {
        let mut out = ansi(MoveTo(0, 0));
        out.push_str(&ansi(Clear(ClearType::UntilNewLine)));
        out
    }

    fn clear_screen(&self) -> String {
        ansi(Clear(ClearType::All))
    }

    fn restore_cursor(&self) -> String {
        ansi(Show)
    }
}

/// No escape sequences at all; frames are written back to back.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTerminal;

impl TerminalControl for PlainTerminal {
    fn frame_prefix(&self) -> String {
        String::new()
    }

    fn header_prefix(&self) -> String {
        String::new()
    }

    fn clear_screen(&self) -> String {
        String::new()
    }

    fn restore_cursor(&self) -> String {
        String::new()
    }
}

fn ansi(command: impl Command) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = command.write_ansi(&mut out);
    out
}
