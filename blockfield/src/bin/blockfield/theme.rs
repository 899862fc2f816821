//! Colours for CLI output.
//!
//! Store rows and scope listings are tinted by who a value belongs to, so a
//! dump shows at a glance which entries are shared and which are per user.

use blockfield::{Scope, UserScope};
use colored::Color;
use comfy_table::Color as CellColor;
use once_cell::sync::Lazy;

/// Kinds of one-line message the CLI prints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    Done,
    Caution,
    Note,
    Failure,
    Trace,
}

impl Notice {
    pub fn marker(self) -> &'static str {
        match self {
            Notice::Done => "✓",
            Notice::Caution => "⚠",
            Notice::Note => "ℹ",
            Notice::Failure => "✗",
            Notice::Trace => "→",
        }
    }
}

pub struct Palette {
    pub done: Color,
    pub caution: Color,
    pub note: Color,
    pub failure: Color,
    pub trace: Color,
    pub heading: Color,
    pub label: Color,
    pub shared: CellColor,
    pub per_user: CellColor,
    pub aggregate: CellColor,
    pub structural: CellColor,
}

impl Palette {
    pub fn notice(&self, notice: Notice) -> Color {
        match notice {
            Notice::Done => self.done,
            Notice::Caution => self.caution,
            Notice::Note => self.note,
            Notice::Failure => self.failure,
            Notice::Trace => self.trace,
        }
    }

    /// Cell colour for values stored under `scope`.
    pub fn owner(&self, scope: Scope) -> CellColor {
        if scope.is_structural() {
            return self.structural;
        }
        match scope.user() {
            UserScope::None => self.shared,
            UserScope::One => self.per_user,
            UserScope::All => self.aggregate,
        }
    }
}

pub static PALETTE: Lazy<Palette> = Lazy::new(|| Palette {
    done: Color::Green,
    caution: Color::Yellow,
    note: Color::Blue,
    failure: Color::Red,
    trace: Color::BrightBlack,
    heading: Color::BrightBlue,
    label: Color::BrightCyan,
    shared: CellColor::Green,
    per_user: CellColor::Magenta,
    aggregate: CellColor::Yellow,
    structural: CellColor::DarkGrey,
});
