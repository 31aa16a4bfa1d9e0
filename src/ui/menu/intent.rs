use crate::ui::mvi::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuIntent {
    /// Start a menu with `len` buttons, highlighting `selected`.
    Setup { len: usize, selected: usize },
    MoveUp,
    MoveDown,
    /// A button callback asked the menu to close.
    RequestExit,
}

impl Intent for MenuIntent {}
