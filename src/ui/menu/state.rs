use crate::ui::mvi::UiState;

/// Selection state of a running menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuState {
    /// Index of the highlighted button.
    pub selected: usize,
    /// Number of buttons; never zero once set up.
    pub len: usize,
    pub exit_requested: bool,
}

impl UiState for MenuState {}

impl MenuState {
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected == index
    }
}
