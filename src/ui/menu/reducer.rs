use crate::ui::menu::intent::MenuIntent;
use crate::ui::menu::state::MenuState;
use crate::ui::mvi::Reducer;

/// Cyclic navigation over the menu's buttons.
pub struct MenuReducer;

impl Reducer for MenuReducer {
    type State = MenuState;
    type Intent = MenuIntent;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            MenuIntent::Setup { len, selected } => MenuState {
                selected: if selected < len { selected } else { 0 },
                len,
                exit_requested: false,
            },
            MenuIntent::MoveUp if state.len > 0 => MenuState {
                selected: (state.selected + state.len - 1) % state.len,
                ..state
            },
            MenuIntent::MoveDown if state.len > 0 => MenuState {
                selected: (state.selected + 1) % state.len,
                ..state
            },
            MenuIntent::MoveUp | MenuIntent::MoveDown => state,
            MenuIntent::RequestExit => MenuState {
                exit_requested: true,
                ..state
            },
        }
    }
}
