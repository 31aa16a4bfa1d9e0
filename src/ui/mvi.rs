//! Model-View-Intent primitives for terminal screens.
//!
//! ```text
//! key ──→ Intent ──→ Reducer ──→ State ──→ render
//! ```
//!
//! Reducers are pure; side effects such as button callbacks happen in the
//! screen's input loop, which then feeds the outcome back as an intent.

/// Marker trait for screen state.
///
/// States are plain values: cloned to produce the next state and compared to
/// detect changes.
pub trait UiState: Clone + PartialEq + Default + Send + 'static {}

/// Marker trait for user actions and events fed to a reducer.
pub trait Intent: Send + 'static {}

/// The only place where screen state changes.
pub trait Reducer {
    type State: UiState;
    type Intent: Intent;

    /// Pure `(State, Intent) -> State`.
    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State;
}
