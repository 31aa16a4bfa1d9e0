pub mod backend;
pub mod menu;
pub mod mvi;
pub mod terminal_guard;
pub mod theme;
