//! Blocking selection menu drawn straight onto the terminal.
//!
//! Buttons carry callbacks; Enter runs the highlighted one. A callback closes
//! the menu by calling [`MenuControl::exit`], and its return value becomes
//! the menu's result.

mod intent;
mod reducer;
mod state;

pub use intent::MenuIntent;
pub use reducer::MenuReducer;
pub use state::MenuState;

use std::io;

use thiserror::Error;
use tracing::debug;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;

use crate::ui::backend::{MenuBackend, MenuKey};
use crate::ui::mvi::Reducer;
use crate::ui::theme;

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Menu has no buttons")]
    NoButtons,

    #[error("Initial selection {index} is out of range for {len} buttons")]
    SelectionOutOfRange { index: usize, len: usize },

    #[error("Menu interrupted")]
    Interrupted,

    #[error("Terminal error: {0}")]
    Io(#[from] io::Error),
}

/// Decorative text drawn in a fixed style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuText {
    pub label: String,
    pub x: u16,
    pub y: u16,
    pub style: Style,
}

impl MenuText {
    pub fn new(label: impl Into<String>, x: u16, y: u16) -> Self {
        Self {
            label: label.into(),
            x,
            y,
            style: theme::TITLE,
        }
    }
}

/// Handed to a button callback so it can close the menu.
#[derive(Debug, Default)]
pub struct MenuControl {
    exit: bool,
}

impl MenuControl {
    pub fn exit(&mut self) {
        self.exit = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

type Callback<T> = Box<dyn FnMut(&mut MenuControl) -> Option<T>>;

/// A selectable entry. Drawn with `hover_label` in `hover_style` while
/// highlighted.
pub struct Button<T> {
    pub label: String,
    pub hover_label: String,
    pub x: u16,
    pub y: u16,
    pub style: Style,
    pub hover_style: Style,
    callback: Callback<T>,
}

impl<T> Button<T> {
    pub fn new<F>(
        label: impl Into<String>,
        hover_label: impl Into<String>,
        x: u16,
        y: u16,
        callback: F,
    ) -> Self
    where
        F: FnMut(&mut MenuControl) -> Option<T> + 'static,
    {
        Self {
            label: label.into(),
            hover_label: hover_label.into(),
            x,
            y,
            style: theme::QUEUE_ITEM,
            hover_style: theme::QUEUE_ITEM_HOVER,
            callback: Box::new(callback),
        }
    }

    pub fn styles(mut self, style: Style, hover_style: Style) -> Self {
        self.style = style;
        self.hover_style = hover_style;
        self
    }
}

/// One menu invocation: set up, then [`TerminalMenu::run`] consumes it.
pub struct TerminalMenu<T> {
    texts: Vec<MenuText>,
    buttons: Vec<Button<T>>,
    initial: usize,
}

impl<T> Default for TerminalMenu<T> {
    fn default() -> Self {
        Self {
            texts: Vec::new(),
            buttons: Vec::new(),
            initial: 0,
        }
    }
}

impl<T> TerminalMenu<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_text(&mut self, text: MenuText) {
        self.texts.push(text);
    }

    /// Add a button and return its index in insertion order.
    pub fn add_button(&mut self, button: Button<T>) -> usize {
        self.buttons.push(button);
        self.buttons.len() - 1
    }

    /// Highlight the button at `index` (insertion order) when the menu opens.
    pub fn select(&mut self, index: usize) {
        self.initial = index;
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    /// Draw every element for `state` into `area` of `buf`.
    ///
    /// Elements starting outside `area` are skipped; long labels are clipped
    /// at the right edge.
    pub fn render(&self, state: &MenuState, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, theme::BACKGROUND);
        for text in &self.texts {
            put(buf, area, text.x, text.y, &text.label, text.style);
        }
        for (index, button) in self.buttons.iter().enumerate() {
            if state.is_selected(index) {
                put(buf, area, button.x, button.y, &button.hover_label, button.hover_style);
            } else {
                put(buf, area, button.x, button.y, &button.label, button.style);
            }
        }
    }

    /// Run the input loop until a callback requests exit.
    ///
    /// Buttons are ordered top to bottom before the first draw; the initial
    /// selection follows its button. Returns the payload of the callback
    /// that closed the menu.
    pub fn run<B: MenuBackend>(mut self, backend: &mut B) -> Result<Option<T>, MenuError> {
        let len = self.buttons.len();
        if len == 0 {
            return Err(MenuError::NoButtons);
        }
        if self.initial >= len {
            return Err(MenuError::SelectionOutOfRange {
                index: self.initial,
                len,
            });
        }

        let selected = self.sort_buttons();
        let mut state = MenuReducer::reduce(MenuState::default(), MenuIntent::Setup { len, selected });

        self.draw(backend, &state)?;
        let result = loop {
            let intent = match backend.read_key()? {
                MenuKey::Up => MenuIntent::MoveUp,
                MenuKey::Down => MenuIntent::MoveDown,
                MenuKey::Enter => {
                    let mut control = MenuControl::default();
                    let payload = (self.buttons[state.selected].callback)(&mut control);
                    if control.exit_requested() {
                        state = MenuReducer::reduce(state, MenuIntent::RequestExit);
                        debug!(selected = state.selected, "Menu closed");
                        break payload;
                    }
                    self.draw(backend, &state)?;
                    continue;
                }
                MenuKey::Resize => {
                    self.draw(backend, &state)?;
                    continue;
                }
                MenuKey::Interrupt => return Err(MenuError::Interrupted),
                MenuKey::Other => continue,
            };

            state = MenuReducer::reduce(state, intent);
            self.draw(backend, &state)?;
        };

        Ok(result)
    }

    /// Stable sort by row; returns where the initial button ended up.
    fn sort_buttons(&mut self) -> usize {
        let mut indexed: Vec<(usize, Button<T>)> = self.buttons.drain(..).enumerate().collect();
        indexed.sort_by_key(|(_, button)| button.y);

        let mut selected = 0;
        for (position, (original, button)) in indexed.into_iter().enumerate() {
            if original == self.initial {
                selected = position;
            }
            self.buttons.push(button);
        }
        selected
    }

    fn draw<B: MenuBackend>(&self, backend: &mut B, state: &MenuState) -> Result<(), MenuError> {
        backend.draw(&|area, buf| self.render(state, area, buf))?;
        Ok(())
    }
}

fn put(buf: &mut Buffer, area: Rect, x: u16, y: u16, label: &str, style: Style) {
    let (x, y) = (area.x.saturating_add(x), area.y.saturating_add(y));
    if x >= area.right() || y >= area.bottom() {
        return;
    }
    buf.set_stringn(x, y, label, usize::from(area.right() - x), style);
}

const TITLE: &str = "lanekeeper";
const FIRST_ITEM_ROW: u16 = 3;

/// Let the operator pick one of `entries`, each `(queue, preselected)`.
///
/// An Exit entry sits near the bottom of the screen. Returns `None` when Exit
/// is chosen.
pub fn choose_queue<B: MenuBackend>(
    entries: &[(String, bool)],
    backend: &mut B,
) -> Result<Option<String>, MenuError> {
    let (_, height) = backend.size()?;
    let mut menu = TerminalMenu::new();
    menu.add_text(MenuText::new(TITLE, 2, 1));

    for (offset, (queue, preselected)) in entries.iter().enumerate() {
        let payload = queue.clone();
        let index = menu.add_button(Button::new(
            format!("  {queue}"),
            format!("> {queue}"),
            2,
            FIRST_ITEM_ROW + offset as u16,
            move |control| {
                control.exit();
                Some(payload.clone())
            },
        ));
        if *preselected {
            menu.select(index);
        }
    }

    let below_items = FIRST_ITEM_ROW + entries.len() as u16 + 1;
    let exit_row = height.saturating_sub(2).max(below_items);
    menu.add_button(
        Button::new("  Exit", "> Exit", 2, exit_row, |control| {
            control.exit();
            None
        })
        .styles(theme::EXIT_ITEM, theme::EXIT_ITEM_HOVER),
    );

    menu.run(backend)
}
