//! Terminal access for the menu: draw a frame, read one key at a time.

use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use crate::ui::terminal_guard::{enter_menu_screen, MenuScreen, MenuTerminal};

/// Keys the menu reacts to. Everything else maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    Up,
    Down,
    Enter,
    /// The terminal was resized; redraw.
    Resize,
    /// Ctrl+C. Raw mode swallows SIGINT, so the menu handles it.
    Interrupt,
    Other,
}

impl From<KeyEvent> for MenuKey {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Up => MenuKey::Up,
            KeyCode::Down => MenuKey::Down,
            KeyCode::Enter => MenuKey::Enter,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                MenuKey::Interrupt
            }
            _ => MenuKey::Other,
        }
    }
}

/// Draws into a full-screen buffer.
pub type RenderFn<'a> = dyn Fn(Rect, &mut Buffer) + 'a;

pub trait MenuBackend {
    /// Terminal size as `(columns, rows)`.
    fn size(&self) -> io::Result<(u16, u16)>;

    fn draw(&mut self, render: &RenderFn<'_>) -> io::Result<()>;

    /// Block until the next key press.
    fn read_key(&mut self) -> io::Result<MenuKey>;
}

/// Production backend on stdout.
///
/// The terminal is in raw mode on the alternate screen for as long as this
/// value lives.
pub struct CrosstermMenuBackend {
    terminal: MenuTerminal,
    screen: MenuScreen,
}

impl CrosstermMenuBackend {
    pub fn open() -> io::Result<Self> {
        let (terminal, screen) = enter_menu_screen()?;
        Ok(Self { terminal, screen })
    }

    /// Give the terminal back before the backend is dropped.
    pub fn restore(&self) {
        self.screen.leave();
    }
}

impl MenuBackend for CrosstermMenuBackend {
    fn size(&self) -> io::Result<(u16, u16)> {
        let size = self.terminal.size()?;
        Ok((size.width, size.height))
    }

    fn draw(&mut self, render: &RenderFn<'_>) -> io::Result<()> {
        self.terminal.draw(|frame| render(frame.area(), frame.buffer_mut()))?;
        Ok(())
    }

    fn read_key(&mut self) -> io::Result<MenuKey> {
        loop {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(key.into()),
                Event::Resize(_, _) => return Ok(MenuKey::Resize),
                _ => {}
            }
        }
    }
}
