use ratatui::style::{Color, Style};

pub const BACKGROUND: Style = Style::new().fg(Color::White).bg(Color::Black);
pub const TITLE: Style = Style::new().fg(Color::White).bg(Color::Black);
pub const QUEUE_ITEM: Style = Style::new().fg(Color::Green).bg(Color::Black);
pub const QUEUE_ITEM_HOVER: Style = Style::new().fg(Color::Black).bg(Color::Green);
pub const EXIT_ITEM: Style = Style::new().fg(Color::Red).bg(Color::Black);
pub const EXIT_ITEM_HOVER: Style = Style::new().fg(Color::Black).bg(Color::Red);
