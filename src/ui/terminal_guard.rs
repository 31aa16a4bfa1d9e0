//! Terminal modes held while the queue menu is on screen.

use std::io::{self, Stdout};
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::cursor::{Hide, Show};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear as TermClear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

pub type MenuTerminal = Terminal<CrosstermBackend<Stdout>>;

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Runs `on_panic` before the previous panic hook for as long as it lives.
///
/// Dropping it reinstates the previous hook, so opening the menu repeatedly
/// does not stack hooks. Hooks installed by others in the meantime are
/// discarded on drop.
pub struct PanicHookScope {
    previous: Option<Arc<PanicHook>>,
}

impl PanicHookScope {
    pub fn install<F>(on_panic: F) -> Self
    where
        F: Fn() + Sync + Send + 'static,
    {
        let previous = Arc::new(panic::take_hook());
        let chained = Arc::clone(&previous);
        panic::set_hook(Box::new(move |info| {
            on_panic();
            chained(info);
        }));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for PanicHookScope {
    fn drop(&mut self) {
        // The hook cannot be swapped from a panicking thread.
        if std::thread::panicking() {
            return;
        }
        let Some(previous) = self.previous.take() else {
            return;
        };
        drop(panic::take_hook());
        match Arc::try_unwrap(previous) {
            Ok(hook) => panic::set_hook(hook),
            Err(shared) => panic::set_hook(Box::new(move |info| shared(info))),
        }
    }
}

/// Raw mode plus the alternate screen, left at most once: by
/// [`MenuScreen::leave`], on drop, or from the panic hook.
pub struct MenuScreen {
    active: Arc<AtomicBool>,
    _hook: PanicHookScope,
}

impl MenuScreen {
    pub fn leave(&self) {
        leave_once(&self.active, restore_terminal);
    }
}

impl Drop for MenuScreen {
    fn drop(&mut self) {
        self.leave();
    }
}

fn leave_once(active: &AtomicBool, restore: impl FnOnce()) {
    if active.swap(false, Ordering::SeqCst) {
        restore();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = stdout.execute(LeaveAlternateScreen);
    let _ = stdout.execute(Show);
}

/// Take over the terminal for the menu: raw mode, alternate screen, hidden
/// cursor.
///
/// The screen is armed as soon as raw mode is on, so a failure in a later
/// step still hands back a cooked terminal.
pub fn enter_menu_screen() -> io::Result<(MenuTerminal, MenuScreen)> {
    enable_raw_mode()?;
    let active = Arc::new(AtomicBool::new(true));
    let on_panic = Arc::clone(&active);
    let screen = MenuScreen {
        active,
        _hook: PanicHookScope::install(move || leave_once(&on_panic, restore_terminal)),
    };

    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(TermClear(ClearType::All))?;
    stdout.execute(Hide)?;

    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok((terminal, screen))
}
