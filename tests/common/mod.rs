//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lanekeeper::config::{QueueDef, Settings};
use lanekeeper::lifecycle::{Pause, Tick};
use lanekeeper::shutdown::StopSignal;
use lanekeeper::ui::backend::{MenuBackend, MenuKey, RenderFn};
use lanekeeper::worker::{DiscoveredQueues, Worker};
use parking_lot::Mutex;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use tempfile::TempDir;

/// Write `content` to `lanekeeper.toml` in a fresh temp dir.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("lanekeeper.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

/// Settings for a single-run, no-sleep, no-exit run of `queue`.
pub fn quick_settings(queue: Option<&str>) -> Settings {
    let mut settings = Settings::default();
    settings.run.queue = queue.map(str::to_string);
    settings.run.sleep_min = 0.0;
    settings.run.sleep_max = 0.0;
    settings.run.exit_on_finish = false;
    settings.run.exit_delay = 0.0;
    settings
}

// -- Worker mocks -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickRecord {
    pub queue: String,
    pub index: u64,
    pub first: bool,
}

/// Records every tick; fails the ticks listed in `fail_on` and raises `stop`
/// after `stop_after` ticks.
#[derive(Clone, Default)]
pub struct RecordingWorker {
    pub ticks: Arc<Mutex<Vec<TickRecord>>>,
    pub fail_on: Vec<u64>,
    pub stop_after: Option<(u64, StopSignal)>,
    pub discovered: DiscoveredQueues,
}

impl RecordingWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, indices: &[u64]) -> Self {
        self.fail_on = indices.to_vec();
        self
    }

    pub fn stopping(mut self, after: u64, stop: StopSignal) -> Self {
        self.stop_after = Some((after, stop));
        self
    }

    pub fn with_queues(mut self, active: &[&str], passive: &[&str]) -> Self {
        self.discovered = DiscoveredQueues {
            active: active.iter().map(|s| s.to_string()).collect(),
            passive: passive.iter().map(|s| s.to_string()).collect(),
        };
        self
    }

    pub fn recorded(&self) -> Vec<TickRecord> {
        self.ticks.lock().clone()
    }
}

impl Worker for RecordingWorker {
    fn tick(&mut self, tick: &Tick<'_>) -> anyhow::Result<()> {
        let count = {
            let mut ticks = self.ticks.lock();
            ticks.push(TickRecord {
                queue: tick.queue.to_string(),
                index: tick.index,
                first: tick.first,
            });
            ticks.len() as u64
        };

        if let Some((after, stop)) = &self.stop_after {
            if count >= *after {
                stop.stop();
            }
        }
        if self.fail_on.contains(&tick.index) {
            anyhow::bail!("tick {} exploded", tick.index);
        }
        Ok(())
    }

    fn discovered_queues(&self) -> DiscoveredQueues {
        self.discovered.clone()
    }
}

// -- Run loop mocks -----------------------------------------------------------

/// Records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPause {
    pub pauses: Vec<Duration>,
}

impl Pause for RecordingPause {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

// -- Menu mocks ---------------------------------------------------------------

/// Feeds scripted keys and keeps every drawn frame.
pub struct ScriptedBackend {
    pub width: u16,
    pub height: u16,
    pub keys: VecDeque<MenuKey>,
    pub frames: Vec<Buffer>,
}

impl ScriptedBackend {
    pub fn new(keys: &[MenuKey]) -> Self {
        Self {
            width: 40,
            height: 12,
            keys: keys.iter().copied().collect(),
            frames: Vec::new(),
        }
    }

    pub fn last_frame(&self) -> &Buffer {
        self.frames.last().expect("No frame drawn")
    }
}

impl MenuBackend for ScriptedBackend {
    fn size(&self) -> io::Result<(u16, u16)> {
        Ok((self.width, self.height))
    }

    fn draw(&mut self, render: &RenderFn<'_>) -> io::Result<()> {
        let mut frame = Buffer::empty(Rect::new(0, 0, self.width, self.height));
        render(frame.area, &mut frame);
        self.frames.push(frame);
        Ok(())
    }

    fn read_key(&mut self) -> io::Result<MenuKey> {
        self.keys
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

/// Symbols of row `y` with trailing blanks removed.
pub fn row_text(frame: &Buffer, y: u16) -> String {
    let row: String = (0..frame.area.width)
        .map(|x| frame[(x, y)].symbol())
        .collect();
    row.trim_end().to_string()
}

/// Foreground and background of the cell at `(x, y)`.
pub fn colors_at(frame: &Buffer, x: u16, y: u16) -> (Color, Color) {
    let cell = &frame[(x, y)];
    (cell.fg, cell.bg)
}

pub fn colors(style: Style) -> (Color, Color) {
    (
        style.fg.unwrap_or(Color::Reset),
        style.bg.unwrap_or(Color::Reset),
    )
}

/// Build a queue table from `(name, command, passive)` triples.
pub fn queue_table(entries: &[(&str, &[&str], bool)]) -> BTreeMap<String, QueueDef> {
    entries
        .iter()
        .map(|(name, command, passive)| {
            (
                name.to_string(),
                QueueDef {
                    command: command.iter().map(|s| s.to_string()).collect(),
                    passive: *passive,
                },
            )
        })
        .collect()
}
