//! Process lifecycle control for scheduled queue workers.
//!
//! A [`lifecycle::LifecycleController`] decides once per process whether a
//! queue runs, drives the run loop, and releases shared resources afterward.
//! [`ui::menu`] holds the raw terminal menu used to pick a queue.

pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod shutdown;
pub mod ui;
pub mod worker;
