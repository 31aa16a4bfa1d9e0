//! Tick scheduling: single-shot or continuous with random jitter.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use anyhow::anyhow;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::shutdown::StopSignal;

/// Run loop policy, fixed for the duration of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLoopConfig {
    pub run_once: bool,
    /// Seconds.
    pub sleep_min: f64,
    /// Seconds, not lower than `sleep_min`.
    pub sleep_max: f64,
    pub exit_on_finish: bool,
    /// Seconds to wait before the process exits when `exit_on_finish` is set.
    pub exit_delay: f64,
}

impl From<&RunConfig> for RunLoopConfig {
    fn from(run: &RunConfig) -> Self {
        Self {
            run_once: run.single_run,
            sleep_min: run.sleep_min,
            sleep_max: run.sleep_max,
            exit_on_finish: run.exit_on_finish,
            exit_delay: run.exit_delay,
        }
    }
}

impl RunLoopConfig {
    /// Delay before a continuous-mode tick, uniform in `[sleep_min, sleep_max]`.
    pub fn jitter<R: Rng>(&self, rng: &mut R) -> Duration {
        let secs = if self.sleep_max > self.sleep_min {
            rng.gen_range(self.sleep_min..=self.sleep_max)
        } else {
            self.sleep_min
        };
        secs_to_duration(secs)
    }

    pub fn exit_delay(&self) -> Duration {
        secs_to_duration(self.exit_delay)
    }
}

/// Negative or NaN becomes zero; anything past `Duration::MAX` saturates.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// One invocation of the work function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick<'a> {
    pub queue: &'a str,
    /// Zero-based tick counter.
    pub index: u64,
    /// Only the first tick of a run sets this.
    pub first: bool,
}

/// A work function error, caught by the loop.
#[derive(Debug, Error)]
#[error("Tick {index} of queue '{queue}' failed: {source}")]
pub struct TickError {
    pub queue: String,
    pub index: u64,
    #[source]
    pub source: anyhow::Error,
}

/// Blocking delay between ticks.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Single-run mode finished its tick.
    RunOnce,
    /// The stop signal was raised.
    Stopped,
}

/// Evaluated after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Continue,
    Stop(StopReason),
}

/// What a finished run loop did.
#[derive(Debug)]
pub struct LoopReport<T> {
    pub ticks: u64,
    pub failures: u64,
    pub stop_reason: StopReason,
    /// Last value returned by the error handler. Informational only.
    pub last_recovered: Option<T>,
    /// Set when the process should exit after waiting this long.
    pub exit_after: Option<Duration>,
}

/// Drives ticks until the policy or the stop signal ends the run.
///
/// The loop never terminates the process; `LoopReport::exit_after` tells the
/// caller to do so.
pub struct ScheduledRunLoop<P = ThreadPause> {
    config: RunLoopConfig,
    stop: StopSignal,
    pause: P,
}

impl ScheduledRunLoop<ThreadPause> {
    pub fn new(config: RunLoopConfig, stop: StopSignal) -> Self {
        Self::with_pause(config, stop, ThreadPause)
    }
}

impl<P: Pause> ScheduledRunLoop<P> {
    pub fn with_pause(config: RunLoopConfig, stop: StopSignal, pause: P) -> Self {
        Self {
            config,
            stop,
            pause,
        }
    }

    pub fn config(&self) -> &RunLoopConfig {
        &self.config
    }

    pub fn pause(&self) -> &P {
        &self.pause
    }

    pub fn decide(&self) -> TickDecision {
        if self.config.run_once {
            TickDecision::Stop(StopReason::RunOnce)
        } else if self.stop.is_stopped() {
            TickDecision::Stop(StopReason::Stopped)
        } else {
            TickDecision::Continue
        }
    }

    /// Run ticks for `queue` until the loop decides to stop.
    ///
    /// Errors and panics from `work` go to `on_error` exactly once each and
    /// never end the loop.
    pub fn run<W, H, T>(&mut self, queue: &str, mut work: W, mut on_error: H) -> LoopReport<T>
    where
        W: FnMut(&Tick<'_>) -> anyhow::Result<()>,
        H: FnMut(&TickError) -> Option<T>,
    {
        let mut ticks: u64 = 0;
        let mut failures: u64 = 0;
        let mut last_recovered = None;

        let stop_reason = loop {
            if ticks > 0 {
                let delay = self.config.jitter(&mut rand::thread_rng());
                debug!(queue, delay_ms = delay.as_millis() as u64, "Sleeping before next tick");
                self.pause.pause(delay);
            }

            if self.stop.is_stopped() {
                break StopReason::Stopped;
            }

            let tick = Tick {
                queue,
                index: ticks,
                first: ticks == 0,
            };
            let outcome = catch_unwind(AssertUnwindSafe(|| work(&tick))).unwrap_or_else(|payload| {
                Err(anyhow!("panicked: {}", panic_message(payload.as_ref())))
            });
            if let Err(source) = outcome {
                failures += 1;
                let error = TickError {
                    queue: queue.to_string(),
                    index: ticks,
                    source,
                };
                warn!(queue, tick = ticks, error = %error.source, "Tick failed");
                if let Some(value) = on_error(&error) {
                    last_recovered = Some(value);
                }
            }
            ticks += 1;

            match self.decide() {
                TickDecision::Continue => continue,
                TickDecision::Stop(reason) => break reason,
            }
        };

        debug!(queue, ticks, failures, ?stop_reason, "Run loop finished");

        LoopReport {
            ticks,
            failures,
            stop_reason,
            last_recovered,
            exit_after: self
                .config
                .exit_on_finish
                .then(|| self.config.exit_delay()),
        }
    }
}

/// Text carried by a panic payload, or `"panic"` when it has none.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(run_once: bool, min: f64, max: f64) -> RunLoopConfig {
        RunLoopConfig {
            run_once,
            sleep_min: min,
            sleep_max: max,
            exit_on_finish: false,
            exit_delay: 0.0,
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let cfg = config(false, 0.5, 1.5);
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let delay = cfg.jitter(&mut rng).as_secs_f64();
            assert!((0.5..=1.5).contains(&delay), "delay {delay} out of bounds");
        }
    }

    #[test]
    fn jitter_with_equal_bounds_is_exact() {
        let cfg = config(false, 2.0, 2.0);
        assert_eq!(cfg.jitter(&mut rand::thread_rng()), Duration::from_secs(2));
    }

    #[test]
    fn oversized_delays_saturate() {
        let cfg = config(false, 1e20, 1e20);
        assert_eq!(cfg.jitter(&mut rand::thread_rng()), Duration::MAX);
        assert_eq!(secs_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn decide_prefers_run_once() {
        let stop = StopSignal::new();
        stop.stop();
        let run_loop = ScheduledRunLoop::new(config(true, 0.0, 0.0), stop);
        assert_eq!(run_loop.decide(), TickDecision::Stop(StopReason::RunOnce));
    }

    #[test]
    fn decide_continues_until_stopped() {
        let stop = StopSignal::new();
        let run_loop = ScheduledRunLoop::new(config(false, 0.0, 0.0), stop.clone());
        assert_eq!(run_loop.decide(), TickDecision::Continue);
        stop.stop();
        assert_eq!(run_loop.decide(), TickDecision::Stop(StopReason::Stopped));
    }

    #[test]
    fn panicking_tick_is_reported_and_loop_continues() {
        let stop = StopSignal::new();
        let mut run_loop = ScheduledRunLoop::new(config(false, 0.0, 0.0), stop.clone());
        let mut errors = Vec::new();
        let report = run_loop.run(
            "q",
            |tick| {
                if tick.index == 0 {
                    panic!("worker bug");
                }
                stop.stop();
                Ok(())
            },
            |error| {
                errors.push(error.source.to_string());
                Some(error.index)
            },
        );

        assert_eq!(errors, vec!["panicked: worker bug"]);
        assert_eq!(report.ticks, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.last_recovered, Some(0));
        assert_eq!(report.stop_reason, StopReason::Stopped);
    }

    #[test]
    fn exit_request_carries_delay() {
        let mut cfg = config(true, 0.0, 0.0);
        cfg.exit_on_finish = true;
        cfg.exit_delay = 0.25;
        let mut run_loop = ScheduledRunLoop::new(cfg, StopSignal::new());
        let report: LoopReport<()> = run_loop.run("q", |_| Ok(()), |_| None);
        assert_eq!(report.exit_after, Some(Duration::from_millis(250)));
    }
}
