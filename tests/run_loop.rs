mod common;

use std::time::Duration;

use common::RecordingPause;
use lanekeeper::lifecycle::{RunLoopConfig, ScheduledRunLoop, StopReason, Tick};
use lanekeeper::shutdown::StopSignal;

fn config(run_once: bool, sleep_min: f64, sleep_max: f64) -> RunLoopConfig {
    RunLoopConfig {
        run_once,
        sleep_min,
        sleep_max,
        exit_on_finish: false,
        exit_delay: 0.0,
    }
}

fn recording_loop(config: RunLoopConfig, stop: StopSignal) -> ScheduledRunLoop<RecordingPause> {
    ScheduledRunLoop::with_pause(config, stop, RecordingPause::default())
}

/// Single-run mode ticks exactly once and never sleeps, whatever the bounds.
#[test]
fn test_run_once_ticks_exactly_once() {
    let mut run_loop = recording_loop(config(true, 30.0, 60.0), StopSignal::new());
    let mut ticks = Vec::new();

    let report = run_loop.run(
        "emails",
        |tick: &Tick<'_>| {
            ticks.push((tick.index, tick.first));
            Ok(())
        },
        |_| None::<()>,
    );

    assert_eq!(ticks, vec![(0, true)]);
    assert_eq!(report.ticks, 1);
    assert_eq!(report.stop_reason, StopReason::RunOnce);
    assert!(run_loop.pause().pauses.is_empty());
}

/// Continuous mode sleeps before every tick but the first, within bounds.
#[test]
fn test_continuous_mode_sleeps_between_ticks() {
    let stop = StopSignal::new();
    let mut run_loop = recording_loop(config(false, 0.5, 1.5), stop.clone());
    let mut firsts = Vec::new();

    let report = run_loop.run(
        "emails",
        |tick: &Tick<'_>| {
            firsts.push(tick.first);
            if tick.index == 4 {
                stop.stop();
            }
            Ok(())
        },
        |_| None::<()>,
    );

    assert_eq!(firsts, vec![true, false, false, false, false]);
    assert_eq!(report.ticks, 5);
    assert_eq!(report.stop_reason, StopReason::Stopped);

    let pauses = &run_loop.pause().pauses;
    assert_eq!(pauses.len(), 4);
    for pause in pauses {
        assert!(
            *pause >= Duration::from_secs_f64(0.5) && *pause <= Duration::from_secs_f64(1.5),
            "pause {pause:?} out of bounds"
        );
    }
}

/// Equal sleep bounds produce a fixed delay.
#[test]
fn test_equal_bounds_give_fixed_delay() {
    let stop = StopSignal::new();
    let mut run_loop = recording_loop(config(false, 0.25, 0.25), stop.clone());

    run_loop.run(
        "emails",
        |tick: &Tick<'_>| {
            if tick.index == 2 {
                stop.stop();
            }
            Ok(())
        },
        |_| None::<()>,
    );

    assert_eq!(
        run_loop.pause().pauses,
        vec![Duration::from_millis(250), Duration::from_millis(250)]
    );
}

/// A failing tick is reported once and the next tick still runs.
#[test]
fn test_failed_tick_does_not_stop_the_loop() {
    let stop = StopSignal::new();
    let mut run_loop = recording_loop(config(false, 0.0, 0.0), stop.clone());
    let mut ran = Vec::new();
    let mut reported = Vec::new();

    let report = run_loop.run(
        "emails",
        |tick: &Tick<'_>| {
            ran.push(tick.index);
            if tick.index == 2 {
                stop.stop();
            }
            if tick.index == 1 {
                anyhow::bail!("database unavailable");
            }
            Ok(())
        },
        |error| {
            reported.push((error.index, error.queue.clone(), error.source.to_string()));
            Some(error.index)
        },
    );

    assert_eq!(ran, vec![0, 1, 2]);
    assert_eq!(
        reported,
        vec![(1, "emails".to_string(), "database unavailable".to_string())]
    );
    assert_eq!(report.failures, 1);
    assert_eq!(report.last_recovered, Some(1));
}

/// A failure in single-run mode still ends after one tick.
#[test]
fn test_run_once_failure_still_stops() {
    let mut run_loop = recording_loop(config(true, 0.0, 0.0), StopSignal::new());
    let mut reported = 0;

    let report = run_loop.run(
        "emails",
        |_: &Tick<'_>| anyhow::bail!("boom"),
        |_| {
            reported += 1;
            None::<()>
        },
    );

    assert_eq!(reported, 1);
    assert_eq!(report.ticks, 1);
    assert_eq!(report.stop_reason, StopReason::RunOnce);
}

/// A stop raised before the loop begins skips every tick.
#[test]
fn test_stop_before_first_tick() {
    let stop = StopSignal::new();
    stop.stop();
    let mut run_loop = recording_loop(config(false, 0.0, 0.0), stop);
    let mut ran = 0;

    let report = run_loop.run(
        "emails",
        |_: &Tick<'_>| {
            ran += 1;
            Ok(())
        },
        |_| None::<()>,
    );

    assert_eq!(ran, 0);
    assert_eq!(report.ticks, 0);
    assert_eq!(report.stop_reason, StopReason::Stopped);
}

/// Exit-on-finish only asks the caller to exit; the loop returns normally.
#[test]
fn test_exit_on_finish_reports_delay() {
    let mut cfg = config(true, 0.0, 0.0);
    cfg.exit_on_finish = true;
    cfg.exit_delay = 3.0;
    let mut run_loop = recording_loop(cfg, StopSignal::new());

    let report = run_loop.run("emails", |_: &Tick<'_>| Ok(()), |_| None::<()>);

    assert_eq!(report.exit_after, Some(Duration::from_secs(3)));
}
