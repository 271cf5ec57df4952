mod common;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use ltoverlay::{
    ChannelCommandSink, EntitySnapshot, OverlayEngine, RecordingSurface, SharedCallLog, SurfaceCall,
    start_overlay,
};

use common::{assets, config, layouts, wolf};

const NEVER: Duration = Duration::from_secs(3600);

fn shared_engine(log: &SharedCallLog) -> OverlayEngine<RecordingSurface> {
    OverlayEngine::new(
        config(3),
        Box::new(layouts()),
        Box::new(assets()),
        RecordingSurface::with_shared_log(Arc::clone(log)),
    )
}

#[test]
fn run_pass_on_demand() {
    let log: SharedCallLog = Arc::new(Mutex::new(Vec::new()));
    let handle = start_overlay(shared_engine(&log), || vec![wolf(1)], NEVER);

    let report = handle.run_pass().unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.visible, 1);
    assert_eq!(handle.stats().unwrap().passes, 1);

    let stats = handle.shutdown().unwrap();
    assert_eq!(stats.passes, 1);
    assert_eq!(stats.panels, 1);
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn slot_click_reaches_the_game() {
    let (tx, rx) = unbounded();
    let log: SharedCallLog = Arc::new(Mutex::new(Vec::new()));
    let engine = shared_engine(&log).with_command_sink(Box::new(ChannelCommandSink::new(tx)));
    let handle = start_overlay(engine, || vec![wolf(42)], NEVER);

    handle.run_pass().unwrap();
    handle.click_slot(0).unwrap();
    let command = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(command, "target #42");

    handle.click_slot(3).unwrap();
    handle.shutdown().unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn reload_and_max_shown_apply_on_the_next_pass() {
    let log: SharedCallLog = Arc::new(Mutex::new(Vec::new()));
    let handle = start_overlay(
        shared_engine(&log),
        || vec![wolf(1), wolf(2), wolf(3)],
        NEVER,
    );

    assert_eq!(handle.run_pass().unwrap().visible, 3);
    handle.set_max_shown(1).unwrap();
    let report = handle.run_pass().unwrap();
    assert_eq!(report.visible, 1);
    assert_eq!(report.released, 2);

    handle.reload().unwrap();
    let report = handle.run_pass().unwrap();
    assert_eq!(report.created, 1);

    let stats = handle.shutdown().unwrap();
    assert_eq!(stats.max_shown, 1);
    let frames = log.lock().unwrap();
    assert!(
        frames[2]
            .iter()
            .any(|call| matches!(call, SurfaceCall::DestroyShell(_)))
    );
}

#[test]
fn ticker_drives_passes() {
    let log: SharedCallLog = Arc::new(Mutex::new(Vec::new()));
    let handle = start_overlay(
        shared_engine(&log),
        || vec![wolf(1)],
        Duration::from_millis(10),
    );

    thread::sleep(Duration::from_millis(200));
    let stats = handle.shutdown().unwrap();
    assert!(stats.passes > 0);
    assert_eq!(stats.panels, 1);
    // only the first pass has anything to draw
    let frames = log.lock().unwrap();
    assert!(!frames[0].is_empty());
    assert!(frames.iter().skip(1).all(|frame| frame.is_empty()));
}

#[test]
fn handle_survives_clones() {
    let log: SharedCallLog = Arc::new(Mutex::new(Vec::new()));
    let handle = start_overlay(shared_engine(&log), Vec::<EntitySnapshot>::new, NEVER);
    let other = handle.clone();

    other.run_pass().unwrap();
    drop(other);
    assert_eq!(handle.stats().unwrap().passes, 1);
    handle.shutdown().unwrap();
    assert!(handle.stats().is_err());
}
