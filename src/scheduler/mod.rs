pub mod overlay_handle;
pub use overlay_handle::{OverlayCommand, OverlayHandle};

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, select, tick, unbounded};
use log::{debug, info, warn};

use crate::{EntityFeed, OverlayEngine, PanelSurface};

/// Move `engine` onto its own thread and drive one pass every `interval`.
///
/// Passes never overlap. A tick that fell due while a pass overran is dropped,
/// so a slow pass delays the overlay instead of queueing work behind it.
pub fn start_overlay<S, F>(engine: OverlayEngine<S>, feed: F, interval: Duration) -> OverlayHandle
where
    S: PanelSurface + 'static,
    F: EntityFeed + 'static,
{
    let (tx, rx) = unbounded::<OverlayCommand>();
    let worker = thread::spawn(move || run_overlay(engine, feed, interval, rx));
    OverlayHandle::new(tx, worker)
}

fn run_overlay<S, F>(
    mut engine: OverlayEngine<S>,
    mut feed: F,
    interval: Duration,
    rx: Receiver<OverlayCommand>,
) where
    S: PanelSurface,
    F: EntityFeed,
{
    info!("overlay thread running, one pass every {interval:?}");
    let ticker = tick(interval);
    loop {
        select! {
            recv(ticker) -> _ => timed_pass(&mut engine, &mut feed, &ticker, interval),
            recv(rx) -> msg => match msg {
                Ok(OverlayCommand::Shutdown { resp }) => {
                    let _ = resp.send(engine.stats());
                    break;
                }
                Ok(cmd) => handle_command(&mut engine, &mut feed, cmd),
                Err(_) => {
                    info!("every overlay handle was dropped");
                    break;
                }
            },
        }
    }
    info!("overlay thread stopped after {} passes", engine.stats().passes);
}

fn timed_pass<S, F>(
    engine: &mut OverlayEngine<S>,
    feed: &mut F,
    ticker: &Receiver<Instant>,
    interval: Duration,
) where
    S: PanelSurface,
    F: EntityFeed,
{
    let started = Instant::now();
    engine.run_pass(feed.snapshot());
    let elapsed = started.elapsed();
    if elapsed > interval {
        let skipped = drain_missed_ticks(ticker);
        warn!("pass took {elapsed:?}, longer than {interval:?}; skipped {skipped} tick(s)");
    }
}

fn handle_command<S, F>(engine: &mut OverlayEngine<S>, feed: &mut F, cmd: OverlayCommand)
where
    S: PanelSurface,
    F: EntityFeed,
{
    debug!("overlay command {cmd:?}");
    match cmd {
        OverlayCommand::Reload => engine.request_reload(),
        OverlayCommand::SetMaxShown(max_shown) => engine.set_max_shown(max_shown),
        OverlayCommand::Click(panel) => {
            engine.click(panel);
        }
        OverlayCommand::ClickSlot(slot) => {
            engine.click_slot(slot);
        }
        OverlayCommand::Stats { resp } => {
            let _ = resp.send(engine.stats());
        }
        OverlayCommand::RunPass { resp } => {
            let report = engine.run_pass(feed.snapshot());
            let _ = resp.send(report);
        }
        OverlayCommand::Shutdown { resp } => {
            let _ = resp.send(engine.stats());
        }
    }
}

/// Throw away ticks that became due while a pass was running.
pub fn drain_missed_ticks(ticker: &Receiver<Instant>) -> usize {
    ticker.try_iter().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn drains_pending_tick() {
        let (tx, rx) = bounded(1);
        tx.send(Instant::now()).unwrap();
        assert_eq!(drain_missed_ticks(&rx), 1);
        assert_eq!(drain_missed_ticks(&rx), 0);
    }

    #[test]
    fn ticker_holds_at_most_one_missed_tick() {
        let ticker = tick(Duration::from_millis(50));
        thread::sleep(Duration::from_millis(180));
        assert_eq!(drain_missed_ticks(&ticker), 1);
    }
}
