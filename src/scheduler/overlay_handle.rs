use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, bounded};
use log::{debug, warn};

use crate::{EngineStats, PanelId, PassReport, error::AppError};

/// Commands the overlay thread understands.
/// Variants with a `resp` sender get exactly one answer.
#[derive(Debug)]
pub enum OverlayCommand {
    Reload,
    SetMaxShown(usize),
    Click(PanelId),
    ClickSlot(usize),
    Stats { resp: Sender<EngineStats> },
    /// Run a pass right away instead of waiting for the next tick.
    RunPass { resp: Sender<PassReport> },
    Shutdown { resp: Sender<EngineStats> },
}

/// A clonable handle for talking to the overlay thread.
#[derive(Clone, Debug)]
pub struct OverlayHandle {
    tx: Sender<OverlayCommand>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OverlayHandle {
    pub(crate) fn new(tx: Sender<OverlayCommand>, worker: JoinHandle<()>) -> Self {
        OverlayHandle {
            tx,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    fn send_and_wait<T>(
        &self,
        cmd_builder: impl FnOnce(Sender<T>) -> OverlayCommand,
    ) -> Result<T, AppError> {
        let (resp_tx, resp_rx) = bounded(1);
        self.tx.send(cmd_builder(resp_tx))?;
        resp_rx.recv().map_err(|_| AppError::RecvError)
    }

    fn send(&self, cmd: OverlayCommand) -> Result<(), AppError> {
        self.tx.send(cmd)?;
        Ok(())
    }

    /// Rebuild all panels, images and layouts on the next pass.
    pub fn reload(&self) -> Result<(), AppError> {
        self.send(OverlayCommand::Reload)
    }

    pub fn set_max_shown(&self, max_shown: usize) -> Result<(), AppError> {
        self.send(OverlayCommand::SetMaxShown(max_shown))
    }

    pub fn click(&self, panel: PanelId) -> Result<(), AppError> {
        self.send(OverlayCommand::Click(panel))
    }

    pub fn click_slot(&self, slot: usize) -> Result<(), AppError> {
        self.send(OverlayCommand::ClickSlot(slot))
    }

    pub fn stats(&self) -> Result<EngineStats, AppError> {
        self.send_and_wait(|resp| OverlayCommand::Stats { resp })
    }

    pub fn run_pass(&self) -> Result<PassReport, AppError> {
        self.send_and_wait(|resp| OverlayCommand::RunPass { resp })
    }

    /// Stop the overlay thread and wait for it to exit. Returns the final stats.
    pub fn shutdown(&self) -> Result<EngineStats, AppError> {
        let stats = self.send_and_wait(|resp| OverlayCommand::Shutdown { resp })?;
        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                warn!("overlay worker handle is poisoned, not joining");
                None
            }
        };
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!("overlay thread panicked while shutting down");
            }
            debug!("overlay thread joined");
        }
        Ok(stats)
    }
}
