use std::sync::{Arc, Mutex};

use common_stdx::Point;
use log::{info, warn};

use crate::{
    ImageLayer, ImageResource, PanelId, PanelShell, PanelSurface, error::SurfaceError,
};

/// One recorded surface operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    CreateShell(PanelId, PanelShell),
    DestroyShell(PanelId),
    ShowShell(PanelId, usize),
    HideShell(PanelId),
    DrawImage(PanelId, ImageLayer, Point<i32>),
    ClearImage(PanelId, ImageLayer),
    SetName(PanelId, String),
    SetBorder(PanelId, bool),
    SetHealth(PanelId, f32),
    AddStatus(PanelId, String),
    RemoveStatus(PanelId, String),
}

impl SurfaceCall {
    pub fn panel(&self) -> PanelId {
        match self {
            SurfaceCall::CreateShell(p, _)
            | SurfaceCall::DestroyShell(p)
            | SurfaceCall::ShowShell(p, _)
            | SurfaceCall::HideShell(p)
            | SurfaceCall::DrawImage(p, _, _)
            | SurfaceCall::ClearImage(p, _)
            | SurfaceCall::SetName(p, _)
            | SurfaceCall::SetBorder(p, _)
            | SurfaceCall::SetHealth(p, _)
            | SurfaceCall::AddStatus(p, _)
            | SurfaceCall::RemoveStatus(p, _) => *p,
        }
    }
}

/// Flushed frames, readable from outside the rendering thread.
pub type SharedCallLog = Arc<Mutex<Vec<Vec<SurfaceCall>>>>;

/// Headless surface that records every call, grouped by flush.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    pending: Vec<SurfaceCall>,
    frames: Vec<Vec<SurfaceCall>>,
    shared: Option<SharedCallLog>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        RecordingSurface::default()
    }

    /// Also copy every flushed frame into `log`.
    pub fn with_shared_log(log: SharedCallLog) -> Self {
        RecordingSurface {
            shared: Some(log),
            ..RecordingSurface::default()
        }
    }

    /// Calls of every flushed frame, oldest first.
    pub fn frames(&self) -> &[Vec<SurfaceCall>] {
        &self.frames
    }

    pub fn last_frame(&self) -> &[SurfaceCall] {
        self.frames.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_calls(&self) -> impl Iterator<Item = &SurfaceCall> {
        self.frames.iter().flatten()
    }

    pub fn amount_of_draw_commands(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    fn record(&mut self, call: SurfaceCall) -> Result<(), SurfaceError> {
        self.pending.push(call);
        Ok(())
    }
}

impl PanelSurface for RecordingSurface {
    fn create_shell(&mut self, panel: PanelId, shell: &PanelShell) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::CreateShell(panel, shell.clone()))
    }

    fn destroy_shell(&mut self, panel: PanelId) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::DestroyShell(panel))
    }

    fn show_shell(&mut self, panel: PanelId, slot: usize) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::ShowShell(panel, slot))
    }

    fn hide_shell(&mut self, panel: PanelId) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::HideShell(panel))
    }

    fn draw_image(
        &mut self,
        panel: PanelId,
        layer: ImageLayer,
        top_left: Point<i32>,
        _image: &ImageResource,
    ) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::DrawImage(panel, layer, top_left))
    }

    fn clear_image(&mut self, panel: PanelId, layer: &ImageLayer) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::ClearImage(panel, layer.clone()))
    }

    fn set_name(&mut self, panel: PanelId, name: &str) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::SetName(panel, name.to_string()))
    }

    fn set_border(&mut self, panel: PanelId, highlighted: bool) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::SetBorder(panel, highlighted))
    }

    fn set_health(
        &mut self,
        panel: PanelId,
        fraction: f32,
        _bar_width: u16,
    ) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::SetHealth(panel, fraction))
    }

    fn add_status(&mut self, panel: PanelId, key: &str, _glyph: &str) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::AddStatus(panel, key.to_string()))
    }

    fn remove_status(&mut self, panel: PanelId, key: &str) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::RemoveStatus(panel, key.to_string()))
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        info!("flushing {} recorded surface calls", self.pending.len());
        let frame = std::mem::take(&mut self.pending);
        if let Some(shared) = &self.shared {
            match shared.lock() {
                Ok(mut guard) => guard.push(frame.clone()),
                Err(_) => warn!("shared call log is poisoned, dropping frame"),
            }
        }
        self.frames.push(frame);
        Ok(())
    }
}
