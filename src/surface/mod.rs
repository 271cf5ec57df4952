pub mod recording_surface;
pub use recording_surface::{RecordingSurface, SharedCallLog, SurfaceCall};

#[cfg(feature = "terminal_surface")]
pub mod terminal_surface;
#[cfg(feature = "terminal_surface")]
pub use terminal_surface::TerminalSurface;

use common_stdx::Point;

use crate::{BodyPart, ImageResource, PanelId, PanelShell, error::SurfaceError};

/// Which image on a panel a draw or clear refers to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageLayer {
    Silhouette,
    Marker(BodyPart),
}

/// Trait that describes how panels end up on screen.
///
/// Every method is one draw operation. The engine only calls them for fields
/// that changed, so implementations should not diff again.
pub trait PanelSurface: std::fmt::Debug + Send {
    /// Build the widget tree for a panel.
    fn create_shell(&mut self, panel: PanelId, shell: &PanelShell) -> Result<(), SurfaceError>;

    fn destroy_shell(&mut self, panel: PanelId) -> Result<(), SurfaceError>;

    /// Make an assigned panel visible at `slot`.
    fn show_shell(&mut self, panel: PanelId, slot: usize) -> Result<(), SurfaceError>;

    /// Hide a released panel and blank its contents.
    fn hide_shell(&mut self, panel: PanelId) -> Result<(), SurfaceError>;

    /// `top_left` is relative to the silhouette origin.
    fn draw_image(
        &mut self,
        panel: PanelId,
        layer: ImageLayer,
        top_left: Point<i32>,
        image: &ImageResource,
    ) -> Result<(), SurfaceError>;

    fn clear_image(&mut self, panel: PanelId, layer: &ImageLayer) -> Result<(), SurfaceError>;

    fn set_name(&mut self, panel: PanelId, name: &str) -> Result<(), SurfaceError>;

    fn set_border(&mut self, panel: PanelId, highlighted: bool) -> Result<(), SurfaceError>;

    fn set_health(
        &mut self,
        panel: PanelId,
        fraction: f32,
        bar_width: u16,
    ) -> Result<(), SurfaceError>;

    fn add_status(&mut self, panel: PanelId, key: &str, glyph: &str) -> Result<(), SurfaceError>;

    fn remove_status(&mut self, panel: PanelId, key: &str) -> Result<(), SurfaceError>;

    /// Flush buffered output, called once at the end of every pass.
    fn flush(&mut self) -> Result<(), SurfaceError>;
}
