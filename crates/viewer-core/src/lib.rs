//! Viewport synchronization and overlay-contrast engine.
//!
//! Everything here is headless: hosts feed pointer and scroll events in and
//! read geometry and rendered surfaces back out.

mod overlay;
mod render_queue;
mod scale;
mod sync;
mod viewport;
mod visibility;

pub use doc_model::Side;
pub use overlay::{
    FloatingGeometry, OverlayLayer, OverlayPanel, PanelFrame, PanelHitTarget, PanelInteraction,
    Point, WindowSize, MAX_PANEL_RATIO, MIN_PANEL_HEIGHT_PX, MIN_PANEL_WIDTH_PX, PANEL_ZOOM_STEP,
    TOP_LAYER_OPACITY,
};
pub use render_queue::{RenderPriority, RenderQueue, SurfaceCache};
pub use scale::{clamp_scale, round_hundredths, scale_percent, MAX_SCALE, MIN_SCALE};
pub use sync::{ScaleChange, ScrollWrite, SyncCoordinator};
pub use viewport::{ContextMenuRequest, RenderOutcome, Viewport, ViewportConfig};
pub use visibility::{
    PagePlaceholder, ScrollContainer, VisibilityEvent, VisibilityTracker,
};
