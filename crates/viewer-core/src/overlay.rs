//! Floating contrast panel: geometry, docking, magnification and the
//! pointer state machine that drives drag and resize.
//!
//! Pointer move/up are delivered for the whole window for the panel's entire
//! life; the machine ignores them unless a drag or resize is in progress.

use crate::scale::{clamp_scale, round_hundredths};
use doc_model::{OverlayDefaults, Side};

pub const MIN_PANEL_WIDTH_PX: f32 = 260.0;
pub const MIN_PANEL_HEIGHT_PX: f32 = 220.0;
pub const MAX_PANEL_RATIO: f32 = 0.95;
pub const PANEL_ZOOM_STEP: f32 = 0.1;

/// Opacity of the layer painted on top.
pub const TOP_LAYER_OPACITY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSize {
    pub width: f32,
    pub height: f32,
}

impl WindowSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Panel rectangle in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelHitTarget {
    DragHandle,
    ResizeGrip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelInteraction {
    Idle,
    Dragging { grab_offset: Point },
    Resizing { start_pointer: Point, start_width: f32, start_height: f32 },
}

/// Floating geometry; kept untouched while docked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingGeometry {
    pub position: Point,
    pub width_ratio: f32,
    pub height_ratio: f32,
}

/// One of the two stacked mirrors, in paint order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayer {
    pub side: Side,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPanel {
    interaction: PanelInteraction,
    floating: FloatingGeometry,
    docked: bool,
    docked_height_ratio: f32,
    front_side: Side,
    zoom: f32,
    visible: bool,
}

impl Default for OverlayPanel {
    fn default() -> Self {
        Self::new(&OverlayDefaults::default())
    }
}

impl OverlayPanel {
    pub fn new(defaults: &OverlayDefaults) -> Self {
        Self {
            interaction: PanelInteraction::Idle,
            floating: FloatingGeometry {
                position: Point::new(defaults.x, defaults.y),
                width_ratio: sanitize_ratio(defaults.width_ratio),
                height_ratio: sanitize_ratio(defaults.height_ratio),
            },
            docked: false,
            docked_height_ratio: sanitize_ratio(defaults.docked_height_ratio),
            front_side: defaults.front_side,
            zoom: clamp_scale(defaults.panel_zoom),
            visible: false,
        }
    }

    pub fn interaction(&self) -> PanelInteraction {
        self.interaction
    }

    pub fn floating(&self) -> FloatingGeometry {
        self.floating
    }

    pub fn is_docked(&self) -> bool {
        self.docked
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn front_side(&self) -> Side {
        self.front_side
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Current rectangle. Docked panels span the full width and sit on the
    /// bottom edge.
    pub fn frame(&self, window: WindowSize) -> PanelFrame {
        if self.docked {
            let height = window.height * self.docked_height_ratio;
            return PanelFrame { x: 0.0, y: window.height - height, width: window.width, height };
        }

        PanelFrame {
            x: self.floating.position.x,
            y: self.floating.position.y,
            width: window.width * self.floating.width_ratio,
            height: window.height * self.floating.height_ratio,
        }
    }

    /// Returns true when the press started a drag or resize.
    pub fn pointer_down(
        &mut self,
        target: PanelHitTarget,
        pointer: Point,
        window: WindowSize,
    ) -> bool {
        if self.docked || self.interaction != PanelInteraction::Idle {
            return false;
        }

        let frame = self.frame(window);
        self.interaction = match target {
            PanelHitTarget::DragHandle => PanelInteraction::Dragging {
                grab_offset: Point::new(pointer.x - frame.x, pointer.y - frame.y),
            },
            PanelHitTarget::ResizeGrip => PanelInteraction::Resizing {
                start_pointer: pointer,
                start_width: frame.width,
                start_height: frame.height,
            },
        };

        tracing::trace!(interaction = ?self.interaction, "overlay pointer down");
        true
    }

    /// Applies a pointer move. Returns true when the floating geometry changed.
    pub fn pointer_move(&mut self, pointer: Point, window: WindowSize) -> bool {
        if self.docked {
            return false;
        }

        match self.interaction {
            PanelInteraction::Idle => false,
            PanelInteraction::Dragging { grab_offset } => {
                self.floating.position =
                    Point::new(pointer.x - grab_offset.x, pointer.y - grab_offset.y);
                true
            }
            PanelInteraction::Resizing { start_pointer, start_width, start_height } => {
                if window.width <= 0.0 || window.height <= 0.0 {
                    return false;
                }

                let width = (start_width + pointer.x - start_pointer.x).max(MIN_PANEL_WIDTH_PX);
                let height = (start_height + pointer.y - start_pointer.y).max(MIN_PANEL_HEIGHT_PX);

                self.floating.width_ratio = (width / window.width).min(MAX_PANEL_RATIO);
                self.floating.height_ratio = (height / window.height).min(MAX_PANEL_RATIO);
                true
            }
        }
    }

    /// Ends any drag or resize, wherever the pointer is released.
    pub fn pointer_up(&mut self) {
        self.interaction = PanelInteraction::Idle;
    }

    pub fn toggle_docked(&mut self) -> bool {
        self.docked = !self.docked;
        tracing::debug!(docked = self.docked, "overlay dock toggled");
        self.docked
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set_zoom(self.zoom + PANEL_ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_zoom(self.zoom - PANEL_ZOOM_STEP)
    }

    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.zoom = clamp_scale(zoom);
        self.zoom
    }

    /// Scale handed to a mirror for a primary viewport at `primary_scale`.
    pub fn mirror_scale(&self, primary_scale: f32) -> f32 {
        round_hundredths(primary_scale * self.zoom)
    }

    pub fn swap_front(&mut self) -> Side {
        self.front_side = self.front_side.other();
        self.front_side
    }

    /// Base layer first (full opacity), then the `front_side` layer painted on
    /// top at half opacity.
    pub fn layers(&self) -> [OverlayLayer; 2] {
        [
            OverlayLayer { side: self.front_side.other(), opacity: 1.0 },
            OverlayLayer { side: self.front_side, opacity: TOP_LAYER_OPACITY },
        ]
    }

    /// Returns true when the panel just became visible.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let became_visible = visible && !self.visible;
        self.visible = visible;
        if !visible {
            self.interaction = PanelInteraction::Idle;
        }
        became_visible
    }

    pub fn toggle_visible(&mut self) -> bool {
        self.set_visible(!self.visible)
    }
}

fn sanitize_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio.min(MAX_PANEL_RATIO)
    } else {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WINDOW: WindowSize = WindowSize { width: 1600.0, height: 1000.0 };

    fn panel() -> OverlayPanel {
        let mut panel = OverlayPanel::default();
        panel.set_visible(true);
        panel
    }

    #[test]
    fn drag_follows_pointer_minus_grab_offset() {
        let mut panel = panel();
        assert!(panel.pointer_down(PanelHitTarget::DragHandle, Point::new(100.0, 90.0), WINDOW));

        panel.pointer_move(Point::new(300.0, 400.0), WINDOW);
        panel.pointer_up();

        assert_eq!(panel.floating().position, Point::new(280.0, 390.0));
        assert_eq!(panel.interaction(), PanelInteraction::Idle);
    }

    #[test]
    fn moves_are_ignored_while_idle() {
        let mut panel = panel();
        let before = panel.floating();

        assert!(!panel.pointer_move(Point::new(500.0, 500.0), WINDOW));
        assert_eq!(panel.floating(), before);
    }

    #[test]
    fn resize_stores_ratios_of_window() {
        let mut panel = panel();
        // Default frame is 800 x 500.
        panel.pointer_down(PanelHitTarget::ResizeGrip, Point::new(880.0, 580.0), WINDOW);

        panel.pointer_move(Point::new(1080.0, 680.0), WINDOW);

        let geometry = panel.floating();
        assert_eq!(geometry.width_ratio, 1000.0 / 1600.0);
        assert_eq!(geometry.height_ratio, 600.0 / 1000.0);
    }

    #[test]
    fn resize_respects_pixel_floor_and_ratio_cap() {
        let mut panel = panel();
        panel.pointer_down(PanelHitTarget::ResizeGrip, Point::new(880.0, 580.0), WINDOW);

        panel.pointer_move(Point::new(-2000.0, -2000.0), WINDOW);
        assert_eq!(panel.floating().width_ratio, MIN_PANEL_WIDTH_PX / WINDOW.width);
        assert_eq!(panel.floating().height_ratio, MIN_PANEL_HEIGHT_PX / WINDOW.height);

        panel.pointer_move(Point::new(9000.0, 9000.0), WINDOW);
        assert_eq!(panel.floating().width_ratio, MAX_PANEL_RATIO);
        assert_eq!(panel.floating().height_ratio, MAX_PANEL_RATIO);
    }

    #[test]
    fn docked_panel_ignores_drag_and_resize() {
        let mut panel = panel();
        panel.toggle_docked();

        assert!(!panel.pointer_down(PanelHitTarget::DragHandle, Point::new(10.0, 900.0), WINDOW));
        assert!(!panel.pointer_move(Point::new(500.0, 500.0), WINDOW));
        assert_eq!(panel.interaction(), PanelInteraction::Idle);
    }

    #[test]
    fn docked_frame_is_full_width_bottom_anchored() {
        let mut panel = panel();
        panel.toggle_docked();

        let frame = panel.frame(WINDOW);
        assert_eq!(frame, PanelFrame { x: 0.0, y: 600.0, width: 1600.0, height: 400.0 });
    }

    #[test]
    fn dock_round_trip_restores_floating_geometry() {
        let mut panel = panel();
        panel.pointer_down(PanelHitTarget::DragHandle, Point::new(100.0, 100.0), WINDOW);
        panel.pointer_move(Point::new(150.0, 130.0), WINDOW);
        panel.pointer_up();
        let before = panel.floating();

        panel.toggle_docked();
        panel.pointer_down(PanelHitTarget::ResizeGrip, Point::new(0.0, 0.0), WINDOW);
        panel.pointer_move(Point::new(700.0, 700.0), WINDOW);
        panel.pointer_up();
        panel.toggle_docked();

        assert_eq!(panel.floating(), before);
        assert_eq!(panel.frame(WINDOW).x, before.position.x);
    }

    #[test]
    fn zoom_steps_are_clamped_and_rounded() {
        let mut panel = panel();

        for _ in 0..30 {
            panel.zoom_in();
        }
        assert_eq!(panel.zoom(), 2.0);

        for _ in 0..7 {
            panel.zoom_out();
        }
        assert_eq!(panel.zoom(), 1.3);

        for _ in 0..30 {
            panel.zoom_out();
        }
        assert_eq!(panel.zoom(), 0.5);
    }

    #[test]
    fn mirror_scale_multiplies_primary() {
        let mut panel = panel();
        panel.set_zoom(1.5);

        assert_eq!(panel.mirror_scale(1.2), 1.8);
        assert_eq!(panel.mirror_scale(2.0), 3.0);
    }

    #[test]
    fn front_side_is_painted_last_at_half_opacity() {
        let mut panel = panel();
        assert_eq!(panel.front_side(), Side::Right);

        assert_eq!(
            panel.layers(),
            [
                OverlayLayer { side: Side::Left, opacity: 1.0 },
                OverlayLayer { side: Side::Right, opacity: 0.5 },
            ]
        );

        panel.swap_front();
        assert_eq!(panel.layers()[1].side, Side::Left);
    }

    #[test]
    fn hiding_cancels_interaction() {
        let mut panel = panel();
        panel.pointer_down(PanelHitTarget::DragHandle, Point::new(100.0, 100.0), WINDOW);

        assert!(!panel.set_visible(false));
        assert_eq!(panel.interaction(), PanelInteraction::Idle);
        assert!(panel.set_visible(true));
    }
}
