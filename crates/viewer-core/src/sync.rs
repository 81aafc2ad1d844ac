//! Zoom and scroll linking between the left and right viewports.
//!
//! Linking stores an offset between the two sides instead of forcing them to
//! be equal. A user action on one side (the driver) derives the other side
//! from that offset:
//!
//! - zoom: `right = clamp(left + offset)`, `left = clamp(right - offset)`
//! - scroll: `right = left + offset`, `left = right - offset`
//!
//! The zoom offset is captured when linking is switched on and whenever a
//! scale is set through [`SyncCoordinator::set_scale`]. Linked
//! [`SyncCoordinator::change_scale`] calls never renormalize it, so a side
//! pinned at a bound makes the observed difference diverge from the stored
//! offset until the other side moves back into range.
//!
//! Scroll linking carries an echo latch. Writing the paired container makes
//! the host emit a scroll event for it; while the latch is set that event is
//! ignored. The latch is released by a deferred task on the next tick, so one
//! user scroll yields exactly one corrective write.

use crate::scale::clamp_scale;
use doc_model::Side;

/// Scale of each side after a zoom operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleChange {
    pub left: f32,
    pub right: f32,
}

impl ScaleChange {
    pub fn get(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Corrective write the paired container must receive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollWrite {
    pub side: Side,
    pub scroll_top: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLink {
    linked: bool,
    offset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollLink {
    linked: bool,
    offset: f32,
    echo_in_flight: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncCoordinator {
    left_scale: f32,
    right_scale: f32,
    zoom: ZoomLink,
    scroll: ScrollLink,
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl SyncCoordinator {
    pub fn new(left_scale: f32, right_scale: f32) -> Self {
        let left_scale = clamp_scale(left_scale);
        let right_scale = clamp_scale(right_scale);

        Self {
            left_scale,
            right_scale,
            zoom: ZoomLink { linked: false, offset: right_scale - left_scale },
            scroll: ScrollLink { linked: false, offset: 0.0, echo_in_flight: false },
        }
    }

    pub fn scale(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left_scale,
            Side::Right => self.right_scale,
        }
    }

    pub fn scales(&self) -> ScaleChange {
        ScaleChange { left: self.left_scale, right: self.right_scale }
    }

    pub fn zoom_linked(&self) -> bool {
        self.zoom.linked
    }

    pub fn zoom_offset(&self) -> f32 {
        self.zoom.offset
    }

    /// Switching on captures the current divergence as the fixed relationship;
    /// the scales themselves are left alone.
    pub fn set_zoom_linked(&mut self, linked: bool) {
        if linked && !self.zoom.linked {
            self.zoom.offset = self.right_scale - self.left_scale;
            tracing::debug!(offset = self.zoom.offset, "zoom linked");
        } else if !linked && self.zoom.linked {
            tracing::debug!("zoom unlinked");
        }
        self.zoom.linked = linked;
    }

    /// Zoom-button path: steps `side` by `delta` and derives the paired side
    /// from the stored offset when linked.
    pub fn change_scale(&mut self, side: Side, delta: f32) -> ScaleChange {
        let new_scale = clamp_scale(self.scale(side) + delta);
        self.assign(side, new_scale);

        if self.zoom.linked {
            let derived = match side {
                Side::Left => new_scale + self.zoom.offset,
                Side::Right => new_scale - self.zoom.offset,
            };
            self.assign(side.other(), clamp_scale(derived));
        }

        self.scales()
    }

    /// External path (preferences, fit-to-width, ...): assigns `side` directly
    /// and, when linked, re-captures the offset rather than moving the other side.
    pub fn set_scale(&mut self, side: Side, scale: f32) -> ScaleChange {
        self.assign(side, clamp_scale(scale));

        if self.zoom.linked {
            self.zoom.offset = self.right_scale - self.left_scale;
        }

        self.scales()
    }

    pub fn scroll_linked(&self) -> bool {
        self.scroll.linked
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll.offset
    }

    pub fn echo_in_flight(&self) -> bool {
        self.scroll.echo_in_flight
    }

    /// When `linked` is true the offset is (re)captured from the current
    /// positions, even if linking was already on.
    pub fn set_scroll_linked(&mut self, linked: bool, left_scroll_top: f32, right_scroll_top: f32) {
        self.scroll.linked = linked;

        if linked {
            self.scroll.offset = right_scroll_top - left_scroll_top;
            tracing::debug!(offset = self.scroll.offset, "scroll linked");
        }
    }

    /// Handles a scroll event from `side`. Returns the single write the paired
    /// side needs, or `None` when unlinked or when this event is the echo of
    /// our own previous write. A returned write latches the echo guard; the
    /// caller must schedule [`SyncCoordinator::release_echo_guard`] for the
    /// next tick.
    pub fn on_scroll(&mut self, side: Side, scroll_top: f32) -> Option<ScrollWrite> {
        if !self.scroll.linked || self.scroll.echo_in_flight {
            return None;
        }

        self.scroll.echo_in_flight = true;
        let target = match side {
            Side::Left => scroll_top + self.scroll.offset,
            Side::Right => scroll_top - self.scroll.offset,
        };

        tracing::trace!(driver = side.name(), target, "scroll echo");
        Some(ScrollWrite { side: side.other(), scroll_top: target })
    }

    pub fn release_echo_guard(&mut self) {
        self.scroll.echo_in_flight = false;
    }

    fn assign(&mut self, side: Side, scale: f32) {
        match side {
            Side::Left => self.left_scale = scale,
            Side::Right => self.right_scale = scale,
        }
    }
}
