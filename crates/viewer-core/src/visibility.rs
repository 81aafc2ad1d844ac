//! Page visibility tracking for lazily rendered viewports.
//!
//! A page counts as visible when enough of it intersects the container's
//! viewport widened by a prefetch margin on both edges. The tracker reports
//! only the changes since the previous observation, in page order.

use std::collections::BTreeSet;

/// Scrollable region hosting a column of pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollContainer {
    scroll_top: f32,
    client_height: f32,
    scroll_height: f32,
    writes: u64,
}

impl ScrollContainer {
    pub fn new(client_height: f32) -> Self {
        Self {
            scroll_top: 0.0,
            client_height: client_height.max(0.0),
            scroll_height: 0.0,
            writes: 0,
        }
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    pub fn client_height(&self) -> f32 {
        self.client_height
    }

    pub fn scroll_height(&self) -> f32 {
        self.scroll_height
    }

    pub fn max_scroll_top(&self) -> f32 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    /// Number of explicit position writes. Re-clamping after a geometry
    /// change is not counted.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Writes `scroll_top` clamped to the scrollable range and returns the
    /// applied value.
    pub fn set_scroll_top(&mut self, scroll_top: f32) -> f32 {
        self.writes += 1;
        let target = if scroll_top.is_nan() { 0.0 } else { scroll_top };
        self.scroll_top = target.clamp(0.0, self.max_scroll_top());
        self.scroll_top
    }

    pub fn set_client_height(&mut self, client_height: f32) {
        self.client_height = client_height.max(0.0);
        self.reclamp();
    }

    pub fn set_scroll_height(&mut self, scroll_height: f32) {
        self.scroll_height = scroll_height.max(0.0);
        self.reclamp();
    }

    fn reclamp(&mut self) {
        self.scroll_top = self.scroll_top.clamp(0.0, self.max_scroll_top());
    }
}

/// Fixed-height stand-in for a page; keeps scroll geometry stable whether or
/// not the page has been rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlaceholder {
    pub page_index: u32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PagePlaceholder {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEvent {
    pub page_index: u32,
    pub is_visible: bool,
}

#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    threshold: f32,
    prefetch_margin_px: f32,
    visible: BTreeSet<u32>,
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new(0.01, 400.0)
    }
}

impl VisibilityTracker {
    pub fn new(threshold: f32, prefetch_margin_px: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            prefetch_margin_px: prefetch_margin_px.max(0.0),
            visible: BTreeSet::new(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn prefetch_margin_px(&self) -> f32 {
        self.prefetch_margin_px
    }

    pub fn is_visible(&self, page_index: u32) -> bool {
        self.visible.contains(&page_index)
    }

    /// Ordered indices of the pages currently near the viewport.
    pub fn visible_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.visible.iter().copied()
    }

    /// Forgets every page without emitting events; used when the document changes.
    pub fn reset(&mut self) {
        self.visible.clear();
    }

    /// `placeholders` must be sorted by `top`, as laid out by a viewport.
    pub fn observe(
        &mut self,
        container: &ScrollContainer,
        placeholders: &[PagePlaceholder],
    ) -> Vec<VisibilityEvent> {
        let band_start = container.scroll_top() - self.prefetch_margin_px;
        let band_end = container.scroll_top() + container.client_height() + self.prefetch_margin_px;

        let first = placeholders.partition_point(|page| page.bottom() <= band_start);
        let mut now_visible = BTreeSet::new();

        for page in &placeholders[first..] {
            if page.top >= band_end {
                break;
            }

            if self.meets_threshold(page, band_start, band_end) {
                now_visible.insert(page.page_index);
            }
        }

        let mut events: Vec<VisibilityEvent> = self
            .visible
            .symmetric_difference(&now_visible)
            .map(|&page_index| VisibilityEvent {
                page_index,
                is_visible: now_visible.contains(&page_index),
            })
            .collect();
        events.sort_by_key(|event| event.page_index);

        self.visible = now_visible;
        events
    }

    fn meets_threshold(&self, page: &PagePlaceholder, band_start: f32, band_end: f32) -> bool {
        let overlap = page.bottom().min(band_end) - page.top.max(band_start);
        if overlap <= 0.0 {
            return false;
        }

        if page.height <= 0.0 {
            return true;
        }

        overlap / page.height >= self.threshold
    }
}
