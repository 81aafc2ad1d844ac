//! Per-viewport render bookkeeping: which pages still need a surface at the
//! current zoom, and the surfaces already produced.

use pdf_engine::PageSurface;
use std::collections::{BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPriority {
    /// Intersects the container's viewport.
    Visible,
    /// Only inside the prefetch margin.
    Prefetch,
}

/// Pages waiting for a render at the viewport's current zoom.
///
/// Visible pages are handed out before prefetch pages, top to bottom within
/// each group. The queue is emptied whenever the layout changes.
#[derive(Debug, Default)]
pub struct RenderQueue {
    visible: BTreeSet<u32>,
    prefetch: BTreeSet<u32>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `page_index`. A prefetch page that comes into view is promoted;
    /// a visible page is never demoted.
    pub fn enqueue(&mut self, page_index: u32, priority: RenderPriority) {
        match priority {
            RenderPriority::Visible => {
                self.prefetch.remove(&page_index);
                self.visible.insert(page_index);
            }
            RenderPriority::Prefetch if !self.visible.contains(&page_index) => {
                self.prefetch.insert(page_index);
            }
            RenderPriority::Prefetch => {}
        }
    }

    /// Drops a page that left the prefetch range before it was rendered.
    pub fn cancel(&mut self, page_index: u32) -> bool {
        self.visible.remove(&page_index) | self.prefetch.remove(&page_index)
    }

    pub fn pop_next(&mut self) -> Option<u32> {
        self.visible.pop_first().or_else(|| self.prefetch.pop_first())
    }

    pub fn clear(&mut self) {
        self.visible.clear();
        self.prefetch.clear();
    }

    pub fn len(&self) -> usize {
        self.visible.len() + self.prefetch.len()
    }
}

/// Rendered pages of one document at a single zoom.
///
/// Holds at most `capacity` surfaces and evicts the least recently rendered
/// page first. Changing the zoom drops every surface rendered at the old one.
#[derive(Debug, Clone)]
pub struct SurfaceCache {
    capacity: usize,
    zoom_percent: u16,
    surfaces: HashMap<u32, PageSurface>,
    rendered_order: VecDeque<u32>,
}

impl SurfaceCache {
    pub fn new(capacity: usize, zoom_percent: u16) -> Self {
        Self {
            capacity: capacity.max(1),
            zoom_percent,
            surfaces: HashMap::new(),
            rendered_order: VecDeque::new(),
        }
    }

    pub fn zoom_percent(&self) -> u16 {
        self.zoom_percent
    }

    /// Switches the cache to `zoom_percent`. Returns how many off-scale
    /// surfaces were evicted.
    pub fn set_zoom(&mut self, zoom_percent: u16) -> usize {
        if zoom_percent == self.zoom_percent {
            return 0;
        }

        self.zoom_percent = zoom_percent;
        let evicted = self.surfaces.len();
        self.clear();
        evicted
    }

    pub fn contains(&self, page_index: u32) -> bool {
        self.surfaces.contains_key(&page_index)
    }

    pub fn get(&self, page_index: u32) -> Option<&PageSurface> {
        self.surfaces.get(&page_index)
    }

    pub fn insert(&mut self, page_index: u32, surface: PageSurface) {
        if self.surfaces.insert(page_index, surface).is_some() {
            self.rendered_order.retain(|page| *page != page_index);
        }
        self.rendered_order.push_back(page_index);

        while self.surfaces.len() > self.capacity {
            let Some(oldest) = self.rendered_order.pop_front() else {
                break;
            };
            self.surfaces.remove(&oldest);
        }
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
        self.rendered_order.clear();
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> PageSurface {
        PageSurface::new(2, 2)
    }

    #[test]
    fn visible_pages_render_first_in_page_order() {
        let mut queue = RenderQueue::new();
        queue.enqueue(5, RenderPriority::Prefetch);
        queue.enqueue(3, RenderPriority::Visible);
        queue.enqueue(2, RenderPriority::Visible);
        queue.enqueue(0, RenderPriority::Prefetch);

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop_next()).collect();
        assert_eq!(order, vec![2, 3, 0, 5]);
    }

    #[test]
    fn page_scrolled_into_view_is_promoted_once() {
        let mut queue = RenderQueue::new();
        queue.enqueue(4, RenderPriority::Prefetch);
        queue.enqueue(1, RenderPriority::Visible);
        queue.enqueue(4, RenderPriority::Visible);
        queue.enqueue(4, RenderPriority::Prefetch);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_next(), Some(1));
        assert_eq!(queue.pop_next(), Some(4));
        assert_eq!(queue.pop_next(), None);
    }

    #[test]
    fn cancelled_page_is_not_rendered() {
        let mut queue = RenderQueue::new();
        queue.enqueue(0, RenderPriority::Visible);
        queue.enqueue(1, RenderPriority::Prefetch);

        assert!(queue.cancel(1));
        assert!(!queue.cancel(1));
        assert_eq!(queue.pop_next(), Some(0));
        assert_eq!(queue.pop_next(), None);
    }

    #[test]
    fn zoom_change_evicts_off_scale_surfaces() {
        let mut cache = SurfaceCache::new(8, 100);
        cache.insert(0, surface());
        cache.insert(1, surface());

        assert_eq!(cache.set_zoom(100), 0);
        assert!(cache.contains(0));

        assert_eq!(cache.set_zoom(150), 2);
        assert_eq!(cache.zoom_percent(), 150);
        assert!(cache.get(0).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn capacity_drops_least_recently_rendered_page() {
        let mut cache = SurfaceCache::new(2, 100);
        cache.insert(0, surface());
        cache.insert(1, surface());
        // Re-rendering page 0 makes page 1 the oldest.
        cache.insert(0, surface());
        cache.insert(2, surface());

        assert!(cache.contains(0));
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
        assert_eq!(cache.len(), 2);
    }
}
