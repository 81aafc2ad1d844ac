//! One side of the comparison: a document, its scroll container and its
//! magnification.
//!
//! Pages are laid out as fixed-height placeholders. Only pages the
//! visibility tracker reports are queued for rendering; rendered surfaces are
//! cached per page and zoom so a scale change re-renders without reloading.

use crate::render_queue::{RenderPriority, RenderQueue, SurfaceCache};
use crate::scale::{clamp_scale, round_hundredths, scale_percent};
use crate::visibility::{PagePlaceholder, ScrollContainer, VisibilityEvent, VisibilityTracker};
use doc_model::{Preferences, Side};
use pdf_engine::{
    DocumentHandle, LoadedDocument, PageSize, PageSurface, PaginatedRenderer, RendererError,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub scale: f32,
    pub client_height: f32,
    pub page_gap_px: f32,
    pub threshold: f32,
    pub prefetch_margin_px: f32,
    pub cache_pages: usize,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self::from_preferences(&Preferences::default(), 800.0)
    }
}

impl ViewportConfig {
    pub fn from_preferences(preferences: &Preferences, client_height: f32) -> Self {
        Self {
            scale: clamp_scale(preferences.default_scale),
            client_height,
            page_gap_px: preferences.page_gap_px.max(0.0),
            threshold: preferences.visibility.threshold,
            prefetch_margin_px: preferences.visibility.prefetch_margin_px,
            cache_pages: preferences.render_cache_pages,
        }
    }
}

/// Right-click request forwarded to the labeling feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextMenuRequest {
    pub side: Side,
    /// Page under the pointer, if any.
    pub page_index: Option<u32>,
    /// Pointer position in container coordinates.
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOutcome {
    pub rendered: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for RenderOutcome {
    fn add_assign(&mut self, other: Self) {
        self.rendered += other.rendered;
        self.failed += other.failed;
    }
}

type ScrollHook = Box<dyn FnMut(Side, f32)>;
type ContextMenuHook = Box<dyn FnMut(ContextMenuRequest)>;

#[derive(Debug, Clone)]
struct ViewportDocument {
    handle: DocumentHandle,
    page_sizes: Vec<PageSize>,
}

pub struct Viewport {
    side: Side,
    scale: f32,
    page_gap_px: f32,
    document: Option<ViewportDocument>,
    container: ScrollContainer,
    placeholders: Vec<PagePlaceholder>,
    tracker: VisibilityTracker,
    queue: RenderQueue,
    surfaces: SurfaceCache,
    on_scroll: Option<ScrollHook>,
    on_context_menu: Option<ContextMenuHook>,
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("side", &self.side)
            .field("scale", &self.scale)
            .field("document", &self.document.as_ref().map(|doc| doc.handle))
            .field("container", &self.container)
            .field("pages", &self.placeholders.len())
            .finish_non_exhaustive()
    }
}

impl Viewport {
    pub fn new(side: Side, config: ViewportConfig) -> Self {
        let scale = normalize_scale(config.scale).unwrap_or(1.0);
        Self {
            side,
            scale,
            page_gap_px: config.page_gap_px,
            document: None,
            container: ScrollContainer::new(config.client_height),
            placeholders: Vec::new(),
            tracker: VisibilityTracker::new(config.threshold, config.prefetch_margin_px),
            queue: RenderQueue::new(),
            surfaces: SurfaceCache::new(config.cache_pages, scale_percent(scale)),
            on_scroll: None,
            on_context_menu: None,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn container(&self) -> &ScrollContainer {
        &self.container
    }

    pub fn scroll_top(&self) -> f32 {
        self.container.scroll_top()
    }

    pub fn document(&self) -> Option<DocumentHandle> {
        self.document.as_ref().map(|doc| doc.handle)
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn page_count(&self) -> u32 {
        self.placeholders.len() as u32
    }

    pub fn placeholders(&self) -> &[PagePlaceholder] {
        &self.placeholders
    }

    pub fn visible_pages(&self) -> Vec<u32> {
        self.tracker.visible_pages().collect()
    }

    pub fn pending_renders(&self) -> usize {
        self.queue.len()
    }

    pub fn cached_pages(&self) -> usize {
        self.surfaces.len()
    }

    pub fn set_on_scroll<F>(&mut self, callback: F)
    where
        F: FnMut(Side, f32) + 'static,
    {
        self.on_scroll = Some(Box::new(callback));
    }

    pub fn set_on_context_menu<F>(&mut self, callback: F)
    where
        F: FnMut(ContextMenuRequest) + 'static,
    {
        self.on_context_menu = Some(Box::new(callback));
    }

    /// Attaches a freshly loaded document, reading page geometry from `renderer`.
    pub fn attach(
        &mut self,
        renderer: &dyn PaginatedRenderer,
        loaded: LoadedDocument,
    ) -> Result<(), RendererError> {
        let page_sizes = (0..loaded.page_count)
            .map(|page_index| renderer.page_size(loaded.handle, page_index))
            .collect::<Result<Vec<_>, _>>()?;

        self.attach_layout(loaded.handle, page_sizes);
        Ok(())
    }

    /// Attaches a document whose geometry is already known, as mirrors do.
    pub fn attach_layout(&mut self, handle: DocumentHandle, page_sizes: Vec<PageSize>) {
        self.document = Some(ViewportDocument { handle, page_sizes });
        self.reset_for_new_document();
    }

    /// Detaches the document and returns its handle so the caller can close it.
    pub fn detach(&mut self) -> Option<DocumentHandle> {
        let handle = self.document.take().map(|doc| doc.handle);
        self.reset_for_new_document();
        handle
    }

    /// Page geometry of the attached document.
    pub fn page_sizes(&self) -> &[PageSize] {
        self.document.as_ref().map(|doc| doc.page_sizes.as_slice()).unwrap_or_default()
    }

    /// Exchanges documents with `other`; both start again from the top.
    pub fn swap_documents(&mut self, other: &mut Viewport) {
        std::mem::swap(&mut self.document, &mut other.document);
        self.reset_for_new_document();
        other.reset_for_new_document();
    }

    /// Applies a new magnification. Range limits are the caller's business
    /// (mirrors legitimately exceed the primary bounds); non-positive values
    /// are ignored. Returns false when nothing changed.
    pub fn set_scale(&mut self, scale: f32) -> bool {
        let Some(scale) = normalize_scale(scale) else {
            return false;
        };
        if scale == self.scale {
            return false;
        }

        self.scale = scale;
        self.relayout();
        self.queue.clear();
        self.tracker.reset();
        let evicted = self.surfaces.set_zoom(scale_percent(scale));
        tracing::trace!(
            side = self.side.name(),
            zoom = self.surfaces.zoom_percent(),
            evicted,
            "viewport rescaled"
        );
        true
    }

    /// Writes the container position (clamped) and returns the applied value.
    pub fn set_scroll_top(&mut self, scroll_top: f32) -> f32 {
        self.container.set_scroll_top(scroll_top)
    }

    pub fn set_client_height(&mut self, client_height: f32) {
        self.container.set_client_height(client_height);
    }

    /// Forwards a scroll event to the registered hook.
    pub fn notify_scroll(&mut self) {
        let scroll_top = self.container.scroll_top();
        if let Some(callback) = self.on_scroll.as_mut() {
            callback(self.side, scroll_top);
        }
    }

    /// Resolves the page under a container point and forwards it to the hook.
    pub fn context_menu(&mut self, x: f32, y: f32) -> ContextMenuRequest {
        let content_y = y + self.container.scroll_top();
        let page_index = self
            .placeholders
            .iter()
            .find(|page| content_y >= page.top && content_y < page.bottom())
            .map(|page| page.page_index);

        let request = ContextMenuRequest { side: self.side, page_index, x, y };
        if let Some(callback) = self.on_context_menu.as_mut() {
            callback(request);
        }
        request
    }

    /// Re-evaluates page visibility and queues renders for newly visible pages.
    pub fn refresh_visibility(&mut self) -> Vec<VisibilityEvent> {
        if self.document.is_none() {
            return Vec::new();
        }

        let events = self.tracker.observe(&self.container, &self.placeholders);

        for event in &events {
            if !event.is_visible {
                self.queue.cancel(event.page_index);
                continue;
            }

            if !self.surfaces.contains(event.page_index) {
                let priority = self.priority_for(event.page_index);
                self.queue.enqueue(event.page_index, priority);
            }
        }

        events
    }

    /// Renders every queued page. A failing page keeps its placeholder.
    pub fn render_pending(&mut self, renderer: &dyn PaginatedRenderer) -> RenderOutcome {
        let mut outcome = RenderOutcome::default();
        let Some(handle) = self.document() else {
            return outcome;
        };

        while let Some(page_index) = self.queue.pop_next() {
            match renderer.render(handle, page_index, self.scale) {
                Ok(surface) => {
                    self.surfaces.insert(page_index, surface);
                    outcome.rendered += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        side = self.side.name(),
                        page = page_index,
                        "page render failed: {err}"
                    );
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    /// Cached surface for `page_index` at the current scale.
    pub fn surface(&self, page_index: u32) -> Option<&PageSurface> {
        self.surfaces.get(page_index)
    }

    /// Visible pages that have a rendered surface, with their placeholders.
    pub fn rendered_visible(&self) -> Vec<(PagePlaceholder, &PageSurface)> {
        self.tracker
            .visible_pages()
            .filter_map(|page_index| {
                let placeholder = *self.placeholders.get(page_index as usize)?;
                Some((placeholder, self.surface(page_index)?))
            })
            .collect()
    }

    fn priority_for(&self, page_index: u32) -> RenderPriority {
        let Some(page) = self.placeholders.get(page_index as usize) else {
            return RenderPriority::Prefetch;
        };

        let view_start = self.container.scroll_top();
        let view_end = view_start + self.container.client_height();
        if page.bottom() > view_start && page.top < view_end {
            RenderPriority::Visible
        } else {
            RenderPriority::Prefetch
        }
    }

    fn reset_for_new_document(&mut self) {
        self.tracker.reset();
        self.queue.clear();
        self.surfaces.clear();
        self.relayout();
        self.container.set_scroll_top(0.0);
    }

    fn relayout(&mut self) {
        self.placeholders.clear();
        let page_sizes =
            self.document.as_ref().map(|doc| doc.page_sizes.as_slice()).unwrap_or_default();
        let mut cursor = 0.0;

        for (index, size) in page_sizes.iter().enumerate() {
            let placeholder = PagePlaceholder {
                page_index: index as u32,
                top: cursor,
                width: size.width_pt * self.scale,
                height: size.height_pt * self.scale,
            };
            cursor = placeholder.bottom() + self.page_gap_px;
            self.placeholders.push(placeholder);
        }

        let scroll_height = self.placeholders.last().map(PagePlaceholder::bottom).unwrap_or(0.0);
        self.container.set_scroll_height(scroll_height);
    }
}

fn normalize_scale(scale: f32) -> Option<f32> {
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }
    Some(round_hundredths(scale).max(0.01))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_engine::{testing, LopdfRenderer, OpenSource};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn loaded(renderer: &mut LopdfRenderer, pages: usize) -> LoadedDocument {
        renderer
            .load(OpenSource::Bytes(testing::letter_pdf(pages)))
            .expect("synthetic pdf should load")
    }

    fn viewport(client_height: f32) -> Viewport {
        let config = ViewportConfig {
            scale: 1.0,
            client_height,
            page_gap_px: 8.0,
            threshold: 0.01,
            prefetch_margin_px: 0.0,
            cache_pages: 16,
        };
        Viewport::new(Side::Left, config)
    }

    #[test]
    fn placeholders_follow_scale() {
        let mut renderer = LopdfRenderer::new();
        let doc = loaded(&mut renderer, 3);
        let mut viewport = viewport(800.0);
        viewport.attach(&renderer, doc).expect("attach should succeed");

        assert_eq!(viewport.page_count(), 3);
        assert_eq!(viewport.placeholders()[1].top, 800.0);
        assert_eq!(viewport.container().scroll_height(), 792.0 * 3.0 + 16.0);

        assert!(viewport.set_scale(0.5));
        assert_eq!(viewport.placeholders()[1].top, 404.0);
        assert_eq!(viewport.placeholders()[1].height, 396.0);
        assert!(!viewport.set_scale(0.5));
    }

    #[test]
    fn only_visible_pages_are_rendered() {
        let mut renderer = LopdfRenderer::new();
        let doc = loaded(&mut renderer, 5);
        let mut viewport = viewport(700.0);
        viewport.attach(&renderer, doc).expect("attach should succeed");

        viewport.refresh_visibility();
        let outcome = viewport.render_pending(&renderer);

        assert_eq!(outcome, RenderOutcome { rendered: 1, failed: 0 });
        assert!(viewport.surface(0).is_some());
        assert!(viewport.surface(1).is_none());
        assert_eq!(viewport.rendered_visible().len(), 1);
    }

    #[test]
    fn rescale_renders_again_at_new_size() {
        let mut renderer = LopdfRenderer::new();
        let doc = loaded(&mut renderer, 2);
        let mut viewport = viewport(700.0);
        viewport.attach(&renderer, doc).expect("attach should succeed");
        viewport.refresh_visibility();
        viewport.render_pending(&renderer);

        assert_eq!(viewport.cached_pages(), 1);

        viewport.set_scale(2.0);
        assert!(viewport.surface(0).is_none());
        assert_eq!(viewport.cached_pages(), 0);

        viewport.refresh_visibility();
        viewport.render_pending(&renderer);
        let surface = viewport.surface(0).expect("page 0 rendered at 200%");
        assert_eq!(surface.width(), 1224);
    }

    #[test]
    fn scroll_hook_receives_side_and_position() {
        let mut renderer = LopdfRenderer::new();
        let doc = loaded(&mut renderer, 5);
        let mut viewport = viewport(700.0);
        viewport.attach(&renderer, doc).expect("attach should succeed");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        viewport.set_on_scroll(move |side, top| sink.borrow_mut().push((side, top)));

        viewport.set_scroll_top(250.0);
        viewport.notify_scroll();

        assert_eq!(*seen.borrow(), vec![(Side::Left, 250.0)]);
    }

    #[test]
    fn context_menu_resolves_page_under_pointer() {
        let mut renderer = LopdfRenderer::new();
        let doc = loaded(&mut renderer, 5);
        let mut viewport = viewport(700.0);
        viewport.attach(&renderer, doc).expect("attach should succeed");
        viewport.set_scroll_top(800.0);

        let request = viewport.context_menu(10.0, 20.0);
        assert_eq!(request.page_index, Some(1));

        // Inside the gap between pages 1 and 2.
        let gap = viewport.context_menu(10.0, 795.0);
        assert_eq!(gap.page_index, None);
    }

    #[test]
    fn detach_resets_geometry() {
        let mut renderer = LopdfRenderer::new();
        let doc = loaded(&mut renderer, 2);
        let mut viewport = viewport(700.0);
        viewport.attach(&renderer, doc).expect("attach should succeed");
        viewport.set_scroll_top(300.0);

        assert_eq!(viewport.detach(), Some(doc.handle));
        assert_eq!(viewport.page_count(), 0);
        assert_eq!(viewport.scroll_top(), 0.0);
        assert!(viewport.refresh_visibility().is_empty());
    }
}
