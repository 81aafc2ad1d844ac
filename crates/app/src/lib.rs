//! Duopane application instance.
//!
//! Owns both primary viewports, the overlay panel with its two mirror
//! viewports, the sync coordinator, the label session and the shared
//! renderer. Hosts feed [`UiEvent`]s through [`App::dispatch`] and call
//! [`App::tick`] once per frame.
//!
//! # Example
//!
//! ```
//! use duopane::{App, AppConfig, UiEvent};
//! use doc_model::Side;
//!
//! let mut app = App::new(AppConfig::default())?;
//!
//! app.dispatch(UiEvent::SetZoomLinked(true));
//! app.dispatch(UiEvent::ZoomIn(Side::Left));
//! app.tick();
//!
//! assert_eq!(app.pane(Side::Right).scale(), 1.1);
//! # Ok::<(), duopane::AppError>(())
//! ```

mod composite;
mod error;
mod event_loop;
mod report;

pub use composite::{blend_over, paint_viewport};
pub use error::{AppError, AppResult};
pub use event_loop::{DeferredTask, EventLoop, EventSender, UiEvent};
pub use report::{export_summary_csv, ReportConfig, ReportError, ReportResult};

use doc_model::{
    apply_session_action, Preferences, SessionAction, SessionState, Side, SlotDocument,
};
use pdf_engine::{
    accepts_file, init_renderer, DocumentHandle, OpenSource, PageSurface, PaginatedRenderer,
    RendererConfig,
};
use std::io::Write;
use storage::Storage;
use viewer_core::{
    ContextMenuRequest, OverlayPanel, PanelInteraction, RenderOutcome, ScaleChange,
    SyncCoordinator, Viewport, ViewportConfig, WindowSize,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub preferences: Preferences,
    pub renderer: RendererConfig,
    pub window: WindowSize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preferences: Preferences::default(),
            renderer: RendererConfig::default(),
            window: WindowSize::new(1600.0, 1000.0),
        }
    }
}

/// One value per side.
#[derive(Debug)]
pub struct SidePair<T> {
    pub left: T,
    pub right: T,
}

impl<T> SidePair<T> {
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Label menu opened by a right-click, with the labels it may offer.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMenu {
    pub request: ContextMenuRequest,
    pub labels: Vec<String>,
}

pub struct App {
    renderer: Box<dyn PaginatedRenderer>,
    preferences: Preferences,
    window: WindowSize,
    session: SessionState,
    sync: SyncCoordinator,
    panes: SidePair<Viewport>,
    mirrors: SidePair<Viewport>,
    overlay: OverlayPanel,
    events: EventLoop,
    label_menu: Option<LabelMenu>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("window", &self.window)
            .field("sync", &self.sync)
            .field("panes", &self.panes)
            .field("overlay", &self.overlay)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Initializes the renderer from `config` and builds an empty session.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let renderer = init_renderer(config.renderer)?;
        Ok(Self::with_renderer(renderer, config.preferences, config.window))
    }

    /// Loads preferences from `storage`, falling back to defaults when none
    /// were saved yet.
    pub fn from_storage(
        storage: &Storage,
        renderer: RendererConfig,
        window: WindowSize,
    ) -> AppResult<Self> {
        let preferences = storage.load_preferences()?;
        Self::new(AppConfig { preferences, renderer, window })
    }

    pub fn with_renderer(
        renderer: Box<dyn PaginatedRenderer>,
        preferences: Preferences,
        window: WindowSize,
    ) -> Self {
        let events = EventLoop::new();
        let overlay = OverlayPanel::new(&preferences.overlay);

        let mut sync = SyncCoordinator::new(preferences.default_scale, preferences.default_scale);
        sync.set_zoom_linked(preferences.zoom_linked);
        sync.set_scroll_linked(preferences.scroll_linked, 0.0, 0.0);

        let pane_config = ViewportConfig {
            scale: sync.scale(Side::Left),
            ..ViewportConfig::from_preferences(&preferences, window.height)
        };
        let mirror_config = ViewportConfig {
            scale: overlay.mirror_scale(pane_config.scale),
            client_height: overlay.frame(window).height,
            ..pane_config
        };

        let mut panes = SidePair {
            left: Viewport::new(Side::Left, pane_config),
            right: Viewport::new(Side::Right, pane_config),
        };
        for side in Side::BOTH {
            let scroll_sender = events.sender();
            let menu_sender = events.sender();
            let pane = panes.get_mut(side);
            pane.set_on_scroll(move |side, scroll_top| {
                scroll_sender.push(UiEvent::Scrolled { side, scroll_top });
            });
            pane.set_on_context_menu(move |request| {
                menu_sender.push(UiEvent::LabelMenuRequested(request));
            });
        }

        let mirrors = SidePair {
            left: Viewport::new(Side::Left, mirror_config),
            right: Viewport::new(Side::Right, mirror_config),
        };

        tracing::debug!(
            zoom_linked = preferences.zoom_linked,
            scroll_linked = preferences.scroll_linked,
            "app initialized"
        );

        Self {
            renderer,
            preferences,
            window,
            session: SessionState::default(),
            sync,
            panes,
            mirrors,
            overlay,
            events,
            label_menu: None,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn window(&self) -> WindowSize {
        self.window
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    pub fn overlay(&self) -> &OverlayPanel {
        &self.overlay
    }

    pub fn pane(&self, side: Side) -> &Viewport {
        self.panes.get(side)
    }

    pub fn mirror(&self, side: Side) -> &Viewport {
        self.mirrors.get(side)
    }

    pub fn label_menu(&self) -> Option<&LabelMenu> {
        self.label_menu.as_ref()
    }

    pub fn available_labels(&self) -> Vec<&str> {
        self.session.available_labels()
    }

    /// Processes `event` and every follow-up event it causes before returning.
    pub fn dispatch(&mut self, event: UiEvent) {
        self.events.push(event);
        while let Some(event) = self.events.next_event() {
            self.handle(event);
        }
    }

    /// Runs tasks deferred during the previous dispatch passes.
    pub fn tick(&mut self) {
        for task in self.events.take_deferred() {
            match task {
                DeferredTask::ReleaseScrollEcho => self.sync.release_echo_guard(),
            }
        }
    }

    /// Opens `source` into the slot on `side`, closing whatever was there.
    pub fn load_document(
        &mut self,
        side: Side,
        source: impl Into<OpenSource>,
        title: impl Into<String>,
    ) -> AppResult<()> {
        let source = source.into();
        let path = match &source {
            OpenSource::Path(path) => Some(path.clone()),
            OpenSource::Bytes(_) => None,
        };

        let loaded = self.renderer.load(source)?;
        let previous = self.panes.get(side).document();
        if let Err(err) = self.panes.get_mut(side).attach(self.renderer.as_ref(), loaded) {
            self.close_handle(side, loaded.handle);
            return Err(err.into());
        }
        if let Some(previous) = previous {
            self.close_handle(side, previous);
        }

        let page_sizes = self.panes.get(side).page_sizes().to_vec();
        self.mirrors.get_mut(side).attach_layout(loaded.handle, page_sizes);

        let title = title.into();
        tracing::debug!(side = side.name(), %title, pages = loaded.page_count, "document loaded");
        apply_session_action(
            &mut self.session,
            SessionAction::SetDocument {
                side,
                document: SlotDocument {
                    handle: loaded.handle.raw(),
                    title,
                    source: path,
                    page_count: loaded.page_count,
                },
            },
        );

        self.recapture_scroll_offset();
        self.refresh_side(side);
        Ok(())
    }

    /// Opens a picked or dropped file. Returns `Ok(false)` without touching
    /// any state when the file is not a PDF.
    pub fn drop_file(
        &mut self,
        side: Side,
        name: &str,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<bool> {
        if !accepts_file(media_type, &bytes) {
            tracing::debug!(
                side = side.name(),
                name = %name,
                media_type = %media_type,
                "ignored non-pdf file"
            );
            return Ok(false);
        }

        self.load_document(side, bytes, name)?;
        Ok(true)
    }

    pub fn remove_document(&mut self, side: Side) {
        if let Some(handle) = self.panes.get_mut(side).detach() {
            self.close_handle(side, handle);
        }
        self.mirrors.get_mut(side).detach();
        apply_session_action(&mut self.session, SessionAction::ClearDocument { side });
        self.recapture_scroll_offset();
    }

    /// Exchanges documents between the sides. Both start again from the top.
    pub fn swap_documents(&mut self) {
        self.panes.left.swap_documents(&mut self.panes.right);
        self.mirrors.left.swap_documents(&mut self.mirrors.right);
        apply_session_action(&mut self.session, SessionAction::SwapDocuments);

        self.recapture_scroll_offset();
        for side in Side::BOTH {
            self.refresh_side(side);
        }
    }

    /// Applies a label or summary action. Document actions are routed through
    /// the slot operations so the viewports stay in step.
    pub fn apply(&mut self, action: SessionAction) {
        match action {
            SessionAction::SwapDocuments => self.swap_documents(),
            SessionAction::ClearDocument { side } => self.remove_document(side),
            SessionAction::SetDocument { side, .. } => {
                tracing::debug!(side = side.name(), "documents are set by loading them");
            }
            action => apply_session_action(&mut self.session, action),
        }
    }

    /// Assigns `text` selected on the side of the open label menu and closes it.
    pub fn assign_from_menu(&mut self, label: &str, text: &str) -> bool {
        let Some(menu) = self.label_menu.take() else {
            return false;
        };

        self.apply(SessionAction::AssignSelection {
            label: label.to_owned(),
            side: menu.request.side,
            text: text.to_owned(),
        });
        true
    }

    pub fn dismiss_label_menu(&mut self) {
        self.label_menu = None;
    }

    pub fn export_summary_csv<W: Write>(&self, writer: W, config: &ReportConfig) -> AppResult<()> {
        export_summary_csv(writer, &self.session.summary, config)?;
        Ok(())
    }

    /// Current link and overlay settings folded into the loaded preferences.
    pub fn current_preferences(&self) -> Preferences {
        let floating = self.overlay.floating();
        let mut preferences = self.preferences.clone();
        preferences.zoom_linked = self.sync.zoom_linked();
        preferences.scroll_linked = self.sync.scroll_linked();
        preferences.overlay.panel_zoom = self.overlay.zoom();
        preferences.overlay.front_side = self.overlay.front_side();
        preferences.overlay.x = floating.position.x;
        preferences.overlay.y = floating.position.y;
        preferences.overlay.width_ratio = floating.width_ratio;
        preferences.overlay.height_ratio = floating.height_ratio;
        preferences
    }

    pub fn save_preferences(&self, storage: &Storage) -> AppResult<()> {
        storage.save_preferences(&self.current_preferences())?;
        Ok(())
    }

    /// Renders every queued page of the primaries, and of the mirrors while
    /// the overlay is shown.
    pub fn render_pending(&mut self) -> RenderOutcome {
        let mut outcome = RenderOutcome::default();
        let overlay_visible = self.overlay.is_visible();
        let renderer = self.renderer.as_ref();

        for side in Side::BOTH {
            outcome += render_viewport(self.panes.get_mut(side), renderer);
            if overlay_visible {
                outcome += render_viewport(self.mirrors.get_mut(side), renderer);
            }
        }

        outcome
    }

    /// Composites the overlay panel: the base layer at full opacity, then the
    /// front layer on top. `None` while the panel is hidden.
    pub fn render_overlay(&mut self) -> Option<PageSurface> {
        if !self.overlay.is_visible() {
            return None;
        }

        for side in Side::BOTH {
            render_viewport(self.mirrors.get_mut(side), self.renderer.as_ref());
        }

        let frame = self.overlay.frame(self.window);
        let width = frame.width.max(1.0).round() as u32;
        let height = frame.height.max(1.0).round() as u32;
        let mut canvas = PageSurface::new(width, height);
        for layer in self.overlay.layers() {
            paint_viewport(&mut canvas, self.mirrors.get(layer.side), layer.opacity);
        }

        Some(canvas)
    }

    fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Scrolled { side, scroll_top } => self.on_scrolled(side, scroll_top),
            UiEvent::ZoomIn(side) => {
                let change = self.sync.change_scale(side, self.preferences.zoom_step);
                self.apply_scales(change);
            }
            UiEvent::ZoomOut(side) => {
                let change = self.sync.change_scale(side, -self.preferences.zoom_step);
                self.apply_scales(change);
            }
            UiEvent::SetScale { side, scale } => {
                let change = self.sync.set_scale(side, scale);
                self.apply_scales(change);
            }
            UiEvent::SetZoomLinked(linked) => self.sync.set_zoom_linked(linked),
            UiEvent::SetScrollLinked(linked) => {
                let (left, right) = self.scroll_tops();
                self.sync.set_scroll_linked(linked, left, right);
            }
            UiEvent::PointerDown { target, position } => {
                self.overlay.pointer_down(target, position, self.window);
            }
            UiEvent::PointerMove { position } => {
                let resizing =
                    matches!(self.overlay.interaction(), PanelInteraction::Resizing { .. });
                if self.overlay.pointer_move(position, self.window) && resizing {
                    self.sync_mirror_geometry();
                }
            }
            UiEvent::PointerUp => self.overlay.pointer_up(),
            UiEvent::ToggleOverlay => {
                if self.overlay.toggle_visible() {
                    self.sync_mirror_geometry();
                }
                tracing::debug!(visible = self.overlay.is_visible(), "overlay toggled");
            }
            UiEvent::ToggleDock => {
                self.overlay.toggle_docked();
                self.sync_mirror_geometry();
            }
            UiEvent::PanelZoomIn => {
                self.overlay.zoom_in();
                self.apply_scales(self.sync.scales());
            }
            UiEvent::PanelZoomOut => {
                self.overlay.zoom_out();
                self.apply_scales(self.sync.scales());
            }
            UiEvent::SwapFront => {
                self.overlay.swap_front();
            }
            UiEvent::Resized(window) => {
                self.window = window;
                self.sync_mirror_geometry();
                for side in Side::BOTH {
                    let before = self.panes.get(side).scroll_top();
                    self.panes.get_mut(side).set_client_height(window.height);
                    self.refresh_side(side);
                    self.report_reclamp(side, before);
                }
            }
            UiEvent::FileDropped { side, name, media_type, bytes } => {
                if let Err(err) = self.drop_file(side, &name, &media_type, bytes) {
                    tracing::warn!(
                        side = side.name(),
                        name = %name,
                        "dropped file could not be opened: {err}"
                    );
                }
            }
            UiEvent::ContextMenu { side, x, y } => {
                self.panes.get_mut(side).context_menu(x, y);
            }
            UiEvent::LabelMenuRequested(request) => {
                let labels = self.available_labels().into_iter().map(str::to_owned).collect();
                self.label_menu = Some(LabelMenu { request, labels });
            }
        }
    }

    /// Moves the reporting container, mirrors it and, when linked, writes the
    /// paired container once. The paired container's own scroll event comes
    /// back through the hook and is swallowed by the echo guard.
    fn on_scrolled(&mut self, side: Side, scroll_top: f32) {
        let pane = self.panes.get_mut(side);
        // Events raised by our own writes already match the container.
        let applied = if pane.scroll_top() == scroll_top {
            scroll_top
        } else {
            pane.set_scroll_top(scroll_top)
        };
        self.refresh_side(side);
        self.mirror_scroll(side);

        let Some(write) = self.sync.on_scroll(side, applied) else {
            return;
        };

        let paired = self.panes.get_mut(write.side);
        paired.set_scroll_top(write.scroll_top);
        paired.notify_scroll();
        self.events.defer(DeferredTask::ReleaseScrollEcho);
    }

    fn apply_scales(&mut self, change: ScaleChange) {
        for side in Side::BOTH {
            let scale = change.get(side);
            let before = self.panes.get(side).scroll_top();
            if self.panes.get_mut(side).set_scale(scale) {
                self.refresh_side(side);
            }
            self.mirrors.get_mut(side).set_scale(self.overlay.mirror_scale(scale));
            self.report_reclamp(side, before);
        }
        tracing::debug!(left = change.left, right = change.right, "scales applied");
    }

    /// A relayout that pulled a primary back into range raises its scroll
    /// event, so the mirror and a linked partner follow. Otherwise the mirror
    /// is re-copied in case its own geometry changed.
    fn report_reclamp(&mut self, side: Side, before: f32) {
        let pane = self.panes.get_mut(side);
        if pane.scroll_top() != before {
            tracing::trace!(
                side = side.name(),
                from = before,
                to = pane.scroll_top(),
                "scroll position reclamped"
            );
            pane.notify_scroll();
            return;
        }
        self.mirror_scroll(side);
    }

    fn mirror_scroll(&mut self, side: Side) {
        if !self.overlay.is_visible() {
            return;
        }
        let scroll_top = self.panes.get(side).scroll_top();
        self.mirrors.get_mut(side).set_scroll_top(scroll_top);
    }

    fn sync_mirror_geometry(&mut self) {
        let height = self.overlay.frame(self.window).height;
        for side in Side::BOTH {
            self.mirrors.get_mut(side).set_client_height(height);
            self.mirror_scroll(side);
        }
    }

    fn recapture_scroll_offset(&mut self) {
        if self.sync.scroll_linked() {
            let (left, right) = self.scroll_tops();
            self.sync.set_scroll_linked(true, left, right);
        }
    }

    fn scroll_tops(&self) -> (f32, f32) {
        (self.panes.left.scroll_top(), self.panes.right.scroll_top())
    }

    fn refresh_side(&mut self, side: Side) {
        self.panes.get_mut(side).refresh_visibility();
    }

    fn close_handle(&mut self, side: Side, handle: DocumentHandle) {
        if let Err(err) = self.renderer.close(handle) {
            tracing::warn!(side = side.name(), "closing document failed: {err}");
        }
    }
}

fn render_viewport(viewport: &mut Viewport, renderer: &dyn PaginatedRenderer) -> RenderOutcome {
    viewport.refresh_visibility();
    viewport.render_pending(renderer)
}
