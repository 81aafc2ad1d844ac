//! Single-threaded event queue with one-tick deferred tasks.
//!
//! Viewport hooks push follow-up events through an [`EventSender`]; the app
//! drains them in the same dispatch pass. Deferred tasks only run when the
//! host calls `tick`.

use doc_model::Side;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use viewer_core::{ContextMenuRequest, PanelHitTarget, Point, WindowSize};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A primary scroll container reported a new position.
    Scrolled { side: Side, scroll_top: f32 },
    ZoomIn(Side),
    ZoomOut(Side),
    /// Programmatic magnification; keeps the zoom link offset meaningful.
    SetScale { side: Side, scale: f32 },
    SetZoomLinked(bool),
    SetScrollLinked(bool),
    PointerDown { target: PanelHitTarget, position: Point },
    PointerMove { position: Point },
    PointerUp,
    ToggleOverlay,
    ToggleDock,
    PanelZoomIn,
    PanelZoomOut,
    SwapFront,
    Resized(WindowSize),
    FileDropped { side: Side, name: String, media_type: String, bytes: Vec<u8> },
    ContextMenu { side: Side, x: f32, y: f32 },
    LabelMenuRequested(ContextMenuRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    ReleaseScrollEcho,
}

/// Cloneable handle hooks use to queue events.
#[derive(Debug, Clone)]
pub struct EventSender {
    queue: Rc<RefCell<VecDeque<UiEvent>>>,
}

impl EventSender {
    pub fn push(&self, event: UiEvent) {
        self.queue.borrow_mut().push_back(event);
    }
}

#[derive(Debug, Default)]
pub struct EventLoop {
    queue: Rc<RefCell<VecDeque<UiEvent>>>,
    deferred: VecDeque<DeferredTask>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> EventSender {
        EventSender { queue: Rc::clone(&self.queue) }
    }

    pub fn push(&self, event: UiEvent) {
        self.queue.borrow_mut().push_back(event);
    }

    pub fn next_event(&self) -> Option<UiEvent> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Schedules `task` for the next tick. A task already pending is not
    /// queued twice.
    pub fn defer(&mut self, task: DeferredTask) {
        if !self.deferred.contains(&task) {
            self.deferred.push_back(task);
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    pub fn take_deferred(&mut self) -> Vec<DeferredTask> {
        self.deferred.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_feeds_the_same_queue() {
        let events = EventLoop::new();
        let sender = events.sender();

        sender.push(UiEvent::ZoomIn(Side::Left));
        events.push(UiEvent::PointerUp);

        assert_eq!(events.pending_events(), 2);
        assert_eq!(events.next_event(), Some(UiEvent::ZoomIn(Side::Left)));
        assert_eq!(events.next_event(), Some(UiEvent::PointerUp));
        assert_eq!(events.next_event(), None);
    }

    #[test]
    fn deferred_tasks_are_deduplicated_and_drained() {
        let mut events = EventLoop::new();
        events.defer(DeferredTask::ReleaseScrollEcho);
        events.defer(DeferredTask::ReleaseScrollEcho);

        assert_eq!(events.take_deferred(), vec![DeferredTask::ReleaseScrollEcho]);
        assert_eq!(events.pending_tasks(), 0);
    }
}
