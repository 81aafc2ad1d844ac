use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod labels;

pub use labels::{LabelSet, SummaryEntry, SummaryTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Document currently shown in a slot. The handle is owned by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDocument {
    pub handle: u64,
    pub title: String,
    pub source: Option<PathBuf>,
    pub page_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSlot {
    pub side: Side,
    pub document: Option<SlotDocument>,
}

impl DocumentSlot {
    pub fn empty(side: Side) -> Self {
        Self { side, document: None }
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayDefaults {
    pub x: f32,
    pub y: f32,
    pub width_ratio: f32,
    pub height_ratio: f32,
    pub docked_height_ratio: f32,
    pub panel_zoom: f32,
    pub front_side: Side,
}

impl Default for OverlayDefaults {
    fn default() -> Self {
        Self {
            x: 80.0,
            y: 80.0,
            width_ratio: 0.5,
            height_ratio: 0.5,
            docked_height_ratio: 0.4,
            panel_zoom: 1.0,
            front_side: Side::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityDefaults {
    /// Fraction of a page's height that must intersect the observed band.
    pub threshold: f32,
    /// Extra band above and below the visible edge, in pixels.
    pub prefetch_margin_px: f32,
}

impl Default for VisibilityDefaults {
    fn default() -> Self {
        Self { threshold: 0.01, prefetch_margin_px: 400.0 }
    }
}

/// Start-up defaults loaded from the preferences file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub zoom_linked: bool,
    pub scroll_linked: bool,
    pub default_scale: f32,
    pub zoom_step: f32,
    pub page_gap_px: f32,
    pub render_cache_pages: usize,
    pub overlay: OverlayDefaults,
    pub visibility: VisibilityDefaults,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            zoom_linked: false,
            scroll_linked: false,
            default_scale: 1.0,
            zoom_step: 0.1,
            page_gap_px: 16.0,
            render_cache_pages: 24,
            overlay: OverlayDefaults::default(),
            visibility: VisibilityDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub left: DocumentSlot,
    pub right: DocumentSlot,
    pub labels: LabelSet,
    pub summary: SummaryTable,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            left: DocumentSlot::empty(Side::Left),
            right: DocumentSlot::empty(Side::Right),
            labels: LabelSet::default(),
            summary: SummaryTable::default(),
        }
    }
}

impl SessionState {
    pub fn slot(&self, side: Side) -> &DocumentSlot {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut DocumentSlot {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Labels that can still receive a selection on at least one side.
    pub fn available_labels(&self) -> Vec<&str> {
        self.labels.iter().filter(|label| !self.summary.is_complete(label)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    SetDocument { side: Side, document: SlotDocument },
    ClearDocument { side: Side },
    SwapDocuments,
    AddLabel { label: String },
    RemoveLabel { label: String },
    RenameLabel { from: String, to: String },
    AssignSelection { label: String, side: Side, text: String },
    RemoveSummaryEntry { label: String },
    ClearSummary,
}

pub fn apply_session_action(state: &mut SessionState, action: SessionAction) {
    match action {
        SessionAction::SetDocument { side, document } => {
            state.slot_mut(side).document = Some(document);
        }
        SessionAction::ClearDocument { side } => {
            state.slot_mut(side).document = None;
        }
        SessionAction::SwapDocuments => {
            std::mem::swap(&mut state.left.document, &mut state.right.document);
        }
        SessionAction::AddLabel { label } => {
            state.labels.insert(&label);
        }
        SessionAction::RemoveLabel { label } => {
            if state.labels.remove(&label) {
                state.summary.remove(label.trim());
            }
        }
        SessionAction::RenameLabel { from, to } => {
            if state.labels.rename(&from, &to) {
                state.summary.rename(from.trim(), to.trim());
            }
        }
        SessionAction::AssignSelection { label, side, text } => {
            if !state.labels.contains(&label) || text.trim().is_empty() {
                return;
            }
            state.summary.assign(label.trim(), side, text);
        }
        SessionAction::RemoveSummaryEntry { label } => {
            state.summary.remove(label.trim());
        }
        SessionAction::ClearSummary => state.summary.clear(),
    }
}
