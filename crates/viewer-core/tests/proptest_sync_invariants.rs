//! Property-based invariant tests for linking and the overlay panel.
//!
//! 1. Scales stay inside [MIN_SCALE, MAX_SCALE] for any sequence of steps.
//! 2. Linked steps keep the stored offset when nothing clamps.
//! 3. Resize ratios stay in (0, MAX_PANEL_RATIO] for any pointer path.
//! 4. Docking never touches floating geometry.
//! 5. At most one corrective scroll write per echo-guard window.

use proptest::prelude::*;
use viewer_core::{
    OverlayPanel, PanelHitTarget, Point, ScrollContainer, Side, SyncCoordinator, WindowSize,
    MAX_PANEL_RATIO, MAX_SCALE, MIN_SCALE,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Left), Just(Side::Right)]
}

fn steps(max_len: usize) -> impl Strategy<Value = Vec<(Side, f32)>> {
    proptest::collection::vec((side(), -3.0f32..3.0), 1..=max_len)
}

fn pointer_path(max_len: usize) -> impl Strategy<Value = Vec<(f32, f32)>> {
    proptest::collection::vec((-5000.0f32..5000.0, -5000.0f32..5000.0), 1..=max_len)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Scale bounds
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn scales_stay_in_range(
        left in 0.0f32..4.0,
        right in 0.0f32..4.0,
        linked in any::<bool>(),
        steps in steps(40),
    ) {
        let mut sync = SyncCoordinator::new(left, right);
        sync.set_zoom_linked(linked);

        for (side, delta) in steps {
            let change = sync.change_scale(side, delta);
            for scale in [change.left, change.right] {
                prop_assert!((MIN_SCALE..=MAX_SCALE).contains(&scale), "scale {} escaped", scale);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Offset preserved away from the bounds
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn linked_step_preserves_offset_when_unclamped(
        left_tenths in 8u8..=12,
        offset_tenths in 0u8..=3,
        delta_tenths in -2i8..=2,
        driver in side(),
    ) {
        let left = f32::from(left_tenths) / 10.0;
        let right = left + f32::from(offset_tenths) / 10.0;
        let mut sync = SyncCoordinator::new(left, right);
        sync.set_zoom_linked(true);
        let offset = sync.zoom_offset();

        let change = sync.change_scale(driver, f32::from(delta_tenths) / 10.0);

        prop_assert!(((change.right - change.left) - offset).abs() < 0.011);
        prop_assert_eq!(sync.zoom_offset(), offset);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Resize ratios
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn resize_ratios_stay_bounded(
        width in 300.0f32..4000.0,
        height in 300.0f32..3000.0,
        path in pointer_path(20),
    ) {
        let window = WindowSize::new(width, height);
        let mut panel = OverlayPanel::default();
        let frame = panel.frame(window);
        let grip = Point::new(frame.x + frame.width, frame.y + frame.height);
        panel.pointer_down(PanelHitTarget::ResizeGrip, grip, window);

        for (x, y) in path {
            panel.pointer_move(Point::new(x, y), window);
            let geometry = panel.floating();
            prop_assert!(geometry.width_ratio > 0.0 && geometry.width_ratio <= MAX_PANEL_RATIO);
            prop_assert!(geometry.height_ratio > 0.0 && geometry.height_ratio <= MAX_PANEL_RATIO);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Docking is geometry-neutral
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn docked_interaction_leaves_floating_geometry(path in pointer_path(20)) {
        let window = WindowSize::new(1600.0, 1000.0);
        let mut panel = OverlayPanel::default();
        let before = panel.floating();
        panel.toggle_docked();

        for (x, y) in path {
            let pointer = Point::new(x, y);
            panel.pointer_down(PanelHitTarget::DragHandle, pointer, window);
            panel.pointer_move(pointer, window);
            panel.pointer_down(PanelHitTarget::ResizeGrip, pointer, window);
            panel.pointer_move(Point::new(x * 2.0, y * 2.0), window);
            panel.pointer_up();
        }

        panel.toggle_docked();
        prop_assert_eq!(panel.floating(), before);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. One write per echo window
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn one_write_per_guard_window(
        events in proptest::collection::vec((side(), 0.0f32..10_000.0), 1..30),
    ) {
        let mut sync = SyncCoordinator::default();
        sync.set_scroll_linked(true, 0.0, 0.0);

        let writes = events
            .iter()
            .filter_map(|&(side, top)| sync.on_scroll(side, top))
            .count();

        prop_assert_eq!(writes, 1);
        sync.release_echo_guard();
        prop_assert!(!sync.echo_in_flight());
    }
}

proptest! {
    #[test]
    fn container_scroll_is_clamped(
        client in 1.0f32..2000.0,
        content in 0.0f32..20_000.0,
        requested in -50_000.0f32..50_000.0,
    ) {
        let mut container = ScrollContainer::new(client);
        container.set_scroll_height(content);

        let applied = container.set_scroll_top(requested);

        prop_assert!(applied >= 0.0);
        prop_assert!(applied <= container.max_scroll_top());
    }
}
