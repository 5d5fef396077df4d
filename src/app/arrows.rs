use crate::model::{AnchorPosition, Arrow, Board, Element, Point};

use super::BoardApp;
use super::anchor::{ANCHOR_HIT_RADIUS, anchor_at, resolve_anchor};
use super::arrow_draw::DrawSession;
use super::arrow_path::{committed_path, hit_test};

/// Offset of the delete affordance from the control point.
pub(super) const DELETE_OFFSET: f32 = 25.0;
pub(super) const CONTROL_HANDLE_RADIUS: f32 = 6.0;
pub(super) const DELETE_HIT_RADIUS: f32 = 9.0;

/// Mutation notifications from the element lifecycle; the registry keeps
/// arrows consistent with whatever happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ElementEvent {
    Moved,
    Resized,
    Deleted,
    Duplicated,
}

/// An interactive control-point drag; owns the arrow's control point for
/// the session's duration. Persisted only on release.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct ControlDrag {
    pub arrow_id: String,
}

/// Everything needed to paint one arrow and its affordances, keyed by the
/// arrow's own id. Pure function of board + selection state.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct ArrowVisual {
    pub id: String,
    pub start: Point,
    pub end: Point,
    pub control: Point,
    pub path: Vec<Point>,
    pub color: String,
    pub stroke_width: f32,
    pub selected: bool,
}

impl ArrowVisual {
    pub(super) fn delete_affordance(&self) -> Point {
        Point::new(self.control.x + DELETE_OFFSET, self.control.y - DELETE_OFFSET)
    }
}

/// Resolves one arrow into its visual. `None` when an endpoint element is
/// currently missing (deletion race); the arrow silently skips this render.
pub(super) fn build_arrow_visual(
    board: &Board,
    arrow: &Arrow,
    selected: Option<&str>,
) -> Option<ArrowVisual> {
    let start = resolve_anchor(board, &arrow.from_element, arrow.from_anchor)?;
    let end = resolve_anchor(board, &arrow.to_element, arrow.to_anchor)?;
    let control = arrow.control_point.unwrap_or_else(|| Point::midpoint(start, end));
    Some(ArrowVisual {
        id: arrow.id.clone(),
        start,
        end,
        control,
        path: committed_path(start, control, end),
        color: arrow.color.clone(),
        stroke_width: arrow.stroke_width,
        selected: selected.is_some_and(|id| id == arrow.id),
    })
}

/// Visuals for every arrow of the board, in element order, each keyed by
/// its stored id; re-running this without mutation yields identical keys.
pub(super) fn build_arrow_visuals(board: &Board, selected: Option<&str>) -> Vec<ArrowVisual> {
    board
        .arrows()
        .filter_map(|arrow| build_arrow_visual(board, arrow, selected))
        .collect()
}

pub(super) fn arrows_touching(board: &Board, element_id: &str) -> Vec<String> {
    board
        .arrows()
        .filter(|a| a.from_element == element_id || a.to_element == element_id)
        .map(|a| a.id.clone())
        .collect()
}

impl BoardApp {
    /// Board-level arrow interaction mode. Turning it off clears selection
    /// and any in-flight gesture; creation/selection are inert while off.
    pub(super) fn toggle_arrow_mode(&mut self) {
        if self.arrow_mode {
            self.arrow_mode = false;
            self.anchors_visible = false;
            self.selected_arrow_id = None;
            self.arrow_draw = None;
            self.control_drag = None;
        } else {
            self.arrow_mode = true;
            self.anchors_visible = true;
        }
    }

    /// Toggle-style selection: re-selecting clears, selecting another swaps.
    pub(super) fn select_arrow(&mut self, id: &str) {
        if !self.arrow_mode {
            return;
        }
        if self.selected_arrow_id.as_deref() == Some(id) {
            self.selected_arrow_id = None;
        } else if self.board.arrow(id).is_some() {
            self.selected_arrow_id = Some(id.to_string());
        }
    }

    pub(super) fn delete_arrow(&mut self, id: &str) {
        if self.board.arrow(id).is_none() {
            return;
        }
        self.board.elements.retain(|e| e.id() != id);
        if self.selected_arrow_id.as_deref() == Some(id) {
            self.selected_arrow_id = None;
        }
        if self.control_drag.as_ref().is_some_and(|d| d.arrow_id == id) {
            self.control_drag = None;
        }
        self.persist_board();
    }

    /// Cascade delete: every arrow referencing the element goes in the same
    /// logical operation; no dangling reference is ever persisted.
    pub(super) fn delete_arrows_for_element(&mut self, element_id: &str) {
        let doomed = arrows_touching(&self.board, element_id);
        if doomed.is_empty() {
            return;
        }
        self.board.elements.retain(|e| {
            e.as_arrow()
                .map(|a| a.from_element != element_id && a.to_element != element_id)
                .unwrap_or(true)
        });
        if let Some(selected) = &self.selected_arrow_id {
            if doomed.contains(selected) {
                self.selected_arrow_id = None;
            }
        }
        if let Some(drag) = &self.control_drag {
            if doomed.contains(&drag.arrow_id) {
                self.control_drag = None;
            }
        }
        log::debug!("cascade deleted {} arrow(s) for element {element_id}", doomed.len());
        self.persist_board();
    }

    /// Re-resolve endpoints of every arrow touching the element after a
    /// move/resize. Stored control points stay untouched, so a large move
    /// reshapes the curve around the old control point.
    pub(super) fn sync_arrows_for_element(&mut self, element_id: &str) -> Vec<String> {
        let affected = arrows_touching(&self.board, element_id);
        for id in &affected {
            if let Some(arrow) = self.board.arrow(id) {
                if resolve_anchor(&self.board, &arrow.from_element, arrow.from_anchor).is_none()
                    || resolve_anchor(&self.board, &arrow.to_element, arrow.to_anchor).is_none()
                {
                    log::debug!("arrow {id} endpoint unresolved during sync; skipping render");
                }
            }
        }
        affected
    }

    /// Intake for the element lifecycle's mutation events.
    pub(super) fn notify_element_event(&mut self, element_id: &str, event: ElementEvent) {
        match event {
            ElementEvent::Moved | ElementEvent::Resized => {
                self.sync_arrows_for_element(element_id);
            }
            ElementEvent::Deleted => self.delete_arrows_for_element(element_id),
            // A duplicate carries a fresh id no arrow references yet.
            ElementEvent::Duplicated => {}
        }
    }

    pub(super) fn begin_arrow_draw(&mut self, element_id: &str, anchor: AnchorPosition) {
        if !self.arrow_mode || self.arrow_draw.is_some() {
            return;
        }
        self.arrow_draw = DrawSession::start(&self.board, element_id, anchor);
    }

    pub(super) fn update_arrow_draw(&mut self, pointer: Point) {
        if let Some(session) = &mut self.arrow_draw {
            session.update_pointer(pointer);
        }
    }

    /// Release of the drawing gesture: a valid anchor on another element
    /// commits, anything else cancels. Both paths drop every preview
    /// artifact and hide the anchor affordances.
    pub(super) fn release_arrow_draw(&mut self, pointer: Point) {
        let Some(session) = self.arrow_draw.take() else {
            return;
        };
        self.anchors_visible = false;
        let target = anchor_at(
            &self.board,
            pointer,
            Some(session.from_element.as_str()),
            ANCHOR_HIT_RADIUS,
        );
        let Some((to_element, to_anchor)) = target else {
            return;
        };
        let id = self.allocate_arrow_id();
        let Some(arrow) = session.commit(
            &self.board,
            &to_element,
            to_anchor,
            self.current_arrow_style,
            id,
        ) else {
            return;
        };
        // Persisted in the same step that makes it visible; a reload never
        // shows fewer arrows than were committed on screen.
        self.board.elements.push(Element::Arrow(arrow));
        self.persist_board();
    }

    /// Explicit cancel (Escape, pointer leaving the surface). A no-op from
    /// idle.
    pub(super) fn cancel_arrow_draw(&mut self) {
        if self.arrow_draw.take().is_some() {
            self.anchors_visible = false;
        }
    }

    pub(super) fn begin_control_drag(&mut self, arrow_id: &str) {
        if self.control_drag.is_some() || self.board.arrow(arrow_id).is_none() {
            return;
        }
        self.control_drag = Some(ControlDrag {
            arrow_id: arrow_id.to_string(),
        });
    }

    /// Live update: the in-memory control point follows the pointer, the
    /// store is not written until release.
    pub(super) fn update_control_drag(&mut self, pointer: Point) {
        let Some(drag) = &self.control_drag else {
            return;
        };
        let arrow_id = drag.arrow_id.clone();
        if let Some(arrow) = self.board.arrow_mut(&arrow_id) {
            arrow.control_point = Some(pointer);
        }
    }

    pub(super) fn finish_control_drag(&mut self) {
        if self.control_drag.take().is_some() {
            self.persist_board();
        }
    }

    /// Topmost arrow whose wide hit band contains `pos`.
    pub(super) fn arrow_hit_at(&self, pos: Point) -> Option<String> {
        for element in self.board.elements.iter().rev() {
            let Some(arrow) = element.as_arrow() else {
                continue;
            };
            let Some(visual) = build_arrow_visual(&self.board, arrow, None) else {
                continue;
            };
            if hit_test(&visual.path, pos, visual.stroke_width) {
                return Some(visual.id);
            }
        }
        None
    }

    /// The selected arrow's control handle, if `pos` grabs it.
    pub(super) fn control_handle_at(&self, pos: Point) -> Option<String> {
        let selected = self.selected_arrow_id.as_deref()?;
        let arrow = self.board.arrow(selected)?;
        let visual = build_arrow_visual(&self.board, arrow, Some(selected))?;
        let dx = pos.x - visual.control.x;
        let dy = pos.y - visual.control.y;
        let r = CONTROL_HANDLE_RADIUS + 4.0;
        (dx * dx + dy * dy <= r * r).then(|| selected.to_string())
    }

    /// The selected arrow's delete affordance, if `pos` hits it.
    pub(super) fn delete_affordance_at(&self, pos: Point) -> Option<String> {
        let selected = self.selected_arrow_id.as_deref()?;
        let arrow = self.board.arrow(selected)?;
        let visual = build_arrow_visual(&self.board, arrow, Some(selected))?;
        let target = visual.delete_affordance();
        let dx = pos.x - target.x;
        let dy = pos.y - target.y;
        (dx * dx + dy * dy <= DELETE_HIT_RADIUS * DELETE_HIT_RADIUS).then(|| selected.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArrowStyle, Element, NoteElement};
    use crate::storage::Store;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn test_app() -> BoardApp {
        let seq = TEST_SEQ.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "moodboard-arrows-test-{}-{}",
            std::process::id(),
            seq
        ));
        let _ = std::fs::remove_dir_all(&dir);
        BoardApp::with_store(Store::open(dir))
    }

    fn note(id: &str, x: f32, y: f32) -> Element {
        Element::Text(NoteElement {
            id: id.to_string(),
            x,
            y,
            w: 100.0,
            h: 50.0,
            content: String::new(),
            color: Default::default(),
        })
    }

    fn app_with_notes() -> BoardApp {
        let mut app = test_app();
        app.board.elements.push(note("A", 0.0, 0.0));
        app.board.elements.push(note("B", 300.0, 0.0));
        app
    }

    fn draw_arrow(app: &mut BoardApp) -> String {
        app.toggle_arrow_mode();
        app.begin_arrow_draw("A", AnchorPosition::Right);
        app.update_arrow_draw(Point::new(301.0, 26.0));
        app.release_arrow_draw(Point::new(301.0, 26.0));
        app.board.arrows().next().unwrap().id.clone()
    }

    #[test]
    fn full_draw_gesture_commits_one_arrow() {
        let mut app = app_with_notes();
        let id = draw_arrow(&mut app);
        assert_eq!(app.board.arrows().count(), 1);
        let arrow = app.board.arrow(&id).unwrap();
        assert_eq!(arrow.from_element, "A");
        assert_eq!(arrow.from_anchor, AnchorPosition::Right);
        assert_eq!(arrow.to_element, "B");
        assert_eq!(arrow.to_anchor, AnchorPosition::Left);
        assert_eq!(arrow.control_point, Some(Point::new(200.0, 25.0)));
        // Commit hides the affordances until the mode is toggled again.
        assert!(!app.anchors_visible);
        assert!(app.arrow_draw.is_none());
        // Committed before rendering: the store already has it.
        let persisted = Store::open(app.store.dir().to_path_buf()).load_board(&app.active_board_id);
        assert_eq!(persisted.arrows().count(), 1);
    }

    #[test]
    fn releasing_over_empty_canvas_commits_nothing() {
        let mut app = app_with_notes();
        app.toggle_arrow_mode();
        app.begin_arrow_draw("A", AnchorPosition::Right);
        app.release_arrow_draw(Point::new(500.0, 500.0));
        assert_eq!(app.board.arrows().count(), 0);
        assert!(app.arrow_draw.is_none());
        assert!(!app.anchors_visible);
    }

    #[test]
    fn releasing_over_the_source_commits_nothing() {
        let mut app = app_with_notes();
        app.toggle_arrow_mode();
        app.begin_arrow_draw("A", AnchorPosition::Right);
        // The source element's own left anchor.
        app.release_arrow_draw(Point::new(0.0, 25.0));
        assert_eq!(app.board.arrows().count(), 0);
    }

    #[test]
    fn draw_is_inert_outside_arrow_mode_and_cancel_is_idempotent() {
        let mut app = app_with_notes();
        app.begin_arrow_draw("A", AnchorPosition::Right);
        assert!(app.arrow_draw.is_none());
        app.cancel_arrow_draw();
        app.release_arrow_draw(Point::new(301.0, 26.0));
        assert_eq!(app.board.arrows().count(), 0);
    }

    #[test]
    fn cascade_delete_removes_exactly_the_referencing_arrows() {
        let mut app = app_with_notes();
        app.board.elements.push(note("C", 0.0, 300.0));
        let ab = draw_arrow(&mut app);
        app.toggle_arrow_mode();
        app.toggle_arrow_mode();
        app.begin_arrow_draw("C", AnchorPosition::Top);
        app.release_arrow_draw(Point::new(301.0, 26.0));
        assert_eq!(app.board.arrows().count(), 2);

        app.board.elements.retain(|e| e.id() != "B");
        app.notify_element_event("B", ElementEvent::Deleted);
        assert_eq!(app.board.arrows().count(), 0);
        assert!(app.board.arrow(&ab).is_none());
        let persisted = Store::open(app.store.dir().to_path_buf()).load_board(&app.active_board_id);
        assert_eq!(persisted.arrows().count(), 0);
    }

    #[test]
    fn rendering_twice_without_mutation_keeps_identical_ids() {
        let mut app = app_with_notes();
        draw_arrow(&mut app);
        let first: Vec<String> = build_arrow_visuals(&app.board, None)
            .into_iter()
            .map(|v| v.id)
            .collect();
        let second: Vec<String> = build_arrow_visuals(&app.board, None)
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn visual_skips_silently_when_an_endpoint_is_missing() {
        let mut app = app_with_notes();
        draw_arrow(&mut app);
        app.board.elements.retain(|e| e.id() != "B");
        // The record still exists (only cascade delete removes it)...
        assert_eq!(app.board.arrows().count(), 1);
        // ...but nothing renders for it.
        assert_eq!(build_arrow_visuals(&app.board, None).len(), 0);
    }

    #[test]
    fn selection_is_exclusive_and_toggles_off() {
        let mut app = app_with_notes();
        app.board.elements.push(note("C", 0.0, 300.0));
        let first = draw_arrow(&mut app);
        app.toggle_arrow_mode();
        app.toggle_arrow_mode();
        app.begin_arrow_draw("C", AnchorPosition::Top);
        app.release_arrow_draw(Point::new(301.0, 26.0));
        let second = app
            .board
            .arrows()
            .map(|a| a.id.clone())
            .find(|id| *id != first)
            .unwrap();

        app.select_arrow(&first);
        assert_eq!(app.selected_arrow_id.as_deref(), Some(first.as_str()));
        app.select_arrow(&second);
        assert_eq!(app.selected_arrow_id.as_deref(), Some(second.as_str()));
        let visuals = build_arrow_visuals(&app.board, app.selected_arrow_id.as_deref());
        assert_eq!(
            visuals.iter().filter(|v| v.selected).map(|v| v.id.clone()).collect::<Vec<_>>(),
            vec![second.clone()]
        );
        app.select_arrow(&second);
        assert_eq!(app.selected_arrow_id, None);
    }

    #[test]
    fn selection_is_ignored_outside_arrow_mode_and_cleared_on_mode_off() {
        let mut app = app_with_notes();
        let id = draw_arrow(&mut app);
        app.toggle_arrow_mode();
        assert!(!app.arrow_mode);
        app.select_arrow(&id);
        assert_eq!(app.selected_arrow_id, None);

        app.toggle_arrow_mode();
        app.select_arrow(&id);
        assert_eq!(app.selected_arrow_id.as_deref(), Some(id.as_str()));
        app.toggle_arrow_mode();
        assert_eq!(app.selected_arrow_id, None);
    }

    #[test]
    fn control_drag_persists_only_on_release() {
        let mut app = app_with_notes();
        let id = draw_arrow(&mut app);
        let store_dir = app.store.dir().to_path_buf();

        app.begin_control_drag(&id);
        app.update_control_drag(Point::new(250.0, 80.0));
        assert_eq!(
            app.board.arrow(&id).unwrap().control_point,
            Some(Point::new(250.0, 80.0))
        );
        let persisted = Store::open(store_dir.clone()).load_board(&app.active_board_id);
        assert_eq!(
            persisted.arrow(&id).unwrap().control_point,
            Some(Point::new(200.0, 25.0))
        );

        app.finish_control_drag();
        let persisted = Store::open(store_dir).load_board(&app.active_board_id);
        assert_eq!(
            persisted.arrow(&id).unwrap().control_point,
            Some(Point::new(250.0, 80.0))
        );
        // The committed path now bends through the released point.
        let visual = build_arrow_visual(&app.board, app.board.arrow(&id).unwrap(), None).unwrap();
        assert_eq!(visual.control, Point::new(250.0, 80.0));
    }

    #[test]
    fn sync_reports_touching_arrows_and_leaves_control_points_alone() {
        let mut app = app_with_notes();
        let id = draw_arrow(&mut app);
        if let Some(element) = app.board.element_mut("B") {
            element.set_position(400.0, 200.0);
        }
        let affected = app.sync_arrows_for_element("B");
        assert_eq!(affected, vec![id.clone()]);
        assert_eq!(app.sync_arrows_for_element("A"), vec![id.clone()]);
        assert_eq!(app.sync_arrows_for_element("unrelated"), Vec::<String>::new());

        // Endpoints re-resolve, the stored control point does not move.
        let arrow = app.board.arrow(&id).unwrap();
        assert_eq!(arrow.control_point, Some(Point::new(200.0, 25.0)));
        let visual = build_arrow_visual(&app.board, arrow, None).unwrap();
        assert_eq!(visual.end, Point::new(400.0, 225.0));
        assert_eq!(visual.control, Point::new(200.0, 25.0));
    }

    #[test]
    fn arrow_hit_uses_the_wide_band_and_affordances_require_selection() {
        let mut app = app_with_notes();
        let id = draw_arrow(&mut app);
        // Straight-line arrow from (100,25) to (300,25): the band catches a
        // nearby point, the visible stroke alone would not.
        assert_eq!(app.arrow_hit_at(Point::new(200.0, 30.0)), Some(id.clone()));
        assert_eq!(app.arrow_hit_at(Point::new(200.0, 60.0)), None);

        assert_eq!(app.control_handle_at(Point::new(200.0, 25.0)), None);
        // Arrow mode is still on from the draw gesture.
        app.select_arrow(&id);
        assert_eq!(app.control_handle_at(Point::new(200.0, 25.0)), Some(id.clone()));
        assert_eq!(
            app.delete_affordance_at(Point::new(225.0, 0.0)),
            Some(id.clone())
        );
    }

    #[test]
    fn delete_arrow_clears_selection_and_store() {
        let mut app = app_with_notes();
        let id = draw_arrow(&mut app);
        app.toggle_arrow_mode();
        app.toggle_arrow_mode();
        app.select_arrow(&id);
        app.delete_arrow(&id);
        assert_eq!(app.board.arrows().count(), 0);
        assert_eq!(app.selected_arrow_id, None);
        app.delete_arrow(&id); // second delete is a no-op
        let persisted = Store::open(app.store.dir().to_path_buf()).load_board(&app.active_board_id);
        assert_eq!(persisted.arrows().count(), 0);
    }

    #[test]
    fn committed_arrows_render_quadratic_regardless_of_style() {
        let mut app = app_with_notes();
        app.current_arrow_style = ArrowStyle::Orthogonal;
        let id = draw_arrow(&mut app);
        let arrow = app.board.arrow(&id).unwrap();
        assert_eq!(arrow.style, ArrowStyle::Orthogonal);
        let visual = build_arrow_visual(&app.board, arrow, None).unwrap();
        // A quadratic through the midpoint control of a horizontal pair is
        // the flat segment sampled along the curve, not an elbow.
        assert!(visual.path.iter().all(|p| (p.y - 25.0).abs() < 0.001));
        assert!(visual.path.len() > 4);
    }
}
