use crate::model::{AnchorPosition, Board, Bounds, Point};

/// Hit radius around an anchor affordance.
pub(super) const ANCHOR_HIT_RADIUS: f32 = 8.0;

/// Anchor coordinate on a bounding box, in the same (canvas) space as the
/// box itself. Pure over the supplied geometry snapshot.
pub(super) fn anchor_point(bounds: Bounds, position: AnchorPosition) -> Point {
    match position {
        AnchorPosition::Top => Point::new(bounds.x + bounds.w / 2.0, bounds.y),
        AnchorPosition::Right => Point::new(bounds.x + bounds.w, bounds.y + bounds.h / 2.0),
        AnchorPosition::Bottom => Point::new(bounds.x + bounds.w / 2.0, bounds.y + bounds.h),
        AnchorPosition::Left => Point::new(bounds.x, bounds.y + bounds.h / 2.0),
    }
}

/// Defensive default for callers that cannot name a concrete anchor.
pub(super) fn element_center(bounds: Bounds) -> Point {
    bounds.center()
}

/// Resolves an anchor against the live board; `None` when the element is
/// gone or has no bounding geometry (deletion race; callers skip).
pub(super) fn resolve_anchor(
    board: &Board,
    element_id: &str,
    position: AnchorPosition,
) -> Option<Point> {
    board
        .element_bounds(element_id)
        .map(|bounds| anchor_point(bounds, position))
}

/// Topmost anchor affordance under `pos`, skipping `exclude` (the draw
/// gesture's source element keeps its anchors inert).
pub(super) fn anchor_at(
    board: &Board,
    pos: Point,
    exclude: Option<&str>,
    radius: f32,
) -> Option<(String, AnchorPosition)> {
    for element in board.elements.iter().rev() {
        if exclude.is_some_and(|id| id == element.id()) {
            continue;
        }
        let Some(bounds) = element.bounds() else {
            continue;
        };
        for position in AnchorPosition::ALL {
            let a = anchor_point(bounds, position);
            let dx = pos.x - a.x;
            let dy = pos.y - a.y;
            if dx * dx + dy * dy <= radius * radius {
                return Some((element.id().to_string(), position));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, NoteElement};
    use pretty_assertions::assert_eq;

    fn bounds() -> Bounds {
        Bounds {
            x: 40.0,
            y: 60.0,
            w: 100.0,
            h: 50.0,
        }
    }

    #[test]
    fn anchor_points_sit_on_edge_midpoints() {
        let b = bounds();
        assert_eq!(anchor_point(b, AnchorPosition::Top), Point::new(90.0, 60.0));
        assert_eq!(anchor_point(b, AnchorPosition::Right), Point::new(140.0, 85.0));
        assert_eq!(anchor_point(b, AnchorPosition::Bottom), Point::new(90.0, 110.0));
        assert_eq!(anchor_point(b, AnchorPosition::Left), Point::new(40.0, 85.0));
        assert_eq!(element_center(b), Point::new(90.0, 85.0));
    }

    fn board_with_note(id: &str, x: f32, y: f32, w: f32, h: f32) -> Board {
        let mut board = Board::default();
        board.elements.push(Element::Text(NoteElement {
            id: id.to_string(),
            x,
            y,
            w,
            h,
            content: String::new(),
            color: Default::default(),
        }));
        board
    }

    #[test]
    fn resolve_anchor_skips_missing_elements() {
        let board = board_with_note("a", 0.0, 0.0, 100.0, 50.0);
        assert_eq!(
            resolve_anchor(&board, "a", AnchorPosition::Right),
            Some(Point::new(100.0, 25.0))
        );
        assert_eq!(resolve_anchor(&board, "gone", AnchorPosition::Right), None);
    }

    #[test]
    fn anchor_at_finds_nearby_anchor_and_honors_exclusion() {
        let mut board = board_with_note("a", 0.0, 0.0, 100.0, 50.0);
        board.elements.push(Element::Text(NoteElement {
            id: "b".to_string(),
            x: 300.0,
            y: 0.0,
            w: 100.0,
            h: 50.0,
            content: String::new(),
            color: Default::default(),
        }));

        let hit = anchor_at(&board, Point::new(301.0, 26.0), None, ANCHOR_HIT_RADIUS);
        assert_eq!(hit, Some(("b".to_string(), AnchorPosition::Left)));

        let excluded = anchor_at(
            &board,
            Point::new(99.0, 25.0),
            Some("a"),
            ANCHOR_HIT_RADIUS,
        );
        assert_eq!(excluded, None);

        let miss = anchor_at(&board, Point::new(500.0, 500.0), None, ANCHOR_HIT_RADIUS);
        assert_eq!(miss, None);
    }
}
