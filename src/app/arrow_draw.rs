use crate::model::{
    ACCENT_COLOR, AnchorPosition, Arrow, ArrowStyle, Board, DEFAULT_STROKE_WIDTH, Point,
};

use super::anchor::resolve_anchor;
use super::arrow_path::preview_path;

/// One in-flight arrow drawing gesture. Created on a valid anchor press,
/// destroyed on commit or cancel; nothing here is ever persisted.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct DrawSession {
    pub from_element: String,
    pub from_anchor: AnchorPosition,
    pub pointer: Point,
}

impl DrawSession {
    /// `Idle -> Drawing`; refuses to start on an element that cannot anchor.
    pub(super) fn start(
        board: &Board,
        from_element: &str,
        from_anchor: AnchorPosition,
    ) -> Option<DrawSession> {
        let pointer = resolve_anchor(board, from_element, from_anchor)?;
        Some(DrawSession {
            from_element: from_element.to_string(),
            from_anchor,
            pointer,
        })
    }

    /// `Drawing -> Drawing`: each pointer move replaces the preview endpoint.
    pub(super) fn update_pointer(&mut self, pointer: Point) {
        self.pointer = pointer;
    }

    /// Live preview polyline in the current global style; `None` once the
    /// source element has vanished mid-gesture.
    pub(super) fn preview(&self, board: &Board, style: ArrowStyle) -> Option<Vec<Point>> {
        let start = resolve_anchor(board, &self.from_element, self.from_anchor)?;
        Some(preview_path(start, self.pointer, style))
    }

    /// `Drawing -> Committed`: builds the arrow record, or `None` when the
    /// release is invalid (missing target, missing source, or a self-loop;
    /// all treated exactly like a cancel).
    pub(super) fn commit(
        &self,
        board: &Board,
        to_element: &str,
        to_anchor: AnchorPosition,
        style: ArrowStyle,
        id: String,
    ) -> Option<Arrow> {
        if to_element == self.from_element {
            return None;
        }
        let start = resolve_anchor(board, &self.from_element, self.from_anchor)?;
        let end = resolve_anchor(board, to_element, to_anchor)?;
        Some(Arrow {
            id,
            from_element: self.from_element.clone(),
            from_anchor: self.from_anchor,
            to_element: to_element.to_string(),
            to_anchor,
            style,
            control_point: Some(Point::midpoint(start, end)),
            color: ACCENT_COLOR.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
        })
    }
}
