use eframe::egui;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_pos2(p: egui::Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }

    pub fn midpoint(a: Point, b: Point) -> Point {
        Point {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        }
    }
}

/// The four fixed attachment points on a placed element's bounding box.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPosition {
    Top,
    Right,
    Bottom,
    Left,
}

impl AnchorPosition {
    pub const ALL: [AnchorPosition; 4] = [
        AnchorPosition::Top,
        AnchorPosition::Right,
        AnchorPosition::Bottom,
        AnchorPosition::Left,
    ];
}

/// Shape of the transient preview while drawing. Committed arrows always
/// render as a quadratic curve through their control point.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArrowStyle {
    #[default]
    Straight,
    Curved,
    Orthogonal,
}

pub const ACCENT_COLOR: &str = "#750cff";
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

fn default_arrow_color() -> String {
    ACCENT_COLOR.to_string()
}

fn default_stroke_width() -> f32 {
    DEFAULT_STROKE_WIDTH
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Arrow {
    pub id: String,
    pub from_element: String,
    pub from_anchor: AnchorPosition,
    pub to_element: String,
    pub to_anchor: AnchorPosition,
    #[serde(default)]
    pub style: ArrowStyle,
    #[serde(default)]
    pub control_point: Option<Point>,
    #[serde(default = "default_arrow_color")]
    pub color: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    #[default]
    Default,
    Yellow,
    Purple,
    Blue,
    Green,
    Pink,
    Orange,
}

impl NoteColor {
    pub const ALL: [NoteColor; 7] = [
        NoteColor::Default,
        NoteColor::Yellow,
        NoteColor::Purple,
        NoteColor::Blue,
        NoteColor::Green,
        NoteColor::Pink,
        NoteColor::Orange,
    ];

    pub fn background(self) -> egui::Color32 {
        match self {
            NoteColor::Default => egui::Color32::from_rgb(0x1e, 0x1e, 0x1e),
            NoteColor::Yellow => egui::Color32::from_rgb(0xfe, 0xf3, 0xc7),
            NoteColor::Purple => egui::Color32::from_rgb(0xe9, 0xd5, 0xff),
            NoteColor::Blue => egui::Color32::from_rgb(0xdb, 0xea, 0xfe),
            NoteColor::Green => egui::Color32::from_rgb(0xd1, 0xfa, 0xe5),
            NoteColor::Pink => egui::Color32::from_rgb(0xfc, 0xe7, 0xf3),
            NoteColor::Orange => egui::Color32::from_rgb(0xfe, 0xd7, 0xaa),
        }
    }

    pub fn text(self) -> egui::Color32 {
        match self {
            NoteColor::Default => egui::Color32::from_rgb(0xe0, 0xe0, 0xe0),
            NoteColor::Yellow => egui::Color32::from_rgb(0x78, 0x35, 0x0f),
            NoteColor::Purple => egui::Color32::from_rgb(0x58, 0x1c, 0x87),
            NoteColor::Blue => egui::Color32::from_rgb(0x1e, 0x3a, 0x8a),
            NoteColor::Green => egui::Color32::from_rgb(0x06, 0x5f, 0x46),
            NoteColor::Pink => egui::Color32::from_rgb(0x83, 0x18, 0x43),
            NoteColor::Orange => egui::Color32::from_rgb(0x7c, 0x2d, 0x12),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NoteColor::Default => "Default",
            NoteColor::Yellow => "Yellow",
            NoteColor::Purple => "Purple",
            NoteColor::Blue => "Blue",
            NoteColor::Green => "Green",
            NoteColor::Pink => "Pink",
            NoteColor::Orange => "Orange",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NoteElement {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: NoteColor,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageElement {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// File name under the store's images directory.
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Element {
    #[serde(rename = "text")]
    Text(NoteElement),
    #[serde(rename = "img")]
    Image(ImageElement),
    #[serde(rename = "arrow")]
    Arrow(Arrow),
}

/// Axis-aligned geometry of a placed (non-arrow) element in canvas space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub fn rect(self) -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(self.x, self.y), egui::vec2(self.w, self.h))
    }

    pub fn center(self) -> Point {
        Point {
            x: self.x + self.w / 2.0,
            y: self.y + self.h / 2.0,
        }
    }
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::Text(note) => &note.id,
            Element::Image(img) => &img.id,
            Element::Arrow(arrow) => &arrow.id,
        }
    }

    /// Bounding geometry of a placed element; arrows have none of their own.
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Element::Text(note) => Some(Bounds {
                x: note.x,
                y: note.y,
                w: note.w,
                h: note.h,
            }),
            Element::Image(img) => Some(Bounds {
                x: img.x,
                y: img.y,
                w: img.w,
                h: img.h,
            }),
            Element::Arrow(_) => None,
        }
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self, Element::Arrow(_))
    }

    pub fn as_arrow(&self) -> Option<&Arrow> {
        match self {
            Element::Arrow(arrow) => Some(arrow),
            _ => None,
        }
    }

    pub fn as_arrow_mut(&mut self) -> Option<&mut Arrow> {
        match self {
            Element::Arrow(arrow) => Some(arrow),
            _ => None,
        }
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        match self {
            Element::Text(note) => {
                note.x = x;
                note.y = y;
            }
            Element::Image(img) => {
                img.x = x;
                img.y = y;
            }
            Element::Arrow(_) => {}
        }
    }

    pub fn set_size(&mut self, w: f32, h: f32) {
        match self {
            Element::Text(note) => {
                note.w = w;
                note.h = h;
            }
            Element::Image(img) => {
                img.w = w;
                img.h = h;
            }
            Element::Arrow(_) => {}
        }
    }
}

fn default_board_title() -> String {
    "Untitled".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Board {
    #[serde(default = "default_board_title")]
    pub title: String,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            title: default_board_title(),
            elements: Vec::new(),
        }
    }
}

impl Board {
    /// Lookup against the owned model, never against render state.
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    pub fn element_bounds(&self, id: &str) -> Option<Bounds> {
        self.element(id).and_then(|e| e.bounds())
    }

    pub fn arrow(&self, id: &str) -> Option<&Arrow> {
        self.element(id).and_then(|e| e.as_arrow())
    }

    pub fn arrow_mut(&mut self, id: &str) -> Option<&mut Arrow> {
        self.element_mut(id).and_then(|e| e.as_arrow_mut())
    }

    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> {
        self.elements.iter().filter_map(|e| e.as_arrow())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.element(id).is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoardMeta {
    pub id: String,
    pub title: String,
}

pub fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let ab_len2 = ab.x * ab.x + ab.y * ab.y;
    if ab_len2 <= f32::EPSILON {
        return (p - a).length();
    }
    let t = (ap.x * ab.x + ap.y * ab.y) / ab_len2;
    let t = t.clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_arrow() -> Arrow {
        Arrow {
            id: "arrow-1700000000000".to_string(),
            from_element: "1699999990000".to_string(),
            from_anchor: AnchorPosition::Right,
            to_element: "1699999991000".to_string(),
            to_anchor: AnchorPosition::Left,
            style: ArrowStyle::Curved,
            control_point: Some(Point::new(200.0, 25.0)),
            color: ACCENT_COLOR.to_string(),
            stroke_width: 2.0,
        }
    }

    #[test]
    fn arrow_record_round_trips_with_wire_field_names() {
        let arrow = sample_arrow();
        let json = serde_json::to_value(Element::Arrow(arrow.clone())).unwrap();
        assert_eq!(json["type"], "arrow");
        assert_eq!(json["fromElement"], "1699999990000");
        assert_eq!(json["fromAnchor"], "right");
        assert_eq!(json["toElement"], "1699999991000");
        assert_eq!(json["toAnchor"], "left");
        assert_eq!(json["style"], "curved");
        assert_eq!(json["controlPoint"]["x"], 200.0);
        assert_eq!(json["strokeWidth"], 2.0);

        let back: Element = serde_json::from_value(json).unwrap();
        assert_eq!(back, Element::Arrow(arrow));
    }

    #[test]
    fn elements_parse_from_stored_records() {
        let json = r##"{
            "title": "Main Board",
            "elements": [
                {"type": "text", "id": "100", "x": 10.0, "y": 20.0, "w": 180.0, "h": 100.0,
                 "content": "New Idea...", "color": "yellow"},
                {"type": "img", "id": "101", "x": 50.0, "y": 50.0, "w": 250.0, "h": 180.0,
                 "content": "paste-101.png"},
                {"type": "arrow", "id": "arrow-102", "fromElement": "100", "fromAnchor": "bottom",
                 "toElement": "101", "toAnchor": "top", "style": "straight",
                 "controlPoint": {"x": 150.0, "y": 135.0}, "color": "#750cff", "strokeWidth": 2}
            ]
        }"##;
        let board: Board = serde_json::from_str(json).unwrap();
        assert_eq!(board.elements.len(), 3);
        assert_eq!(board.element("100").unwrap().bounds().unwrap().w, 180.0);
        assert!(board.element("arrow-102").unwrap().is_arrow());
        let arrow = board.arrow("arrow-102").unwrap();
        assert_eq!(arrow.from_anchor, AnchorPosition::Bottom);
        assert_eq!(arrow.control_point, Some(Point::new(150.0, 135.0)));
    }

    #[test]
    fn arrow_defaults_backfill_missing_fields() {
        let json = r#"{"type": "arrow", "id": "arrow-1", "fromElement": "a",
                       "fromAnchor": "top", "toElement": "b", "toAnchor": "left"}"#;
        let element: Element = serde_json::from_str(json).unwrap();
        let arrow = element.as_arrow().unwrap();
        assert_eq!(arrow.style, ArrowStyle::Straight);
        assert_eq!(arrow.control_point, None);
        assert_eq!(arrow.color, ACCENT_COLOR);
        assert_eq!(arrow.stroke_width, DEFAULT_STROKE_WIDTH);
    }

    #[test]
    fn bounds_center() {
        let bounds = Bounds {
            x: 0.0,
            y: 0.0,
            w: 100.0,
            h: 50.0,
        };
        assert_eq!(bounds.center(), Point::new(50.0, 25.0));
    }
}
