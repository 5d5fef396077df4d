use eframe::egui;

use crate::model::{ACCENT_COLOR, Board, Element};

use super::anchor::element_center;
use super::arrows::build_arrow_visuals;

const PADDING: f32 = 50.0;

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn color_attr(color: egui::Color32) -> String {
    format!("rgb({},{},{})", color.r(), color.g(), color.b())
}

fn content_bounds(board: &Board) -> Option<egui::Rect> {
    let mut rect: Option<egui::Rect> = None;
    let mut include = |r: egui::Rect| {
        rect = Some(match rect {
            Some(acc) => acc.union(r),
            None => r,
        });
    };
    for element in &board.elements {
        if let Some(bounds) = element.bounds() {
            include(bounds.rect());
        }
    }
    for visual in build_arrow_visuals(board, None) {
        for p in &visual.path {
            include(egui::Rect::from_min_max(p.to_pos2(), p.to_pos2()));
        }
    }
    rect
}

/// Renders the board as a standalone SVG document. Arrows come out as the
/// same quadratic paths the canvas draws, marker-terminated.
pub(super) fn board_to_svg(board: &Board) -> String {
    let bounds = content_bounds(board)
        .unwrap_or_else(|| egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(400.0, 300.0)));
    let min = bounds.min - egui::vec2(PADDING, PADDING);
    let size = bounds.size() + egui::vec2(PADDING * 2.0, PADDING * 2.0);

    let mut out = String::new();
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.1} {:.1} {:.1} {:.1}" width="{:.0}" height="{:.0}">"#,
        min.x, min.y, size.x, size.y, size.x, size.y
    ));
    out.push('\n');
    out.push_str(&format!(
        concat!(
            r#"<defs><marker id="arrowhead" markerWidth="10" markerHeight="10" "#,
            r#"refX="9" refY="3" orient="auto" markerUnits="strokeWidth">"#,
            r#"<path d="M0,0 L0,6 L9,3 z" fill="{}"/></marker></defs>"#,
        ),
        ACCENT_COLOR
    ));
    out.push('\n');

    for element in &board.elements {
        match element {
            Element::Text(note) => {
                out.push_str(&format!(
                    r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" rx="6" fill="{}" stroke="{}"/>"#,
                    note.x,
                    note.y,
                    note.w,
                    note.h,
                    color_attr(note.color.background()),
                    color_attr(note.color.text()),
                ));
                out.push('\n');
                let line_height = 18.0;
                for (i, line) in note.content.lines().take(16).enumerate() {
                    out.push_str(&format!(
                        r#"<text x="{:.1}" y="{:.1}" font-size="14" fill="{}">{}</text>"#,
                        note.x + 8.0,
                        note.y + 20.0 + i as f32 * line_height,
                        color_attr(note.color.text()),
                        escape_xml(line),
                    ));
                    out.push('\n');
                }
            }
            Element::Image(img) => {
                // Stored image files are not embedded; a labeled frame
                // stands in.
                out.push_str(&format!(
                    r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="rgb(80,80,80)" stroke="rgb(140,140,140)"/>"#,
                    img.x, img.y, img.w, img.h,
                ));
                out.push('\n');
                let center = element.bounds().map(element_center).unwrap_or_default();
                out.push_str(&format!(
                    r#"<text x="{:.1}" y="{:.1}" font-size="12" fill="rgb(220,220,220)">{}</text>"#,
                    img.x + 8.0,
                    center.y,
                    escape_xml(&img.content),
                ));
                out.push('\n');
            }
            Element::Arrow(_) => {}
        }
    }

    for visual in build_arrow_visuals(board, None) {
        let d = super::arrow_path::quad_d(visual.start, visual.control, visual.end);
        out.push_str(&format!(
            r#"<path d="{}" stroke="{}" stroke-width="{}" fill="none" marker-end="url(#arrowhead)"/>"#,
            d, visual.color, visual.stroke_width,
        ));
        out.push('\n');
    }

    out.push_str("</svg>\n");
    out
}
