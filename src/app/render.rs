use eframe::egui;

use crate::model::{ACCENT_COLOR, Element, Point};

use super::BoardApp;
use super::ElementGesture;
use super::anchor::anchor_point;
use super::arrow_path::end_direction;
use super::arrows::{CONTROL_HANDLE_RADIUS, DELETE_HIT_RADIUS, build_arrow_visuals};
use super::elements::RESIZE_HANDLE_SIZE;

const GRID_STEP: f32 = 64.0;

pub(super) fn color_from_hex(hex: &str) -> Option<egui::Color32> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(egui::Color32::from_rgb(r, g, b))
}

pub(super) fn accent_color() -> egui::Color32 {
    color_from_hex(ACCENT_COLOR).unwrap_or(egui::Color32::from_rgb(0x75, 0x0c, 0xff))
}

fn draw_arrowhead(painter: &egui::Painter, a: egui::Pos2, b: egui::Pos2, color: egui::Color32) {
    let v = b - a;
    if v.length_sq() <= f32::EPSILON {
        return;
    }
    let dir = v.normalized();
    let size = 10.0;
    let perp = egui::vec2(-dir.y, dir.x);
    let tip = b;
    let base = b - dir * size;
    let left = base + perp * (size * 0.6);
    let right = base - perp * (size * 0.6);
    painter.add(egui::Shape::convex_polygon(
        vec![tip, left, right],
        color,
        egui::Stroke::NONE,
    ));
}

impl BoardApp {
    fn texture_for(&mut self, ctx: &egui::Context, name: &str) -> Option<egui::TextureId> {
        if name.is_empty() || self.missing_images.contains(name) {
            return None;
        }
        if let Some(handle) = self.textures.get(name) {
            return Some(handle.id());
        }
        let path = self.store.image_path(name);
        match image::open(&path) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                let handle =
                    ctx.load_texture(name.to_string(), color_image, egui::TextureOptions::LINEAR);
                let id = handle.id();
                self.textures.insert(name.to_string(), handle);
                Some(id)
            }
            Err(e) => {
                log::warn!("loading image {} failed: {e}", path.display());
                self.missing_images.insert(name.to_string());
                None
            }
        }
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: egui::Rect) {
        let line = egui::Stroke::new(
            0.5,
            if self.theme == "light" {
                egui::Color32::from_gray(220)
            } else {
                egui::Color32::from_gray(45)
            },
        );
        let offset_x = (-self.view.scroll.x).rem_euclid(GRID_STEP);
        let offset_y = (-self.view.scroll.y).rem_euclid(GRID_STEP);
        let mut x = rect.min.x + offset_x;
        while x < rect.max.x {
            painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], line);
            x += GRID_STEP;
        }
        let mut y = rect.min.y + offset_y;
        while y < rect.max.y {
            painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], line);
            y += GRID_STEP;
        }
    }

    fn draw_placed_elements(&mut self, ui: &mut egui::Ui, origin: egui::Pos2) {
        let painter = ui.painter().clone();
        let accent = accent_color();
        let elements = self.board.elements.clone();
        for element in &elements {
            let Some(bounds) = element.bounds() else {
                continue;
            };
            let min = self.view.canvas_to_screen(origin, Point::new(bounds.x, bounds.y));
            let rect = egui::Rect::from_min_size(min, egui::vec2(bounds.w, bounds.h));
            let selected = self.selected_ids.iter().any(|id| id == element.id());

            match element {
                Element::Text(note) => {
                    painter.rect_filled(rect, 6.0, note.color.background());
                    painter.rect_stroke(
                        rect,
                        6.0,
                        egui::Stroke::new(1.0, note.color.text().gamma_multiply(0.4)),
                        egui::StrokeKind::Inside,
                    );
                    if self.editing_text_id.as_deref() == Some(note.id.as_str()) {
                        let mut text = note.content.clone();
                        let response = ui.put(
                            rect.shrink(8.0),
                            egui::TextEdit::multiline(&mut text)
                                .frame(false)
                                .text_color(note.color.text()),
                        );
                        if response.changed() {
                            let id = note.id.clone();
                            if let Some(Element::Text(live)) = self.board.element_mut(&id) {
                                live.content = text.clone();
                            }
                            self.note_content_edited(&id, &text);
                        }
                    } else {
                        let galley = painter.layout(
                            note.content.clone(),
                            egui::FontId::proportional(14.0),
                            note.color.text(),
                            (bounds.w - 16.0).max(8.0),
                        );
                        painter.galley(rect.min + egui::vec2(8.0, 8.0), galley, note.color.text());
                    }
                }
                Element::Image(img) => {
                    match self.texture_for(ui.ctx(), &img.content) {
                        Some(texture) => {
                            painter.image(
                                texture,
                                rect,
                                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                                egui::Color32::WHITE,
                            );
                        }
                        None => {
                            painter.rect_filled(rect, 2.0, egui::Color32::from_gray(70));
                            painter.text(
                                rect.center(),
                                egui::Align2::CENTER_CENTER,
                                &img.content,
                                egui::FontId::proportional(12.0),
                                egui::Color32::from_gray(200),
                            );
                        }
                    }
                }
                Element::Arrow(_) => {}
            }

            if selected {
                painter.rect_stroke(
                    rect.expand(2.0),
                    6.0,
                    egui::Stroke::new(2.0, accent),
                    egui::StrokeKind::Outside,
                );
                let handle = egui::Rect::from_center_size(
                    rect.max,
                    egui::vec2(RESIZE_HANDLE_SIZE - 2.0, RESIZE_HANDLE_SIZE - 2.0),
                );
                painter.rect_filled(handle, 2.0, accent);
            }
        }
    }

    fn draw_arrows(&self, painter: &egui::Painter, origin: egui::Pos2) {
        let accent = accent_color();
        for visual in build_arrow_visuals(&self.board, self.selected_arrow_id.as_deref()) {
            let color = color_from_hex(&visual.color).unwrap_or(accent);
            let points: Vec<egui::Pos2> = visual
                .path
                .iter()
                .map(|p| self.view.canvas_to_screen(origin, *p))
                .collect();
            if visual.selected {
                painter.add(egui::Shape::line(
                    points.clone(),
                    egui::Stroke::new(visual.stroke_width + 4.0, color.gamma_multiply(0.3)),
                ));
            }
            painter.add(egui::Shape::line(
                points,
                egui::Stroke::new(visual.stroke_width, color),
            ));
            if let Some((from, to)) = end_direction(&visual.path) {
                draw_arrowhead(
                    painter,
                    self.view.canvas_to_screen(origin, from),
                    self.view.canvas_to_screen(origin, to),
                    color,
                );
            }

            if visual.selected {
                let control = self.view.canvas_to_screen(origin, visual.control);
                painter.circle_filled(control, CONTROL_HANDLE_RADIUS, egui::Color32::WHITE);
                painter.circle_stroke(
                    control,
                    CONTROL_HANDLE_RADIUS,
                    egui::Stroke::new(1.5, accent),
                );
                let delete = self.view.canvas_to_screen(origin, visual.delete_affordance());
                painter.circle_filled(
                    delete,
                    DELETE_HIT_RADIUS,
                    egui::Color32::from_rgb(0xd9, 0x3d, 0x3d),
                );
                painter.text(
                    delete,
                    egui::Align2::CENTER_CENTER,
                    "×",
                    egui::FontId::proportional(14.0),
                    egui::Color32::WHITE,
                );
            }
        }
    }

    fn draw_anchor_affordances(&self, painter: &egui::Painter, origin: egui::Pos2) {
        if !self.anchors_visible {
            return;
        }
        let accent = accent_color();
        let exclude = self.arrow_draw.as_ref().map(|s| s.from_element.as_str());
        for element in &self.board.elements {
            if exclude.is_some_and(|id| id == element.id()) {
                continue;
            }
            let Some(bounds) = element.bounds() else {
                continue;
            };
            for position in crate::model::AnchorPosition::ALL {
                let p = self
                    .view
                    .canvas_to_screen(origin, anchor_point(bounds, position));
                painter.circle_filled(p, 4.0, accent);
                painter.circle_stroke(p, 4.0, egui::Stroke::new(1.0, egui::Color32::WHITE));
            }
        }
    }

    fn draw_arrow_preview(&self, painter: &egui::Painter, origin: egui::Pos2) {
        let Some(session) = &self.arrow_draw else {
            return;
        };
        let Some(path) = session.preview(&self.board, self.current_arrow_style) else {
            return;
        };
        let color = accent_color().gamma_multiply(0.7);
        let points: Vec<egui::Pos2> = path
            .iter()
            .map(|p| self.view.canvas_to_screen(origin, *p))
            .collect();
        painter.add(egui::Shape::line(points, egui::Stroke::new(2.0, color)));
        if let Some((from, to)) = end_direction(&path) {
            draw_arrowhead(
                painter,
                self.view.canvas_to_screen(origin, from),
                self.view.canvas_to_screen(origin, to),
                color,
            );
        }
    }

    fn draw_select_box(&self, painter: &egui::Painter, origin: egui::Pos2) {
        let Some(ElementGesture::SelectBox { start, current }) = &self.gesture else {
            return;
        };
        let a = self.view.canvas_to_screen(origin, *start);
        let b = self.view.canvas_to_screen(origin, *current);
        let rect = egui::Rect::from_two_pos(a, b);
        let accent = accent_color();
        painter.rect_filled(rect, 0.0, accent.gamma_multiply(0.08));
        painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, accent), egui::StrokeKind::Middle);
    }

    /// Full canvas paint: grid, placed elements, arrows on top, then the
    /// transient overlays.
    pub(super) fn draw_canvas(&mut self, ui: &mut egui::Ui, rect: egui::Rect) {
        let origin = rect.min;
        let painter = ui.painter().with_clip_rect(rect);
        self.draw_grid(&painter, rect);
        self.draw_placed_elements(ui, origin);
        self.draw_arrows(&painter, origin);
        self.draw_anchor_affordances(&painter, origin);
        self.draw_arrow_preview(&painter, origin);
        self.draw_select_box(&painter, origin);
    }
}
