use eframe::egui;

use crate::model::{Element, ImageElement, NoteColor, NoteElement, Point};
use crate::storage::ElementPatch;

use super::arrows::ElementEvent;
use super::{BoardApp, ElementGesture};

pub(super) const MIN_ELEMENT_WIDTH: f32 = 50.0;
pub(super) const MIN_ELEMENT_HEIGHT: f32 = 30.0;
pub(super) const RESIZE_HANDLE_SIZE: f32 = 12.0;

const DEFAULT_NOTE_SIZE: (f32, f32) = (180.0, 100.0);
const DEFAULT_IMAGE_WIDTH: f32 = 250.0;
const DUPLICATE_OFFSET: f32 = 20.0;

impl BoardApp {
    pub(super) fn add_note_at(&mut self, pos: Point) -> String {
        self.push_undo();
        let id = self.allocate_element_id();
        self.board.elements.push(Element::Text(NoteElement {
            id: id.clone(),
            x: pos.x,
            y: pos.y,
            w: DEFAULT_NOTE_SIZE.0,
            h: DEFAULT_NOTE_SIZE.1,
            content: "New Idea...".to_string(),
            color: NoteColor::Default,
        }));
        self.persist_board();
        self.set_selection_single(&id);
        self.editing_text_id = Some(id.clone());
        id
    }

    /// File-picker image insertion: the file is copied into the store's
    /// images directory and referenced by name.
    pub(super) fn insert_image_dialog(&mut self, pos: Point) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg"])
            .pick_file()
        else {
            return;
        };
        let name = match self.store.import_image(&path) {
            Ok(name) => name,
            Err(e) => {
                self.status = Some(format!("Image import failed: {e}"));
                log::warn!("importing image {} failed: {e}", path.display());
                return;
            }
        };
        let (w, h) = match image::image_dimensions(&path) {
            Ok((w, h)) if w > 0 => {
                let scaled_h = DEFAULT_IMAGE_WIDTH * h as f32 / w as f32;
                (DEFAULT_IMAGE_WIDTH, scaled_h.clamp(MIN_ELEMENT_HEIGHT, 600.0))
            }
            _ => (DEFAULT_IMAGE_WIDTH, 180.0),
        };
        self.push_undo();
        let id = self.allocate_element_id();
        self.board.elements.push(Element::Image(ImageElement {
            id: id.clone(),
            x: pos.x,
            y: pos.y,
            w,
            h,
            content: name,
        }));
        self.persist_board();
        self.set_selection_single(&id);
    }

    /// Copy of a placed element, nudged +20/+20 under a fresh id. Arrows are
    /// never duplicated this way.
    pub(super) fn duplicate_element(&mut self, id: &str) -> Option<String> {
        let source = self.board.element(id)?;
        if source.is_arrow() {
            return None;
        }
        let mut copy = source.clone();
        let bounds = copy.bounds()?;
        let new_id = self.allocate_element_id();
        match &mut copy {
            Element::Text(note) => note.id = new_id.clone(),
            Element::Image(img) => img.id = new_id.clone(),
            Element::Arrow(_) => return None,
        }
        copy.set_position(bounds.x + DUPLICATE_OFFSET, bounds.y + DUPLICATE_OFFSET);
        self.board.elements.push(copy);
        self.persist_board();
        self.notify_element_event(&new_id, ElementEvent::Duplicated);
        Some(new_id)
    }

    pub(super) fn duplicate_selected(&mut self) {
        if self.selected_ids.is_empty() {
            return;
        }
        self.push_undo();
        let ids = self.selected_ids.clone();
        let mut new_ids = Vec::new();
        for id in ids {
            if let Some(new_id) = self.duplicate_element(&id) {
                new_ids.push(new_id);
            }
        }
        if !new_ids.is_empty() {
            self.selected_ids = new_ids;
        }
    }

    /// Removes the element and, through the registry, every arrow touching
    /// it, in the same logical operation.
    pub(super) fn delete_element(&mut self, id: &str) {
        if self.board.element(id).is_none() {
            return;
        }
        self.board.elements.retain(|e| e.id() != id);
        self.notify_element_event(id, ElementEvent::Deleted);
        self.persist_board();
        self.selected_ids.retain(|s| s != id);
        if self.editing_text_id.as_deref() == Some(id) {
            self.editing_text_id = None;
        }
    }

    pub(super) fn delete_selected(&mut self) {
        if self.selected_ids.is_empty() {
            return;
        }
        self.push_undo();
        for id in self.selected_ids.clone() {
            self.delete_element(&id);
        }
        self.selected_ids.clear();
    }

    pub(super) fn select_all(&mut self) {
        self.selected_ids = self
            .board
            .elements
            .iter()
            .filter(|e| !e.is_arrow())
            .map(|e| e.id().to_string())
            .collect();
    }

    pub(super) fn clear_element_selection(&mut self) {
        self.selected_ids.clear();
        self.editing_text_id = None;
    }

    pub(super) fn set_selection_single(&mut self, id: &str) {
        self.selected_ids = vec![id.to_string()];
    }

    pub(super) fn toggle_element_selection(&mut self, id: &str) {
        if let Some(at) = self.selected_ids.iter().position(|s| s == id) {
            self.selected_ids.remove(at);
        } else {
            self.selected_ids.push(id.to_string());
        }
    }

    pub(super) fn nudge_selected(&mut self, dx: f32, dy: f32) {
        if self.selected_ids.is_empty() {
            return;
        }
        for id in self.selected_ids.clone() {
            let Some(bounds) = self.board.element_bounds(&id) else {
                continue;
            };
            let (x, y) = (bounds.x + dx, bounds.y + dy);
            if let Some(element) = self.board.element_mut(&id) {
                element.set_position(x, y);
            }
            self.store
                .save_patch(&self.active_board_id, &id, ElementPatch::position(x, y));
            self.notify_element_event(&id, ElementEvent::Moved);
        }
        self.save_flash = Some(std::time::Instant::now());
    }

    pub(super) fn bring_forward(&mut self, id: &str) {
        let Some(index) = self.board.elements.iter().position(|e| e.id() == id) else {
            return;
        };
        if index + 1 < self.board.elements.len() {
            self.board.elements.swap(index, index + 1);
            self.persist_board();
        }
    }

    pub(super) fn send_backward(&mut self, id: &str) {
        let Some(index) = self.board.elements.iter().position(|e| e.id() == id) else {
            return;
        };
        if index > 0 {
            self.board.elements.swap(index, index - 1);
            self.persist_board();
        }
    }

    pub(super) fn set_note_color(&mut self, id: &str, color: NoteColor) {
        let Some(Element::Text(note)) = self.board.element_mut(id) else {
            return;
        };
        note.color = color;
        let mut patch = ElementPatch::default();
        patch.color = Some(color);
        self.store.save_patch(&self.active_board_id, id, patch);
    }

    /// Inline text edits stream through the debounced patch channel, like
    /// the rest of the field-level updates.
    pub(super) fn note_content_edited(&mut self, id: &str, content: &str) {
        self.store.save_patch(
            &self.active_board_id,
            id,
            ElementPatch::content(content.to_string()),
        );
    }

    pub(super) fn topmost_element_at(&self, pos: Point) -> Option<String> {
        for element in self.board.elements.iter().rev() {
            let Some(bounds) = element.bounds() else {
                continue;
            };
            if bounds.rect().contains(pos.to_pos2()) {
                return Some(element.id().to_string());
            }
        }
        None
    }

    /// Bottom-right corner handle of the topmost element under `pos`.
    pub(super) fn resize_handle_at(&self, pos: Point) -> Option<String> {
        for element in self.board.elements.iter().rev() {
            let Some(bounds) = element.bounds() else {
                continue;
            };
            let corner = egui::Rect::from_center_size(
                egui::pos2(bounds.x + bounds.w, bounds.y + bounds.h),
                egui::vec2(RESIZE_HANDLE_SIZE, RESIZE_HANDLE_SIZE),
            );
            if corner.contains(pos.to_pos2()) {
                return Some(element.id().to_string());
            }
        }
        None
    }

    pub(super) fn begin_move_gesture(&mut self, primary: &str, pointer: Point) {
        let ids = if self.selected_ids.iter().any(|s| s == primary) {
            self.selected_ids.clone()
        } else {
            vec![primary.to_string()]
        };
        let origins: Vec<(String, f32, f32)> = ids
            .iter()
            .filter_map(|id| {
                self.board
                    .element_bounds(id)
                    .map(|b| (id.clone(), b.x, b.y))
            })
            .collect();
        if origins.is_empty() {
            return;
        }
        self.gesture = Some(ElementGesture::Move {
            origins,
            start_pointer: pointer,
            moved: false,
        });
    }

    pub(super) fn begin_resize_gesture(&mut self, id: &str, pointer: Point) {
        let Some(bounds) = self.board.element_bounds(id) else {
            return;
        };
        self.gesture = Some(ElementGesture::Resize {
            id: id.to_string(),
            start_w: bounds.w,
            start_h: bounds.h,
            start_pointer: pointer,
            resized: false,
        });
    }

    pub(super) fn begin_select_box(&mut self, pointer: Point) {
        self.gesture = Some(ElementGesture::SelectBox {
            start: pointer,
            current: pointer,
        });
    }

    /// Live gesture update; positions/sizes move in memory only.
    pub(super) fn update_gesture(&mut self, pointer: Point) {
        let Some(gesture) = &mut self.gesture else {
            return;
        };
        match gesture {
            ElementGesture::Move {
                origins,
                start_pointer,
                moved,
            } => {
                let dx = pointer.x - start_pointer.x;
                let dy = pointer.y - start_pointer.y;
                if dx.abs() > 0.5 || dy.abs() > 0.5 {
                    *moved = true;
                }
                let updates: Vec<(String, f32, f32)> = origins
                    .iter()
                    .map(|(id, x, y)| (id.clone(), x + dx, y + dy))
                    .collect();
                for (id, x, y) in updates {
                    if let Some(element) = self.board.element_mut(&id) {
                        element.set_position(x, y);
                    }
                }
            }
            ElementGesture::Resize {
                id,
                start_w,
                start_h,
                start_pointer,
                resized,
            } => {
                let w = (*start_w + pointer.x - start_pointer.x).max(MIN_ELEMENT_WIDTH);
                let h = (*start_h + pointer.y - start_pointer.y).max(MIN_ELEMENT_HEIGHT);
                *resized = true;
                let id = id.clone();
                if let Some(element) = self.board.element_mut(&id) {
                    element.set_size(w, h);
                }
            }
            ElementGesture::SelectBox { current, .. } => *current = pointer,
        }
    }

    /// Gesture release: moved/resized geometry goes out as field patches and
    /// the registry hears about it before the interaction is over.
    pub(super) fn finish_gesture(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        match gesture {
            ElementGesture::Move { origins, moved, .. } => {
                if !moved {
                    return;
                }
                for (id, _, _) in origins {
                    let Some(bounds) = self.board.element_bounds(&id) else {
                        continue;
                    };
                    self.store.save_patch(
                        &self.active_board_id,
                        &id,
                        ElementPatch::position(bounds.x, bounds.y),
                    );
                    self.notify_element_event(&id, ElementEvent::Moved);
                }
                self.save_flash = Some(std::time::Instant::now());
            }
            ElementGesture::Resize { id, resized, .. } => {
                if !resized {
                    return;
                }
                let Some(bounds) = self.board.element_bounds(&id) else {
                    return;
                };
                self.store.save_patch(
                    &self.active_board_id,
                    &id,
                    ElementPatch::size(bounds.w, bounds.h),
                );
                self.notify_element_event(&id, ElementEvent::Resized);
                self.save_flash = Some(std::time::Instant::now());
            }
            ElementGesture::SelectBox { start, current } => {
                let min = egui::pos2(start.x.min(current.x), start.y.min(current.y));
                let max = egui::pos2(start.x.max(current.x), start.y.max(current.y));
                let box_rect = egui::Rect::from_min_max(min, max);
                self.selected_ids = self
                    .board
                    .elements
                    .iter()
                    .filter_map(|e| {
                        let bounds = e.bounds()?;
                        box_rect
                            .intersects(bounds.rect())
                            .then(|| e.id().to_string())
                    })
                    .collect();
            }
        }
    }

}
