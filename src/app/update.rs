use eframe::egui;
use std::time::Instant;

use crate::model::{ArrowStyle, Element, NoteColor, Point};
use crate::storage::FLUSH_DELAY;

use super::BoardApp;
use super::anchor::{ANCHOR_HIT_RADIUS, anchor_at};

impl eframe::App for BoardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.toggle_theme_pending {
            self.toggle_theme_pending = false;
            self.toggle_theme(ctx);
        }

        // Debounced patch writes tick on the frame clock.
        match self.store.maybe_flush() {
            Ok(true) => {
                self.save_flash = Some(Instant::now());
                self.save_error = false;
            }
            Ok(false) => {}
            Err(e) => {
                self.save_error = true;
                self.status = Some(format!("Save failed: {e}"));
                log::warn!("patch flush failed: {e}");
            }
        }
        if self.store.has_pending() {
            ctx.request_repaint_after(FLUSH_DELAY);
        }
        // Keep the save indicator ticking over to "Synced".
        if self.save_flash.is_some_and(|at| at.elapsed().as_secs() < 1) {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }

        self.handle_shortcuts(ctx);
        self.top_bar(ctx);
        self.board_list_panel(ctx);
        self.status_bar(ctx);
        self.canvas_panel(ctx);
        self.show_command_palette(ctx);
    }
}

impl BoardApp {
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let wants_keyboard = ctx.wants_keyboard_input();
        ctx.input_mut(|i| {
            if !self.command_palette.open
                && i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::P)
            {
                self.command_palette.open("");
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::N) {
                self.create_board();
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                if let Err(e) = self.store.flush_patches() {
                    self.save_error = true;
                    self.status = Some(format!("Save failed: {e}"));
                } else {
                    self.persist_board();
                }
            }

            let skip = wants_keyboard || self.command_palette.open;
            if skip {
                return;
            }

            if i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::Z)
                || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y)
            {
                self.redo();
            } else if i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z) {
                self.undo();
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::D) {
                self.duplicate_selected();
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::A) {
                self.select_all();
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace)
            {
                if let Some(id) = self.selected_arrow_id.clone() {
                    self.delete_arrow(&id);
                } else {
                    self.delete_selected();
                }
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Escape) {
                if self.arrow_draw.is_some() {
                    self.cancel_arrow_draw();
                } else if self.selected_arrow_id.is_some() {
                    self.selected_arrow_id = None;
                } else {
                    self.clear_element_selection();
                }
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::T) {
                let pos = self.viewport_center();
                self.add_note_at(pos);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::I) {
                let pos = self.viewport_center();
                self.insert_image_dialog(pos);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::A) {
                self.toggle_arrow_mode();
            }

            let step = if i.modifiers.shift {
                self.nudge_step * 5.0
            } else {
                self.nudge_step
            };
            if i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowLeft)
                || i.consume_key(egui::Modifiers::SHIFT, egui::Key::ArrowLeft)
            {
                self.nudge_selected(-step, 0.0);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowRight)
                || i.consume_key(egui::Modifiers::SHIFT, egui::Key::ArrowRight)
            {
                self.nudge_selected(step, 0.0);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowUp)
                || i.consume_key(egui::Modifiers::SHIFT, egui::Key::ArrowUp)
            {
                self.nudge_selected(0.0, -step);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowDown)
                || i.consume_key(egui::Modifiers::SHIFT, egui::Key::ArrowDown)
            {
                self.nudge_selected(0.0, step);
            }
        });
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let mut title = self.board.title.clone();
                let response = ui.add(
                    egui::TextEdit::singleline(&mut title)
                        .desired_width(200.0)
                        .font(egui::TextStyle::Heading),
                );
                if response.changed() {
                    self.rename_active_board(&title);
                }
                if !self.selected_ids.is_empty() {
                    ui.weak(format!("({} selected)", self.selected_ids.len()));
                }

                ui.separator();
                ui.menu_button("Board", |ui| {
                    if ui.button("New (⌘N)").clicked() {
                        self.create_board();
                    }
                    if ui.button("Delete").clicked() {
                        self.delete_active_board();
                    }
                    ui.separator();
                    if ui.button("Import JSON…").clicked() {
                        self.import_board_dialog();
                    }
                    if ui.button("Export JSON…").clicked() {
                        self.export_board_dialog();
                    }
                    if ui.button("Export SVG…").clicked() {
                        self.export_svg_dialog();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    if ui
                        .add_enabled(!self.history.is_empty(), egui::Button::new("Undo (⌘Z)"))
                        .clicked()
                    {
                        self.undo();
                    }
                    if ui
                        .add_enabled(!self.future.is_empty(), egui::Button::new("Redo (⌘⇧Z)"))
                        .clicked()
                    {
                        self.redo();
                    }
                    ui.separator();
                    if ui
                        .add_enabled(
                            !self.selected_ids.is_empty(),
                            egui::Button::new("Duplicate (⌘D)"),
                        )
                        .clicked()
                    {
                        self.duplicate_selected();
                    }
                    if ui
                        .add_enabled(
                            !self.selected_ids.is_empty(),
                            egui::Button::new("Delete (Del)"),
                        )
                        .clicked()
                    {
                        self.delete_selected();
                    }
                    if ui.button("Select All (⌘A)").clicked() {
                        self.select_all();
                    }
                });

                ui.separator();
                if ui.button("+ Note (T)").clicked() {
                    let pos = self.viewport_center();
                    self.add_note_at(pos);
                }
                if ui.button("+ Image (I)").clicked() {
                    let pos = self.viewport_center();
                    self.insert_image_dialog(pos);
                }

                ui.separator();
                let arrows_on = self.arrow_mode;
                if ui.selectable_label(arrows_on, "Arrows (A)").clicked() {
                    self.toggle_arrow_mode();
                }
                egui::ComboBox::from_id_salt("arrow_style")
                    .selected_text(match self.current_arrow_style {
                        ArrowStyle::Straight => "Straight",
                        ArrowStyle::Curved => "Curved",
                        ArrowStyle::Orthogonal => "Orthogonal",
                    })
                    .show_ui(ui, |ui| {
                        ui.selectable_value(
                            &mut self.current_arrow_style,
                            ArrowStyle::Straight,
                            "Straight",
                        );
                        ui.selectable_value(
                            &mut self.current_arrow_style,
                            ArrowStyle::Curved,
                            "Curved",
                        );
                        ui.selectable_value(
                            &mut self.current_arrow_style,
                            ArrowStyle::Orthogonal,
                            "Orthogonal",
                        );
                    });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(self.save_status_label());
                    if ui
                        .button(if self.theme == "light" { "🌙" } else { "☀" })
                        .clicked()
                    {
                        self.toggle_theme_pending = true;
                    }
                });
            });
        });
    }

    fn board_list_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("board_list")
            .resizable(true)
            .default_width(170.0)
            .show(ctx, |ui| {
                ui.heading("Boards");
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for meta in self.board_metadata.clone() {
                        let active = meta.id == self.active_board_id;
                        let label = if meta.title.is_empty() {
                            "Untitled"
                        } else {
                            meta.title.as_str()
                        };
                        if ui.selectable_label(active, label).clicked() && !active {
                            self.switch_board(&meta.id);
                        }
                    }
                    if self.board_metadata.is_empty() {
                        ui.weak("No boards yet");
                    }
                    ui.separator();
                    if ui.button("+ New Board").clicked() {
                        self.create_board();
                    }
                });
            });
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let arrows = self.board.arrows().count();
                let placed = self.board.elements.len() - arrows;
                ui.weak(format!("{placed} element(s), {arrows} arrow(s)"));
                if self.arrow_mode {
                    ui.separator();
                    ui.weak("arrow mode: drag between anchors to connect");
                }
                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(status.clone());
                }
            });
        });
    }

    fn canvas_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let rect = ui.max_rect();
            self.last_canvas_rect = Some(rect);
            let response = ui.interact(rect, ui.id().with("canvas"), egui::Sense::click_and_drag());
            let origin = rect.min;

            let scroll_delta = ctx.input(|i| i.raw_scroll_delta);
            if scroll_delta != egui::Vec2::ZERO {
                if let Some(hover) = ctx.input(|i| i.pointer.hover_pos()) {
                    if rect.contains(hover) {
                        self.view.scroll -= scroll_delta;
                    }
                }
            }

            let pointer_canvas = ctx
                .input(|i| i.pointer.interact_pos())
                .map(|p| self.view.screen_to_canvas(origin, p));
            let multi = ctx.input(|i| i.modifiers.ctrl || i.modifiers.command);

            let mut handled_double_click = false;
            if response.double_clicked() {
                if let Some(pos) = pointer_canvas {
                    handled_double_click = true;
                    match self.topmost_element_at(pos) {
                        Some(id) => {
                            if matches!(self.board.element(&id), Some(Element::Text(_))) {
                                self.set_selection_single(&id);
                                self.editing_text_id = Some(id);
                            }
                        }
                        None => {
                            self.add_note_at(pos);
                        }
                    }
                }
            }

            if response.drag_started() {
                if let Some(pos) = pointer_canvas {
                    self.on_canvas_drag_start(pos, multi);
                }
            }
            if response.clicked() && !handled_double_click {
                if let Some(pos) = pointer_canvas {
                    self.on_canvas_click(pos, multi);
                }
            }

            if response.dragged() {
                if let Some(pos) = pointer_canvas {
                    if self.control_drag.is_some() {
                        self.update_control_drag(pos);
                    } else if self.arrow_draw.is_some() {
                        self.update_arrow_draw(pos);
                    } else {
                        self.update_gesture(pos);
                    }
                }
            }

            if response.drag_stopped() {
                match pointer_canvas {
                    Some(pos) if self.control_drag.is_some() => {
                        self.update_control_drag(pos);
                        self.finish_control_drag();
                    }
                    Some(pos) if self.arrow_draw.is_some() => self.release_arrow_draw(pos),
                    Some(_) => self.finish_gesture(),
                    None => {
                        // Pointer left the surface: no dangling previews.
                        self.finish_control_drag();
                        self.cancel_arrow_draw();
                        self.gesture = None;
                    }
                }
            }

            if response.secondary_clicked() {
                if let Some(pos) = pointer_canvas {
                    self.context_hit = self.topmost_element_at(pos);
                }
            }
            response.context_menu(|ui| self.context_menu_ui(ui));

            self.draw_canvas(ui, rect);
        });
    }

    fn on_canvas_drag_start(&mut self, pos: Point, multi: bool) {
        self.editing_text_id = None;
        if self.arrow_mode {
            if self.anchors_visible {
                if let Some((element, anchor)) =
                    anchor_at(&self.board, pos, None, ANCHOR_HIT_RADIUS)
                {
                    self.begin_arrow_draw(&element, anchor);
                    return;
                }
            }
            if let Some(id) = self.control_handle_at(pos) {
                self.begin_control_drag(&id);
                return;
            }
        }
        if let Some(id) = self.resize_handle_at(pos) {
            self.push_undo();
            self.begin_resize_gesture(&id, pos);
            return;
        }
        if let Some(id) = self.topmost_element_at(pos) {
            if !self.selected_ids.contains(&id) {
                if multi {
                    self.toggle_element_selection(&id);
                } else {
                    self.set_selection_single(&id);
                }
            }
            self.push_undo();
            self.begin_move_gesture(&id, pos);
            return;
        }
        if !multi {
            self.clear_element_selection();
        }
        self.begin_select_box(pos);
    }

    fn on_canvas_click(&mut self, pos: Point, multi: bool) {
        self.editing_text_id = None;
        if self.arrow_mode {
            if let Some(id) = self.delete_affordance_at(pos) {
                self.delete_arrow(&id);
                return;
            }
            if let Some(id) = self.arrow_hit_at(pos) {
                self.select_arrow(&id);
                return;
            }
        }
        match self.topmost_element_at(pos) {
            Some(id) => {
                if multi {
                    self.toggle_element_selection(&id);
                } else {
                    self.set_selection_single(&id);
                }
            }
            None => {
                if !multi {
                    self.clear_element_selection();
                }
            }
        }
    }

    fn context_menu_ui(&mut self, ui: &mut egui::Ui) {
        let Some(id) = self.context_hit.clone() else {
            ui.weak("Nothing here");
            return;
        };
        if ui.button("Duplicate").clicked() {
            self.push_undo();
            self.duplicate_element(&id);
        }
        if ui.button("Bring forward").clicked() {
            self.bring_forward(&id);
        }
        if ui.button("Send backward").clicked() {
            self.send_backward(&id);
        }
        if matches!(self.board.element(&id), Some(Element::Text(_))) {
            ui.menu_button("Color", |ui| {
                for color in NoteColor::ALL {
                    if ui.button(color.label()).clicked() {
                        self.set_note_color(&id, color);
                    }
                }
            });
        }
        ui.separator();
        if ui.button("Delete").clicked() {
            self.push_undo();
            self.delete_element(&id);
        }
    }
}
