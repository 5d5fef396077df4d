use eframe::egui;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::model::ArrowStyle;

use super::BoardApp;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum CommandId {
    NewBoard,
    DeleteBoard,
    ImportBoard,
    ExportBoard,
    ExportSvg,
    AddNote,
    InsertImage,
    ToggleArrowMode,
    ArrowStyleStraight,
    ArrowStyleCurved,
    ArrowStyleOrthogonal,
    Undo,
    Redo,
    Duplicate,
    Delete,
    SelectAll,
    ToggleTheme,
    SwitchBoard(String),
}

struct CommandSpec {
    id: CommandId,
    name: &'static str,
    search: &'static str,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec { id: CommandId::NewBoard, name: "Board: New", search: "new board create" },
    CommandSpec { id: CommandId::DeleteBoard, name: "Board: Delete", search: "delete board remove" },
    CommandSpec { id: CommandId::ImportBoard, name: "Board: Import JSON", search: "import board json open" },
    CommandSpec { id: CommandId::ExportBoard, name: "Board: Export JSON", search: "export board json save" },
    CommandSpec { id: CommandId::ExportSvg, name: "Board: Export SVG", search: "export svg image" },
    CommandSpec { id: CommandId::AddNote, name: "Add: Text note (T)", search: "add text note t" },
    CommandSpec { id: CommandId::InsertImage, name: "Add: Image (I)", search: "add insert image picture i" },
    CommandSpec { id: CommandId::ToggleArrowMode, name: "Arrows: Toggle mode (A)", search: "arrow mode connect toggle a" },
    CommandSpec { id: CommandId::ArrowStyleStraight, name: "Arrows: Straight style", search: "arrow style straight line" },
    CommandSpec { id: CommandId::ArrowStyleCurved, name: "Arrows: Curved style", search: "arrow style curved bezier" },
    CommandSpec { id: CommandId::ArrowStyleOrthogonal, name: "Arrows: Orthogonal style", search: "arrow style orthogonal elbow" },
    CommandSpec { id: CommandId::Undo, name: "Edit: Undo", search: "undo" },
    CommandSpec { id: CommandId::Redo, name: "Edit: Redo", search: "redo" },
    CommandSpec { id: CommandId::Duplicate, name: "Edit: Duplicate", search: "duplicate clone copy" },
    CommandSpec { id: CommandId::Delete, name: "Edit: Delete selection", search: "delete remove" },
    CommandSpec { id: CommandId::SelectAll, name: "Edit: Select all", search: "select all" },
    CommandSpec { id: CommandId::ToggleTheme, name: "View: Toggle theme", search: "theme dark light" },
];

#[derive(Default)]
pub(super) struct CommandPalette {
    pub open: bool,
    query: String,
    selected: usize,
}

impl CommandPalette {
    pub(super) fn open(&mut self, prefill: &str) {
        self.open = true;
        self.query = prefill.to_string();
        self.selected = 0;
    }

    fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.selected = 0;
    }
}

impl BoardApp {
    fn palette_entries(&self, query: &str) -> Vec<(CommandId, String)> {
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, CommandId, String)> = Vec::new();
        for spec in COMMANDS {
            let score = if query.is_empty() {
                Some(0)
            } else {
                matcher
                    .fuzzy_match(spec.search, query)
                    .or_else(|| matcher.fuzzy_match(spec.name, query))
            };
            if let Some(score) = score {
                scored.push((score, spec.id.clone(), spec.name.to_string()));
            }
        }
        for meta in &self.board_metadata {
            let label = format!("Switch: {}", meta.title);
            let score = if query.is_empty() {
                Some(0)
            } else {
                matcher.fuzzy_match(&label, query)
            };
            if let Some(score) = score {
                scored.push((score, CommandId::SwitchBoard(meta.id.clone()), label));
            }
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, id, name)| (id, name)).collect()
    }

    fn run_palette_command(&mut self, id: CommandId) {
        match id {
            CommandId::NewBoard => self.create_board(),
            CommandId::DeleteBoard => self.delete_active_board(),
            CommandId::ImportBoard => self.import_board_dialog(),
            CommandId::ExportBoard => self.export_board_dialog(),
            CommandId::ExportSvg => self.export_svg_dialog(),
            CommandId::AddNote => {
                let pos = self.viewport_center();
                self.add_note_at(pos);
            }
            CommandId::InsertImage => {
                let pos = self.viewport_center();
                self.insert_image_dialog(pos);
            }
            CommandId::ToggleArrowMode => self.toggle_arrow_mode(),
            CommandId::ArrowStyleStraight => self.current_arrow_style = ArrowStyle::Straight,
            CommandId::ArrowStyleCurved => self.current_arrow_style = ArrowStyle::Curved,
            CommandId::ArrowStyleOrthogonal => self.current_arrow_style = ArrowStyle::Orthogonal,
            CommandId::Undo => self.undo(),
            CommandId::Redo => self.redo(),
            CommandId::Duplicate => self.duplicate_selected(),
            CommandId::Delete => self.delete_selected(),
            CommandId::SelectAll => self.select_all(),
            CommandId::ToggleTheme => self.toggle_theme_pending = true,
            CommandId::SwitchBoard(board_id) => self.switch_board(&board_id),
        }
    }

    pub(super) fn show_command_palette(&mut self, ctx: &egui::Context) {
        if !self.command_palette.open {
            return;
        }
        let mut close = false;
        let mut run: Option<CommandId> = None;

        egui::Window::new("Command Palette")
            .collapsible(false)
            .resizable(false)
            .title_bar(false)
            .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 80.0))
            .show(ctx, |ui| {
                ui.set_min_width(420.0);
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.command_palette.query)
                        .hint_text("Type a command or board name…")
                        .desired_width(f32::INFINITY),
                );
                response.request_focus();

                let entries = self.palette_entries(&self.command_palette.query.clone());
                if self.command_palette.selected >= entries.len() {
                    self.command_palette.selected = entries.len().saturating_sub(1);
                }

                ui.input(|i| {
                    if i.key_pressed(egui::Key::ArrowDown) {
                        self.command_palette.selected =
                            (self.command_palette.selected + 1).min(entries.len().saturating_sub(1));
                    }
                    if i.key_pressed(egui::Key::ArrowUp) {
                        self.command_palette.selected =
                            self.command_palette.selected.saturating_sub(1);
                    }
                    if i.key_pressed(egui::Key::Escape) {
                        close = true;
                    }
                    if i.key_pressed(egui::Key::Enter) {
                        if let Some((id, _)) = entries.get(self.command_palette.selected) {
                            run = Some(id.clone());
                        }
                        close = true;
                    }
                });

                ui.separator();
                egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
                    for (index, (id, name)) in entries.iter().enumerate() {
                        let highlighted = index == self.command_palette.selected;
                        if ui.selectable_label(highlighted, name).clicked() {
                            run = Some(id.clone());
                            close = true;
                        }
                    }
                });
            });

        if let Some(id) = run {
            self.run_palette_command(id);
        }
        if close {
            self.command_palette.close();
        }
    }
}
