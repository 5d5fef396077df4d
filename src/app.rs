use eframe::egui;
use std::collections::{HashMap, HashSet};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::model::{ArrowStyle, Board, BoardMeta, Element, Point};
use crate::storage::Store;

mod anchor;
mod arrow_draw;
mod arrow_path;
mod arrows;
mod boards;
mod command_palette;
mod elements;
mod render;
mod settings;
mod svg;
mod update;

use arrow_draw::DrawSession;
use arrows::ControlDrag;
use command_palette::CommandPalette;

/// Canvas viewport state: persisted geometry is canvas-space, the scroll
/// offset is subtracted/added only at the screen boundary.
#[derive(Clone, Copy, Debug, Default)]
struct View {
    scroll: egui::Vec2,
}

impl View {
    fn canvas_to_screen(&self, origin: egui::Pos2, p: Point) -> egui::Pos2 {
        origin + (p.to_pos2().to_vec2() - self.scroll)
    }

    fn screen_to_canvas(&self, origin: egui::Pos2, p: egui::Pos2) -> Point {
        Point::from_pos2((p - origin + self.scroll).to_pos2())
    }
}

/// One in-flight element gesture; at most one exists at a time.
#[derive(Clone, Debug)]
enum ElementGesture {
    Move {
        // id -> its position when the gesture started
        origins: Vec<(String, f32, f32)>,
        start_pointer: Point,
        moved: bool,
    },
    Resize {
        id: String,
        start_w: f32,
        start_h: f32,
        start_pointer: Point,
        resized: bool,
    },
    SelectBox {
        start: Point,
        current: Point,
    },
}

pub struct BoardApp {
    store: Store,
    board_metadata: Vec<BoardMeta>,
    active_board_id: String,
    board: Board,

    // element interaction
    selected_ids: Vec<String>,
    gesture: Option<ElementGesture>,
    editing_text_id: Option<String>,
    context_hit: Option<String>,

    // arrow subsystem
    arrow_mode: bool,
    anchors_visible: bool,
    current_arrow_style: ArrowStyle,
    selected_arrow_id: Option<String>,
    arrow_draw: Option<DrawSession>,
    control_drag: Option<ControlDrag>,

    // view & chrome
    view: View,
    theme: String,
    nudge_step: f32,
    settings_path: String,
    status: Option<String>,
    save_flash: Option<Instant>,
    save_error: bool,
    history: Vec<Vec<Element>>,
    future: Vec<Vec<Element>>,
    textures: HashMap<String, egui::TextureHandle>,
    missing_images: HashSet<String>,
    command_palette: CommandPalette,
    toggle_theme_pending: bool,
    last_canvas_rect: Option<egui::Rect>,
    last_id_stamp: u128,
}

const MAX_UNDO_STACK: usize = 50;

impl BoardApp {
    fn config_path() -> Option<String> {
        if let Some(home) = std::env::var_os("HOME") {
            let path = std::path::PathBuf::from(home)
                .join(".config")
                .join("moodboard.toml");
            if path.exists() {
                return Some(path.display().to_string());
            }
        }
        if std::path::Path::new("settings.toml").exists() {
            return Some("settings.toml".to_string());
        }
        None
    }

    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings_path = Self::config_path().unwrap_or_else(|| "settings.toml".to_string());
        let settings = settings::load_settings(&settings_path)
            .or_else(|| settings::load_settings("settings.json"))
            .unwrap_or_default();

        if settings.theme == "light" {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        }

        let mut app = Self::with_store(Store::open(settings.store_dir.clone()));
        app.theme = settings.theme;
        app.nudge_step = settings.nudge_step;
        app.settings_path = settings_path;
        app
    }

    /// Construction off a concrete store; the entry point for tests too.
    fn with_store(mut store: Store) -> Self {
        let board_metadata = store.load_metadata();
        let active_board_id = board_metadata
            .first()
            .map(|m| m.id.clone())
            .unwrap_or_else(|| "default".to_string());
        let board = store.load_board(&active_board_id);
        log::debug!(
            "opened store at {} with {} board(s)",
            store.dir().display(),
            board_metadata.len()
        );
        Self {
            store,
            board_metadata,
            active_board_id,
            board,
            selected_ids: Vec::new(),
            gesture: None,
            editing_text_id: None,
            context_hit: None,
            arrow_mode: false,
            anchors_visible: false,
            current_arrow_style: ArrowStyle::default(),
            selected_arrow_id: None,
            arrow_draw: None,
            control_drag: None,
            view: View::default(),
            theme: "dark".to_string(),
            nudge_step: 10.0,
            settings_path: "settings.toml".to_string(),
            status: None,
            save_flash: None,
            save_error: false,
            history: Vec::new(),
            future: Vec::new(),
            textures: HashMap::new(),
            missing_images: HashSet::new(),
            command_palette: CommandPalette::default(),
            toggle_theme_pending: false,
            last_canvas_rect: None,
            last_id_stamp: 0,
        }
    }

    /// Canvas-space point at the middle of the visible canvas; falls back
    /// near the origin before the first frame has laid the canvas out.
    fn viewport_center(&self) -> Point {
        match self.last_canvas_rect {
            Some(rect) => self.view.screen_to_canvas(rect.min, rect.center()),
            None => Point::new(300.0, 200.0),
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        if self.theme == "light" {
            self.theme = "dark".to_string();
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            self.theme = "light".to_string();
            ctx.set_visuals(egui::Visuals::light());
        }
        self.persist_settings();
    }

    fn persist_settings(&mut self) {
        let snapshot = settings::AppSettings {
            theme: self.theme.clone(),
            store_dir: self.store.dir().display().to_string(),
            nudge_step: self.nudge_step,
        };
        if let Err(e) = settings::save_settings(&self.settings_path, &snapshot) {
            self.status = Some(format!("Settings save failed: {e}"));
            log::warn!("saving settings failed: {e}");
        }
    }

    fn now_millis() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }

    /// Monotonic millisecond stamps; bumped past the last one handed out so
    /// ids stay unique even within one millisecond.
    fn next_id_stamp(&mut self) -> u128 {
        let mut stamp = Self::now_millis();
        if stamp <= self.last_id_stamp {
            stamp = self.last_id_stamp + 1;
        }
        self.last_id_stamp = stamp;
        stamp
    }

    fn allocate_element_id(&mut self) -> String {
        loop {
            let id = self.next_id_stamp().to_string();
            if !self.board.contains(&id) {
                return id;
            }
        }
    }

    fn allocate_arrow_id(&mut self) -> String {
        loop {
            let id = format!("arrow-{}", self.next_id_stamp());
            if !self.board.contains(&id) {
                return id;
            }
        }
    }

    /// Full-board write of the active board. A failed write never rolls the
    /// in-memory state back; it surfaces on the save indicator instead.
    fn persist_board(&mut self) {
        match self.store.update_board(&self.active_board_id, &self.board) {
            Ok(()) => {
                self.save_flash = Some(Instant::now());
                self.save_error = false;
                if let Some(meta) = self
                    .board_metadata
                    .iter_mut()
                    .find(|m| m.id == self.active_board_id)
                {
                    meta.title = self.board.title.clone();
                }
            }
            Err(e) => {
                self.save_error = true;
                self.status = Some(format!("Save failed: {e}"));
                log::warn!("saving board {} failed: {e}", self.active_board_id);
            }
        }
    }

    fn save_status_label(&self) -> &'static str {
        if self.save_error {
            return "Not saved";
        }
        match self.save_flash {
            Some(at) if at.elapsed().as_secs() < 1 => "Saving…",
            _ => "Synced",
        }
    }

    fn push_undo(&mut self) {
        self.history.push(self.board.elements.clone());
        if self.history.len() > MAX_UNDO_STACK {
            self.history.remove(0);
        }
        self.future.clear();
    }

    fn undo(&mut self) {
        if let Some(previous) = self.history.pop() {
            self.future.push(self.board.elements.clone());
            self.board.elements = previous;
            self.after_history_jump();
        }
    }

    fn redo(&mut self) {
        if let Some(next) = self.future.pop() {
            self.history.push(self.board.elements.clone());
            self.board.elements = next;
            self.after_history_jump();
        }
    }

    /// Restored elements may no longer contain what transient state points
    /// at; drop anything now dangling, then persist the restored board.
    fn after_history_jump(&mut self) {
        self.selected_ids.retain(|id| self.board.contains(id));
        if let Some(selected) = &self.selected_arrow_id {
            if self.board.arrow(selected).is_none() {
                self.selected_arrow_id = None;
            }
        }
        if let Some(editing) = &self.editing_text_id {
            if !self.board.contains(editing) {
                self.editing_text_id = None;
            }
        }
        self.gesture = None;
        self.arrow_draw = None;
        self.control_drag = None;
        self.persist_board();
    }
}
