use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::model::{Board, BoardMeta, Element, NoteColor, Point};

/// Quiet period before pending element patches are written out.
pub const FLUSH_DELAY: Duration = Duration::from_millis(200);

const STORE_FILE: &str = "boards.json";
const IMAGES_DIR: &str = "images";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    metadata: Vec<BoardMeta>,
    #[serde(default)]
    boards: HashMap<String, Board>,
}

/// Partial element update produced by drag/resize/edit gestures. Only the
/// changed fields are carried; everything else stays untouched on flush.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub w: Option<f32>,
    pub h: Option<f32>,
    pub content: Option<String>,
    pub color: Option<NoteColor>,
    pub control_point: Option<Point>,
}

impl ElementPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn size(w: f32, h: f32) -> Self {
        Self {
            w: Some(w),
            h: Some(h),
            ..Self::default()
        }
    }

    pub fn content(content: String) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: ElementPatch) {
        if other.x.is_some() {
            self.x = other.x;
        }
        if other.y.is_some() {
            self.y = other.y;
        }
        if other.w.is_some() {
            self.w = other.w;
        }
        if other.h.is_some() {
            self.h = other.h;
        }
        if other.content.is_some() {
            self.content = other.content;
        }
        if other.color.is_some() {
            self.color = other.color;
        }
        if other.control_point.is_some() {
            self.control_point = other.control_point;
        }
    }

    fn apply(&self, element: &mut Element) {
        if let Some(bounds) = element.bounds() {
            element.set_position(self.x.unwrap_or(bounds.x), self.y.unwrap_or(bounds.y));
            element.set_size(self.w.unwrap_or(bounds.w), self.h.unwrap_or(bounds.h));
        }
        match element {
            Element::Text(note) => {
                if let Some(content) = &self.content {
                    note.content = content.clone();
                }
                if let Some(color) = self.color {
                    note.color = color;
                }
            }
            Element::Image(img) => {
                if let Some(content) = &self.content {
                    img.content = content.clone();
                }
            }
            Element::Arrow(arrow) => {
                if let Some(point) = self.control_point {
                    arrow.control_point = Some(point);
                }
            }
        }
    }
}

/// Local JSON store for all boards, mirroring writes into an in-memory cache.
pub struct Store {
    dir: PathBuf,
    cache: HashMap<String, Board>,
    pending: HashMap<String, HashMap<String, ElementPatch>>,
    last_patch_at: Option<Instant>,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
            pending: HashMap::new(),
            last_patch_at: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir.join(IMAGES_DIR)
    }

    fn store_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    fn read_state(&self) -> Result<StoreState, String> {
        let path = self.store_path();
        if !path.exists() {
            return Ok(StoreState::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    }

    fn write_state(&self, state: &StoreState) -> Result<(), String> {
        std::fs::create_dir_all(&self.dir).map_err(|e| e.to_string())?;
        let json = serde_json::to_string_pretty(state).map_err(|e| e.to_string())?;
        std::fs::write(self.store_path(), json).map_err(|e| e.to_string())
    }

    /// Lightweight board list; seeds a default board into an empty store.
    pub fn load_metadata(&mut self) -> Vec<BoardMeta> {
        match self.read_state() {
            Ok(state) if !state.metadata.is_empty() => state.metadata,
            Ok(_) => {
                let meta = BoardMeta {
                    id: "default".to_string(),
                    title: "Main Board".to_string(),
                };
                let mut board = Board::default();
                board.title = meta.title.clone();
                if let Err(e) = self.update_board(&meta.id, &board) {
                    log::warn!("seeding default board failed: {e}");
                }
                vec![meta]
            }
            Err(e) => {
                log::warn!("loading board metadata failed: {e}");
                vec![BoardMeta {
                    id: "default".to_string(),
                    title: "Main Board".to_string(),
                }]
            }
        }
    }

    pub fn load_board(&mut self, board_id: &str) -> Board {
        if let Some(board) = self.cache.get(board_id) {
            return board.clone();
        }
        match self.read_state() {
            Ok(state) => match state.boards.get(board_id) {
                Some(board) => {
                    self.cache.insert(board_id.to_string(), board.clone());
                    board.clone()
                }
                None => Board::default(),
            },
            Err(e) => {
                log::warn!("loading board {board_id} failed: {e}");
                Board {
                    title: "Error".to_string(),
                    elements: Vec::new(),
                }
            }
        }
    }

    /// Full-board write; keeps the metadata title in sync and the cache warm.
    pub fn update_board(&mut self, board_id: &str, board: &Board) -> Result<(), String> {
        let mut state = self.read_state().unwrap_or_default();
        state.boards.insert(board_id.to_string(), board.clone());
        match state.metadata.iter_mut().find(|m| m.id == board_id) {
            Some(meta) => meta.title = board.title.clone(),
            None => state.metadata.push(BoardMeta {
                id: board_id.to_string(),
                title: board.title.clone(),
            }),
        }
        self.cache.insert(board_id.to_string(), board.clone());
        self.write_state(&state)
    }

    pub fn delete_board(&mut self, board_id: &str) -> Result<(), String> {
        let mut state = self.read_state().unwrap_or_default();
        state.boards.remove(board_id);
        state.metadata.retain(|m| m.id != board_id);
        self.cache.remove(board_id);
        self.pending.remove(board_id);
        self.write_state(&state)
    }

    /// Queue a field-level patch; written out after [`FLUSH_DELAY`] of quiet.
    pub fn save_patch(&mut self, board_id: &str, element_id: &str, patch: ElementPatch) {
        self.pending
            .entry(board_id.to_string())
            .or_default()
            .entry(element_id.to_string())
            .or_default()
            .merge(patch);
        self.last_patch_at = Some(Instant::now());
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Called every frame; flushes once the debounce window has passed.
    pub fn maybe_flush(&mut self) -> Result<bool, String> {
        if self.pending.is_empty() {
            return Ok(false);
        }
        match self.last_patch_at {
            Some(at) if at.elapsed() >= FLUSH_DELAY => self.flush_patches().map(|_| true),
            _ => Ok(false),
        }
    }

    pub fn flush_patches(&mut self) -> Result<(), String> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut state = self.read_state()?;
        for (board_id, patches) in &self.pending {
            let Some(board) = state.boards.get_mut(board_id) else {
                continue;
            };
            for (element_id, patch) in patches {
                if let Some(element) = board.element_mut(element_id) {
                    patch.apply(element);
                }
                if let Some(cached) = self.cache.get_mut(board_id) {
                    if let Some(element) = cached.element_mut(element_id) {
                        patch.apply(element);
                    }
                }
            }
        }
        self.write_state(&state)?;
        self.pending.clear();
        self.last_patch_at = None;
        Ok(())
    }

    pub fn export_board(&self, path: &Path, board: &Board) -> Result<(), String> {
        let json = serde_json::to_string_pretty(board).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn import_board(&self, path: &Path) -> Result<Board, String> {
        let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    }

    /// Copies a picked image file into the store and returns the stored name.
    pub fn import_image(&self, source: &Path) -> Result<String, String> {
        let images = self.images_dir();
        std::fs::create_dir_all(&images).map_err(|e| e.to_string())?;
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| "image file has no usable name".to_string())?;
        let mut target = images.join(name);
        let mut bump = 1u32;
        while target.exists() {
            let stem = source
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");
            let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("png");
            target = images.join(format!("{stem}-{bump}.{ext}"));
            bump += 1;
        }
        std::fs::copy(source, &target).map_err(|e| e.to_string())?;
        Ok(target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name)
            .to_string())
    }

    pub fn image_path(&self, name: &str) -> PathBuf {
        self.images_dir().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteElement;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn test_store() -> Store {
        let seq = TEST_SEQ.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "moodboard-store-test-{}-{}",
            std::process::id(),
            seq
        ));
        let _ = std::fs::remove_dir_all(&dir);
        Store::open(dir)
    }

    fn note(id: &str, x: f32, y: f32) -> Element {
        Element::Text(NoteElement {
            id: id.to_string(),
            x,
            y,
            w: 180.0,
            h: 100.0,
            content: String::new(),
            color: NoteColor::Default,
        })
    }

    #[test]
    fn update_board_round_trips_through_fresh_store() {
        let mut store = test_store();
        let dir = store.dir().to_path_buf();
        let mut board = Board::default();
        board.title = "Plans".to_string();
        board.elements.push(note("100", 10.0, 20.0));
        store.update_board("b1", &board).unwrap();

        let mut reopened = Store::open(dir);
        let metadata = reopened.load_metadata();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].title, "Plans");
        assert_eq!(reopened.load_board("b1"), board);
    }

    #[test]
    fn empty_store_seeds_a_default_board() {
        let mut store = test_store();
        let metadata = store.load_metadata();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].id, "default");
        assert_eq!(store.load_board("default").title, "Main Board");
    }

    #[test]
    fn patches_merge_per_element_and_apply_on_flush() {
        let mut store = test_store();
        let mut board = Board::default();
        board.elements.push(note("100", 10.0, 20.0));
        store.update_board("b1", &board).unwrap();

        store.save_patch("b1", "100", ElementPatch::position(40.0, 50.0));
        store.save_patch("b1", "100", ElementPatch::position(70.0, 80.0));
        store.save_patch("b1", "100", ElementPatch::size(200.0, 120.0));
        assert!(store.has_pending());

        // Nothing hits disk until the flush itself runs.
        let unflushed = Store::open(store.dir().to_path_buf()).load_board("b1");
        assert_eq!(unflushed.element_bounds("100").unwrap().x, 10.0);

        store.flush_patches().unwrap();
        assert!(!store.has_pending());
        let bounds = store.load_board("b1").element_bounds("100").unwrap();
        assert_eq!((bounds.x, bounds.y, bounds.w, bounds.h), (70.0, 80.0, 200.0, 120.0));

        let on_disk = Store::open(store.dir().to_path_buf()).load_board("b1");
        assert_eq!(on_disk.element_bounds("100").unwrap().x, 70.0);
    }

    #[test]
    fn patches_for_missing_elements_are_dropped() {
        let mut store = test_store();
        store.update_board("b1", &Board::default()).unwrap();
        store.save_patch("b1", "nope", ElementPatch::position(1.0, 2.0));
        store.save_patch("gone", "100", ElementPatch::position(1.0, 2.0));
        store.flush_patches().unwrap();
        assert!(!store.has_pending());
    }

    #[test]
    fn delete_board_removes_board_and_metadata() {
        let mut store = test_store();
        store.update_board("b1", &Board::default()).unwrap();
        store.update_board("b2", &Board::default()).unwrap();
        store.delete_board("b1").unwrap();
        let metadata = store.load_metadata();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].id, "b2");
    }

    #[test]
    fn export_import_board_round_trip() {
        let store = test_store();
        std::fs::create_dir_all(store.dir()).unwrap();
        let mut board = Board::default();
        board.title = "Exported".to_string();
        board.elements.push(note("100", 1.0, 2.0));
        let path = store.dir().join("out.json");
        store.export_board(&path, &board).unwrap();
        assert_eq!(store.import_board(&path).unwrap(), board);
    }
}
