use crate::model::{Board, BoardMeta};

use super::BoardApp;

impl BoardApp {
    /// Loads another board as the active one. Pending patches for the old
    /// board are flushed first so nothing trails behind the switch.
    pub(super) fn switch_board(&mut self, board_id: &str) {
        if self.active_board_id == board_id {
            return;
        }
        if let Err(e) = self.store.flush_patches() {
            log::warn!("flushing patches before board switch failed: {e}");
        }
        if self.arrow_mode {
            self.toggle_arrow_mode();
        }
        self.board = self.store.load_board(board_id);
        self.active_board_id = board_id.to_string();
        self.clear_element_selection();
        self.gesture = None;
        self.history.clear();
        self.future.clear();
        self.status = None;
    }

    pub(super) fn create_board(&mut self) {
        let id = format!("b{}", self.next_id_stamp());
        let board = Board {
            title: "New Board".to_string(),
            elements: Vec::new(),
        };
        if let Err(e) = self.store.update_board(&id, &board) {
            self.status = Some(format!("Board create failed: {e}"));
            log::warn!("creating board {id} failed: {e}");
            return;
        }
        self.board_metadata.push(BoardMeta {
            id: id.clone(),
            title: board.title.clone(),
        });
        self.switch_board(&id);
    }

    pub(super) fn rename_active_board(&mut self, title: &str) {
        if self.board.title == title {
            return;
        }
        self.board.title = title.to_string();
        self.persist_board();
    }

    pub(super) fn delete_active_board(&mut self) {
        if self.board_metadata.len() <= 1 {
            self.status = Some("Cannot delete the last board".to_string());
            return;
        }
        let doomed = self.active_board_id.clone();
        if let Err(e) = self.store.delete_board(&doomed) {
            self.status = Some(format!("Board delete failed: {e}"));
            log::warn!("deleting board {doomed} failed: {e}");
            return;
        }
        self.board_metadata.retain(|m| m.id != doomed);
        let next = self
            .board_metadata
            .first()
            .map(|m| m.id.clone())
            .unwrap_or_else(|| "default".to_string());
        self.active_board_id.clear(); // force the switch to reload
        self.switch_board(&next);
    }

    pub(super) fn export_board_dialog(&mut self) {
        let default_name = format!("{}.json", self.board.title);
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(&default_name)
            .add_filter("JSON", &["json"])
            .save_file()
        else {
            return;
        };
        match self.store.export_board(&path, &self.board) {
            Ok(()) => self.status = Some(format!("Exported {}", path.display())),
            Err(e) => {
                self.status = Some(format!("Export failed: {e}"));
                log::warn!("exporting board failed: {e}");
            }
        }
    }

    pub(super) fn import_board_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        else {
            return;
        };
        match self.store.import_board(&path) {
            Ok(board) => {
                let id = format!("imp{}", self.next_id_stamp());
                if let Err(e) = self.store.update_board(&id, &board) {
                    self.status = Some(format!("Import failed: {e}"));
                    return;
                }
                self.board_metadata.push(BoardMeta {
                    id: id.clone(),
                    title: board.title.clone(),
                });
                self.switch_board(&id);
                self.status = Some(format!("Imported {}", path.display()));
            }
            Err(e) => {
                self.status = Some(format!("Import failed: corrupted JSON ({e})"));
                log::warn!("importing board from {} failed: {e}", path.display());
            }
        }
    }

    pub(super) fn export_svg_dialog(&mut self) {
        let default_name = format!("{}.svg", self.board.title);
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(&default_name)
            .add_filter("SVG", &["svg"])
            .save_file()
        else {
            return;
        };
        let svg = super::svg::board_to_svg(&self.board);
        match std::fs::write(&path, svg) {
            Ok(()) => self.status = Some(format!("Exported {}", path.display())),
            Err(e) => {
                self.status = Some(format!("SVG export failed: {e}"));
                log::warn!("SVG export failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, NoteElement};
    use crate::storage::Store;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn test_app() -> BoardApp {
        let seq = TEST_SEQ.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "moodboard-boards-test-{}-{}",
            std::process::id(),
            seq
        ));
        let _ = std::fs::remove_dir_all(&dir);
        BoardApp::with_store(Store::open(dir))
    }

    #[test]
    fn create_switches_to_the_new_board() {
        let mut app = test_app();
        assert_eq!(app.active_board_id, "default");
        app.create_board();
        assert_ne!(app.active_board_id, "default");
        assert_eq!(app.board.title, "New Board");
        assert_eq!(app.board_metadata.len(), 2);
    }

    #[test]
    fn switching_back_reloads_persisted_content() {
        let mut app = test_app();
        let first = app.active_board_id.clone();
        app.board.elements.push(Element::Text(NoteElement {
            id: "100".to_string(),
            x: 0.0,
            y: 0.0,
            w: 100.0,
            h: 50.0,
            content: "hello".to_string(),
            color: Default::default(),
        }));
        app.persist_board();
        app.create_board();
        assert_eq!(app.board.elements.len(), 0);
        app.switch_board(&first);
        assert_eq!(app.board.elements.len(), 1);
    }

    #[test]
    fn switching_clears_arrow_mode_and_selection() {
        let mut app = test_app();
        let first = app.active_board_id.clone();
        app.toggle_arrow_mode();
        app.create_board();
        assert!(!app.arrow_mode);
        assert_eq!(app.selected_arrow_id, None);
        app.switch_board(&first);
        assert!(!app.arrow_mode);
    }

    #[test]
    fn the_last_board_cannot_be_deleted() {
        let mut app = test_app();
        app.delete_active_board();
        assert_eq!(app.board_metadata.len(), 1);
        assert_eq!(app.status.as_deref(), Some("Cannot delete the last board"));
    }

    #[test]
    fn deleting_the_active_board_switches_away() {
        let mut app = test_app();
        let first = app.active_board_id.clone();
        app.create_board();
        let second = app.active_board_id.clone();
        app.delete_active_board();
        assert_eq!(app.active_board_id, first);
        assert!(app.board_metadata.iter().all(|m| m.id != second));
    }

    #[test]
    fn rename_updates_metadata_through_persist() {
        let mut app = test_app();
        app.rename_active_board("Sprint Wall");
        assert_eq!(app.board.title, "Sprint Wall");
        assert_eq!(app.board_metadata[0].title, "Sprint Wall");
        let reloaded = Store::open(app.store.dir().to_path_buf()).load_metadata();
        assert_eq!(reloaded[0].title, "Sprint Wall");
    }

    #[test]
    fn switch_flushes_pending_patches_first() {
        let mut app = test_app();
        let first = app.active_board_id.clone();
        app.board.elements.push(Element::Text(NoteElement {
            id: "100".to_string(),
            x: 0.0,
            y: 0.0,
            w: 100.0,
            h: 50.0,
            content: String::new(),
            color: Default::default(),
        }));
        app.persist_board();
        app.set_selection_single("100");
        app.nudge_selected(15.0, 0.0);
        assert!(app.store.has_pending());
        app.create_board();
        assert!(!app.store.has_pending());
        app.switch_board(&first);
        assert_eq!(app.board.element_bounds("100").unwrap().x, 15.0);
    }
}
