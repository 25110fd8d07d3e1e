use crate::domain::{
    group_tasks_by_due_date, DueBucket, EntityKind, EntityStore, Folder, Selection, Task, TaskList, Theme, User,
};
use crate::error::{CodecError, StoreError};
use crate::persistence::{
    atomic_write, export_all, export_file_name, export_user, load_state, parse_document, read_file,
    save_current_user, save_selection, save_theme, save_users, ImportDocument, LocalStore,
};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Result of applying an import document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The user collection was replaced
    Replaced { count: usize },
    /// One user was appended under `user_id`
    Appended { user_id: String },
}

/// Main application state
pub struct AppState {
    pub store: EntityStore,
    pub selection: Selection,
    pub theme: Theme,
    pub needs_save: bool,
    local: LocalStore,
}

impl AppState {
    /// Restore state from the durable store
    pub fn load(local: LocalStore) -> Self {
        let persisted = load_state(&local);
        let store = EntityStore::from_parts(persisted.users, persisted.current_user);

        let mut selection = persisted.selection;
        selection.prune(store.current_user());

        info!(
            "event=state_loaded module=app status=ok users={} has_current={}",
            store.users().len(),
            store.current_user().is_some()
        );

        Self {
            store,
            selection,
            theme: persisted.theme,
            needs_save: false,
            local,
        }
    }

    /// Write every key if anything changed since the last save
    pub fn save(&mut self) -> Result<()> {
        if !self.needs_save {
            return Ok(());
        }
        save_users(&self.local, self.store.users())?;
        save_current_user(&self.local, self.store.current_user_id())?;
        save_theme(&self.local, self.theme)?;
        save_selection(&self.local, &self.selection)?;
        self.needs_save = false;
        Ok(())
    }

    fn changed<T>(&mut self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if result.is_ok() {
            self.needs_save = true;
        }
        result
    }

    /// Folder from an explicit id or the selection
    pub fn resolve_folder(&self, explicit: Option<&str>) -> Result<String, StoreError> {
        explicit
            .or_else(|| self.selection.folder_id())
            .map(str::to_string)
            .ok_or(StoreError::NothingSelected(EntityKind::Folder))
    }

    /// Folder and list from explicit ids or the selection.
    ///
    /// An explicit folder without a list never borrows the selected list, since that
    /// list may belong to a different folder.
    pub fn resolve_list(&self, folder: Option<&str>, list: Option<&str>) -> Result<(String, String), StoreError> {
        let folder_id = self.resolve_folder(folder)?;
        let list_id = match list {
            Some(id) => id.to_string(),
            None if self.selection.folder_id() == Some(folder_id.as_str()) => self
                .selection
                .list_id()
                .map(str::to_string)
                .ok_or(StoreError::NothingSelected(EntityKind::List))?,
            None => return Err(StoreError::NothingSelected(EntityKind::List)),
        };
        Ok((folder_id, list_id))
    }

    // ---- users ----

    pub fn create_user(&mut self, name: &str, image: Option<String>) -> Result<User, StoreError> {
        let result = self.store.create_user(name, image);
        self.changed(result)
    }

    /// Switch the current user; the folder/list selection is reset
    pub fn switch_user(&mut self, user_id: &str) -> Result<(), StoreError> {
        let result = self.store.switch_user(user_id);
        if result.is_ok() {
            self.selection.user_switched();
        }
        self.changed(result)
    }

    // ---- folders ----

    pub fn create_folder(&mut self, name: &str, emoji: Option<String>) -> Result<Folder, StoreError> {
        let result = self.store.create_folder(name, emoji);
        self.changed(result)
    }

    pub fn rename_folder(&mut self, folder_id: &str, name: &str, emoji: Option<String>) -> Result<(), StoreError> {
        let result = self.store.rename_folder(folder_id, name, emoji);
        self.changed(result)
    }

    pub fn delete_folder(&mut self, folder_id: &str) -> Result<Folder, StoreError> {
        let result = self.store.delete_folder(folder_id);
        self.selection.prune(self.store.current_user());
        self.changed(result)
    }

    pub fn select_folder(&mut self, folder_id: &str) -> Result<(), StoreError> {
        let user = self.store.current_user().ok_or(StoreError::NoCurrentUser)?;
        let result = self.selection.select_folder(user, folder_id);
        self.changed(result)
    }

    // ---- lists ----

    pub fn create_list(&mut self, folder: Option<&str>, name: &str) -> Result<TaskList, StoreError> {
        let folder_id = self.resolve_folder(folder)?;
        let result = self.store.create_list(&folder_id, name);
        self.changed(result)
    }

    pub fn rename_list(&mut self, list_id: &str, name: &str) -> Result<(), StoreError> {
        let result = self.store.rename_list(list_id, name);
        self.changed(result)
    }

    pub fn delete_list(&mut self, folder: Option<&str>, list_id: &str) -> Result<TaskList, StoreError> {
        let folder_id = self.resolve_folder(folder)?;
        let result = self.store.delete_list(&folder_id, list_id);
        self.selection.prune(self.store.current_user());
        self.changed(result)
    }

    /// Select a list, focusing its folder first when one is given
    pub fn select_list(&mut self, folder: Option<&str>, list_id: &str) -> Result<(), StoreError> {
        let user = self.store.current_user().ok_or(StoreError::NoCurrentUser)?;
        let mut next = self.selection.clone();
        if let Some(folder_id) = folder {
            next.select_folder(user, folder_id)?;
        }
        next.select_list(user, list_id)?;
        self.selection = next;
        self.needs_save = true;
        Ok(())
    }

    pub fn lists(&self, folder: Option<&str>) -> Result<&[TaskList], StoreError> {
        let folder_id = self.resolve_folder(folder)?;
        self.store.lists(&folder_id)
    }

    // ---- tasks ----

    pub fn create_task(
        &mut self,
        folder: Option<&str>,
        list: Option<&str>,
        name: &str,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, StoreError> {
        let (folder_id, list_id) = self.resolve_list(folder, list)?;
        let result = self
            .store
            .create_task(&folder_id, &list_id, name, description, due_date);
        self.changed(result)
    }

    pub fn update_task(
        &mut self,
        task_id: &str,
        name: &str,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let result = self.store.update_task(task_id, name, description, due_date);
        self.changed(result)
    }

    pub fn toggle_task(&mut self, task_id: &str) -> Result<bool, StoreError> {
        let result = self.store.toggle_task_completion(task_id);
        self.changed(result)
    }

    pub fn delete_task(&mut self, folder: Option<&str>, list: Option<&str>, task_id: &str) -> Result<Task, StoreError> {
        let (folder_id, list_id) = self.resolve_list(folder, list)?;
        let result = self.store.delete_task(&folder_id, &list_id, task_id);
        self.changed(result)
    }

    /// Tasks of a list grouped into due-date buckets
    pub fn grouped_tasks<Tz: TimeZone>(
        &self,
        folder: Option<&str>,
        list: Option<&str>,
        now: &DateTime<Tz>,
    ) -> Result<Vec<(DueBucket, Vec<&Task>)>, StoreError> {
        let (folder_id, list_id) = self.resolve_list(folder, list)?;
        let tasks = self.store.tasks(&folder_id, &list_id)?;
        Ok(group_tasks_by_due_date(tasks, now))
    }

    // ---- theme ----

    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme != theme {
            self.theme = theme;
            self.needs_save = true;
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    // ---- import / export ----

    /// Render an export document and its default file name.
    ///
    /// `user_id` exports a single user's subtree; `None` exports every user.
    pub fn export(&self, user_id: Option<&str>) -> Result<(String, String), CodecError> {
        let users = self.store.users();
        let content = match user_id {
            Some(id) => export_user(users, id)?,
            None => export_all(users)?,
        };
        Ok((export_file_name(user_id), content))
    }

    /// Write an export into `dir`, returning the file path
    pub fn export_to_dir(&self, dir: &Path, user_id: Option<&str>) -> Result<PathBuf> {
        let (file_name, content) = self.export(user_id)?;
        let path = dir.join(file_name);
        atomic_write(&path, &content)?;
        info!(
            "event=export module=app status=ok scope={} bytes={}",
            if user_id.is_some() { "user" } else { "all" },
            content.len()
        );
        Ok(path)
    }

    /// Apply an import document.
    ///
    /// The document is fully parsed before anything changes; on error the state is untouched.
    /// An array replaces the user collection, a single object is appended to it.
    pub fn import_document(&mut self, text: &str) -> Result<ImportOutcome, CodecError> {
        let document = parse_document(text)?;
        let outcome = match document {
            ImportDocument::Collection(users) => {
                let count = users.len();
                self.store.replace_users(users);
                self.selection.clear();
                ImportOutcome::Replaced { count }
            }
            ImportDocument::Single(user) => ImportOutcome::Appended {
                user_id: self.store.append_user(user),
            },
        };
        self.needs_save = true;
        Ok(outcome)
    }

    /// Import a document from a file
    pub fn import_file(&mut self, path: &Path) -> Result<ImportOutcome> {
        let text = read_file(path)?
            .with_context(|| format!("Import file not found: {}", path.display()))?;
        self.import_document(&text).map_err(|e| {
            warn!("event=import module=app status=error error={}", e);
            anyhow::Error::new(e).context(format!("Could not import {}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    fn new_app() -> (TempDir, AppState) {
        let temp_dir = tempdir().unwrap();
        let local = LocalStore::open(temp_dir.path()).unwrap();
        (temp_dir, AppState::load(local))
    }

    // Wednesday 2024-05-15 12:00 UTC
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    /// Alice -> Work -> Sprint -> "Ship feature" (due the day after `fixed_now`, with
    /// sub-millisecond digits), with Sprint selected
    fn seeded_app() -> (TempDir, AppState, String) {
        let (temp_dir, mut app) = new_app();
        app.create_user("Alice", None).unwrap();
        let folder = app.create_folder("Work", None).unwrap();
        app.select_folder(&folder.id).unwrap();
        let list = app.create_list(None, "Sprint").unwrap();
        app.select_list(None, &list.id).unwrap();
        let due = fixed_now() + Duration::days(1) + Duration::nanoseconds(117_418_978);
        let task = app.create_task(None, None, "Ship feature", "", Some(due)).unwrap();
        (temp_dir, app, task.id)
    }

    #[test]
    fn test_state_survives_reload() {
        let (temp_dir, mut app, task_id) = seeded_app();
        app.toggle_task(&task_id).unwrap();
        app.set_theme(Theme::Dark);
        app.save().unwrap();
        assert!(!app.needs_save);

        let reloaded = AppState::load(LocalStore::open(temp_dir.path()).unwrap());
        assert_eq!(reloaded.store, app.store);
        assert_eq!(reloaded.selection, app.selection);
        assert_eq!(reloaded.theme, Theme::Dark);
        assert!(reloaded.store.find_task(&task_id).unwrap().completed);
    }

    #[test]
    fn test_sub_millisecond_due_date_survives_export_import() {
        let (_temp_dir, mut app, task_id) = seeded_app();
        let precise = Utc.with_ymd_and_hms(2024, 5, 16, 9, 30, 0).unwrap() + Duration::nanoseconds(123_456_000);
        app.update_task(&task_id, "Ship feature", "", Some(precise)).unwrap();
        let before = app.store.users().to_vec();

        let (_, document) = app.export(None).unwrap();
        app.import_document(&document).unwrap();

        assert_eq!(app.store.users(), before.as_slice());
        let due = app.store.find_task(&task_id).unwrap().due_date;
        assert_eq!(due, Some(Utc.with_ymd_and_hms(2024, 5, 16, 9, 30, 0).unwrap() + Duration::milliseconds(123)));
    }

    #[test]
    fn test_failed_command_does_not_mark_dirty() {
        let (_temp_dir, mut app) = new_app();
        assert!(app.create_folder("Work", None).is_err());
        assert!(app.create_user("", None).is_err());
        assert!(!app.needs_save);
    }

    #[test]
    fn test_switch_user_resets_selection() {
        let (_temp_dir, mut app, _) = seeded_app();
        let bob = app.create_user("Bob", None).unwrap();

        app.switch_user(&bob.id).unwrap();

        assert_eq!(app.selection, Selection::Nothing);
        assert_eq!(app.store.current_user_id(), Some(bob.id.as_str()));
        assert_eq!(
            app.create_list(None, "Inbox"),
            Err(StoreError::NothingSelected(EntityKind::Folder))
        );
    }

    #[test]
    fn test_explicit_folder_does_not_borrow_selected_list() {
        let (_temp_dir, mut app, _) = seeded_app();
        let home = app.create_folder("Home", None).unwrap();

        assert_eq!(
            app.create_task(Some(&home.id), None, "Laundry", "", None),
            Err(StoreError::NothingSelected(EntityKind::List))
        );
    }

    #[test]
    fn test_delete_selected_folder_prunes_selection() {
        let (_temp_dir, mut app, _) = seeded_app();
        let folder_id = app.selection.folder_id().unwrap().to_string();

        app.delete_folder(&folder_id).unwrap();

        assert_eq!(app.selection, Selection::Nothing);
        assert!(app.store.folders().unwrap().is_empty());
    }

    #[test]
    fn test_grouped_tasks_for_selected_list() {
        let (_temp_dir, mut app, _) = seeded_app();
        app.create_task(None, None, "Someday", "", None).unwrap();

        let groups = app.grouped_tasks(None, None, &fixed_now()).unwrap();
        let buckets: Vec<_> = groups.iter().map(|(b, _)| *b).collect();
        assert_eq!(buckets, vec![DueBucket::Tomorrow, DueBucket::NoDueDate]);
    }

    #[test]
    fn test_single_user_import_appends_structurally_equal_user() {
        let (_temp_dir, mut app, _) = seeded_app();
        let original = app.store.current_user().unwrap().clone();
        let (file_name, document) = app.export(Some(&original.id)).unwrap();
        assert_eq!(file_name, format!("task_manager_user_{}.json", original.id));

        let outcome = app.import_document(&document).unwrap();

        let user_id = match outcome {
            ImportOutcome::Appended { user_id } => user_id,
            other => panic!("expected append, got {:?}", other),
        };
        assert_eq!(app.store.users().len(), 2);
        let imported = app.store.user(&user_id).unwrap();
        assert_eq!(imported.name, original.name);
        assert_eq!(imported.folders, original.folders);
    }

    #[test]
    fn test_single_user_import_into_other_store_keeps_ids() {
        let (_temp_dir, source, _) = seeded_app();
        let original = source.store.current_user().unwrap().clone();
        let (_, document) = source.export(Some(&original.id)).unwrap();

        let (_other_dir, mut target) = new_app();
        let outcome = target.import_document(&document).unwrap();

        assert_eq!(outcome, ImportOutcome::Appended { user_id: original.id.clone() });
        assert_eq!(target.store.users(), &[original.clone()]);
        assert_eq!(target.store.current_user_id(), Some(original.id.as_str()));
    }

    #[test]
    fn test_collection_import_replaces_users() {
        let (_temp_dir, mut app, _) = seeded_app();
        app.create_user("Bob", None).unwrap();
        let (file_name, document) = app.export(None).unwrap();
        assert_eq!(file_name, "task_manager_all_users.json");
        let snapshot = app.store.users().to_vec();

        app.create_user("Carol", None).unwrap();
        let outcome = app.import_document(&document).unwrap();

        assert_eq!(outcome, ImportOutcome::Replaced { count: 2 });
        assert_eq!(app.store.users(), snapshot.as_slice());
        assert_eq!(app.selection, Selection::Nothing);
    }

    #[test]
    fn test_malformed_import_preserves_state() {
        let (_temp_dir, mut app, _) = seeded_app();
        app.save().unwrap();
        let before = app.store.clone();
        let selection = app.selection.clone();

        assert!(app.import_document("[{\"id\": \"x\"").is_err());
        assert!(app.import_document("{\"id\": \"x\", \"name\": \"y\", \"folders\": 3}").is_err());

        assert_eq!(app.store, before);
        assert_eq!(app.selection, selection);
        assert!(!app.needs_save);
    }

    #[test]
    fn test_export_and_import_files() {
        let (temp_dir, mut app, _) = seeded_app();
        let user_id = app.store.current_user_id().unwrap().to_string();

        let path = app.export_to_dir(temp_dir.path(), Some(&user_id)).unwrap();
        assert!(path.ends_with(format!("task_manager_user_{}.json", user_id)));

        let outcome = app.import_file(&path).unwrap();
        assert!(matches!(outcome, ImportOutcome::Appended { .. }));

        assert!(app.import_file(&temp_dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_toggle_theme() {
        let (_temp_dir, mut app) = new_app();
        assert_eq!(app.theme, Theme::Light);
        assert_eq!(app.toggle_theme(), Theme::Dark);
        assert!(app.needs_save);
    }
}
