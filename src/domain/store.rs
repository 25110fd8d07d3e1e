use super::entities::{emoji_or_default, new_id, truncate_due_date, Folder, Task, TaskList, User};
use super::enums::EntityKind;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use log::{debug, info};

/// In-memory tree of users, folders, lists and tasks.
///
/// All commands other than user creation act on the current user's subtree.
/// Commands validate and resolve every reference before touching anything, so
/// a returned `Err` means the store is unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
    users: Vec<User>,
    current_user: Option<String>,
}

fn validated_name(name: &str, kind: EntityKind) -> Result<String, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::EmptyName(kind));
    }
    Ok(name.to_string())
}

impl EntityStore {
    /// Build a store from loaded users; an unknown current id falls back to the first user
    pub fn from_parts(users: Vec<User>, current_user: Option<String>) -> Self {
        let mut store = Self {
            users,
            current_user: None,
        };
        store.current_user = current_user
            .filter(|id| store.user(id).is_some())
            .or_else(|| store.users.first().map(|u| u.id.clone()));
        store
    }

    // ---- queries ----

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn current_user_id(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_deref().and_then(|id| self.user(id))
    }

    /// Folders of the current user
    pub fn folders(&self) -> Result<&[Folder], StoreError> {
        Ok(&self.require_user()?.folders)
    }

    pub fn folder(&self, folder_id: &str) -> Result<&Folder, StoreError> {
        self.require_user()?
            .folder(folder_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Folder, folder_id))
    }

    /// Lists of a folder owned by the current user
    pub fn lists(&self, folder_id: &str) -> Result<&[TaskList], StoreError> {
        Ok(&self.folder(folder_id)?.lists)
    }

    pub fn list(&self, folder_id: &str, list_id: &str) -> Result<&TaskList, StoreError> {
        self.folder(folder_id)?
            .list(list_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::List, list_id))
    }

    /// Tasks of a list owned by the current user
    pub fn tasks(&self, folder_id: &str, list_id: &str) -> Result<&[Task], StoreError> {
        Ok(&self.list(folder_id, list_id)?.tasks)
    }

    pub fn find_task(&self, task_id: &str) -> Result<&Task, StoreError> {
        self.require_user()?
            .find_task(task_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Task, task_id))
    }

    fn require_user(&self) -> Result<&User, StoreError> {
        self.current_user().ok_or(StoreError::NoCurrentUser)
    }

    fn require_user_mut(&mut self) -> Result<&mut User, StoreError> {
        let id = self.current_user.as_deref().ok_or(StoreError::NoCurrentUser)?;
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NoCurrentUser)
    }

    fn require_folder_mut(&mut self, folder_id: &str) -> Result<&mut Folder, StoreError> {
        self.require_user_mut()?
            .folder_mut(folder_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Folder, folder_id))
    }

    fn require_list_mut(&mut self, folder_id: &str, list_id: &str) -> Result<&mut TaskList, StoreError> {
        self.require_folder_mut(folder_id)?
            .list_mut(list_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::List, list_id))
    }

    // ---- users ----

    /// Create a user; the first user created becomes current
    pub fn create_user(&mut self, name: &str, image: Option<String>) -> Result<User, StoreError> {
        let user = User::new(validated_name(name, EntityKind::User)?, image);
        if self.current_user.is_none() {
            self.current_user = Some(user.id.clone());
        }
        self.users.push(user.clone());
        info!("event=user_created module=store status=ok user_id={}", user.id);
        Ok(user)
    }

    pub fn switch_user(&mut self, user_id: &str) -> Result<(), StoreError> {
        if self.user(user_id).is_none() {
            return Err(StoreError::not_found(EntityKind::User, user_id));
        }
        self.current_user = Some(user_id.to_string());
        info!("event=user_switched module=store status=ok user_id={}", user_id);
        Ok(())
    }

    /// Replace the whole user collection.
    ///
    /// The current user is kept if it still exists, otherwise the first user becomes current.
    pub fn replace_users(&mut self, users: Vec<User>) {
        let current = self.current_user.take();
        *self = Self::from_parts(users, current);
        info!(
            "event=users_replaced module=store status=ok count={}",
            self.users.len()
        );
    }

    /// Append an externally built user, keeping its subtree verbatim.
    ///
    /// A user id already present in the store is replaced with a fresh one.
    /// Returns the id the user was stored under.
    pub fn append_user(&mut self, mut user: User) -> String {
        if self.user(&user.id).is_some() {
            let fresh = new_id();
            debug!(
                "event=user_rekeyed module=store status=ok old_id={} new_id={}",
                user.id, fresh
            );
            user.id = fresh;
        }
        let id = user.id.clone();
        if self.current_user.is_none() {
            self.current_user = Some(id.clone());
        }
        self.users.push(user);
        info!("event=user_appended module=store status=ok user_id={}", id);
        id
    }

    // ---- folders ----

    pub fn create_folder(&mut self, name: &str, emoji: Option<String>) -> Result<Folder, StoreError> {
        let name = validated_name(name, EntityKind::Folder)?;
        let user = self.require_user_mut()?;
        let folder = Folder::new(name, emoji);
        user.folders.push(folder.clone());
        info!("event=folder_created module=store status=ok folder_id={}", folder.id);
        Ok(folder)
    }

    /// Replace a folder's name and emoji; an empty emoji resets to the default glyph
    pub fn rename_folder(&mut self, folder_id: &str, name: &str, emoji: Option<String>) -> Result<(), StoreError> {
        let name = validated_name(name, EntityKind::Folder)?;
        let folder = self.require_folder_mut(folder_id)?;
        folder.name = name;
        folder.emoji = emoji_or_default(emoji);
        debug!("event=folder_renamed module=store status=ok folder_id={}", folder_id);
        Ok(())
    }

    /// Remove a folder together with all of its lists and tasks
    pub fn delete_folder(&mut self, folder_id: &str) -> Result<Folder, StoreError> {
        let user = self.require_user_mut()?;
        let pos = user
            .folders
            .iter()
            .position(|f| f.id == folder_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Folder, folder_id))?;
        let folder = user.folders.remove(pos);
        info!(
            "event=folder_deleted module=store status=ok folder_id={} lists={} tasks={}",
            folder_id,
            folder.lists.len(),
            folder.task_count()
        );
        Ok(folder)
    }

    // ---- lists ----

    pub fn create_list(&mut self, folder_id: &str, name: &str) -> Result<TaskList, StoreError> {
        let name = validated_name(name, EntityKind::List)?;
        let folder = self.require_folder_mut(folder_id)?;
        let list = TaskList::new(name);
        folder.lists.push(list.clone());
        info!(
            "event=list_created module=store status=ok folder_id={} list_id={}",
            folder_id, list.id
        );
        Ok(list)
    }

    /// Rename a list found anywhere in the current user's subtree
    pub fn rename_list(&mut self, list_id: &str, name: &str) -> Result<(), StoreError> {
        let name = validated_name(name, EntityKind::List)?;
        let list = self
            .require_user_mut()?
            .find_list_mut(list_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::List, list_id))?;
        list.name = name;
        debug!("event=list_renamed module=store status=ok list_id={}", list_id);
        Ok(())
    }

    /// Remove a list together with all of its tasks
    pub fn delete_list(&mut self, folder_id: &str, list_id: &str) -> Result<TaskList, StoreError> {
        let folder = self.require_folder_mut(folder_id)?;
        let pos = folder
            .lists
            .iter()
            .position(|l| l.id == list_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::List, list_id))?;
        let list = folder.lists.remove(pos);
        info!(
            "event=list_deleted module=store status=ok list_id={} tasks={}",
            list_id,
            list.tasks.len()
        );
        Ok(list)
    }

    // ---- tasks ----

    pub fn create_task(
        &mut self,
        folder_id: &str,
        list_id: &str,
        name: &str,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, StoreError> {
        let name = validated_name(name, EntityKind::Task)?;
        let list = self.require_list_mut(folder_id, list_id)?;
        let task = Task::new(name, description.to_string(), due_date);
        list.tasks.push(task.clone());
        info!(
            "event=task_created module=store status=ok list_id={} task_id={} has_due={}",
            list_id,
            task.id,
            task.due_date.is_some()
        );
        Ok(task)
    }

    /// Replace a task's name, description and due date
    pub fn update_task(
        &mut self,
        task_id: &str,
        name: &str,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let name = validated_name(name, EntityKind::Task)?;
        let task = self
            .require_user_mut()?
            .find_task_mut(task_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Task, task_id))?;
        task.name = name;
        task.description = description.to_string();
        task.due_date = truncate_due_date(due_date);
        debug!("event=task_updated module=store status=ok task_id={}", task_id);
        Ok(())
    }

    /// Flip completion on a task anywhere in the current user's subtree; returns the new value
    pub fn toggle_task_completion(&mut self, task_id: &str) -> Result<bool, StoreError> {
        let task = self
            .require_user_mut()?
            .find_task_mut(task_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Task, task_id))?;
        task.toggle();
        debug!(
            "event=task_toggled module=store status=ok task_id={} completed={}",
            task_id, task.completed
        );
        Ok(task.completed)
    }

    pub fn delete_task(&mut self, folder_id: &str, list_id: &str, task_id: &str) -> Result<Task, StoreError> {
        let list = self.require_list_mut(folder_id, list_id)?;
        let pos = list
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Task, task_id))?;
        let task = list.tasks.remove(pos);
        info!("event=task_deleted module=store status=ok task_id={}", task_id);
        Ok(task)
    }
}
