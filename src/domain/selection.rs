use super::entities::User;
use super::enums::EntityKind;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};

/// Folder/list focus inside the current user's subtree.
///
/// A list can only be selected through its owning folder, so a stale list from
/// another folder is unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Nothing,
    Folder(String),
    List { folder_id: String, list_id: String },
}

impl Selection {
    pub fn folder_id(&self) -> Option<&str> {
        match self {
            Selection::Nothing => None,
            Selection::Folder(folder_id) => Some(folder_id.as_str()),
            Selection::List { folder_id, .. } => Some(folder_id.as_str()),
        }
    }

    pub fn list_id(&self) -> Option<&str> {
        match self {
            Selection::List { list_id, .. } => Some(list_id.as_str()),
            _ => None,
        }
    }

    /// Focus a folder of `user`.
    ///
    /// Re-selecting the focused folder keeps its list; any other folder clears it.
    pub fn select_folder(&mut self, user: &User, folder_id: &str) -> Result<(), StoreError> {
        if user.folder(folder_id).is_none() {
            return Err(StoreError::not_found(EntityKind::Folder, folder_id));
        }
        if self.folder_id() != Some(folder_id) {
            *self = Selection::Folder(folder_id.to_string());
        }
        Ok(())
    }

    /// Focus a list of the currently focused folder
    pub fn select_list(&mut self, user: &User, list_id: &str) -> Result<(), StoreError> {
        let folder_id = self
            .folder_id()
            .ok_or(StoreError::NothingSelected(EntityKind::Folder))?
            .to_string();
        let folder = user
            .folder(&folder_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Folder, &folder_id))?;
        if folder.list(list_id).is_none() {
            return Err(StoreError::not_found(EntityKind::List, list_id));
        }
        *self = Selection::List {
            folder_id,
            list_id: list_id.to_string(),
        };
        Ok(())
    }

    /// Drop the list focus, keeping the folder
    pub fn clear_list(&mut self) {
        if let Selection::List { folder_id, .. } = self {
            let folder_id = std::mem::take(folder_id);
            *self = Selection::Folder(folder_id);
        }
    }

    pub fn clear(&mut self) {
        *self = Selection::Nothing;
    }

    /// Called whenever the current user changes
    pub fn user_switched(&mut self) {
        self.clear();
    }

    /// Drop any part of the selection that no longer resolves under `user`
    pub fn prune(&mut self, user: Option<&User>) {
        let Some(user) = user else {
            self.clear();
            return;
        };

        match self.clone() {
            Selection::Nothing => {}
            Selection::Folder(folder_id) => {
                if user.folder(&folder_id).is_none() {
                    self.clear();
                }
            }
            Selection::List { folder_id, list_id } => match user.folder(&folder_id) {
                None => self.clear(),
                Some(folder) if folder.list(&list_id).is_none() => self.clear_list(),
                Some(_) => {}
            },
        }
    }
}
