use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Avatar used when a user is created without an image
pub const DEFAULT_USER_IMAGE: &str = "/placeholder.svg?height=40&width=40";

/// Label used when a folder is created without an emoji
pub const DEFAULT_FOLDER_EMOJI: &str = "📁";

/// Generate a fresh entity ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Due dates are kept at millisecond precision, the resolution of the document format
pub fn truncate_due_date(due: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    due.map(|d| d.trunc_subsecs(3))
}

fn default_user_image() -> String {
    DEFAULT_USER_IMAGE.to_string()
}

fn default_folder_emoji() -> String {
    DEFAULT_FOLDER_EMOJI.to_string()
}

/// A single task inside a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Free text, may be empty
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        with = "crate::persistence::codec::due_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(name: String, description: String, due_date: Option<DateTime<Utc>>) -> Self {
        Self {
            id: new_id(),
            name,
            description,
            due_date: truncate_due_date(due_date),
            completed: false,
        }
    }

    /// Flip the completion flag
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}

/// An ordered collection of tasks inside a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskList {
    pub fn new(name: String) -> Self {
        Self {
            id: new_id(),
            name,
            tasks: Vec::new(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Number of tasks still open
    pub fn open_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }
}

/// A named folder of lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default = "default_folder_emoji")]
    pub emoji: String,
    #[serde(default)]
    pub lists: Vec<TaskList>,
}

impl Folder {
    /// Create a folder; an empty emoji falls back to the default glyph
    pub fn new(name: String, emoji: Option<String>) -> Self {
        Self {
            id: new_id(),
            name,
            emoji: emoji_or_default(emoji),
            lists: Vec::new(),
        }
    }

    pub fn list(&self, id: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn list_mut(&mut self, id: &str) -> Option<&mut TaskList> {
        self.lists.iter_mut().find(|l| l.id == id)
    }

    pub fn task_count(&self) -> usize {
        self.lists.iter().map(|l| l.tasks.len()).sum()
    }
}

/// A user profile and everything it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default = "default_user_image")]
    pub image: String,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

impl User {
    pub fn new(name: String, image: Option<String>) -> Self {
        let image = image
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(default_user_image);

        Self {
            id: new_id(),
            name,
            image,
            folders: Vec::new(),
        }
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn folder_mut(&mut self, id: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.id == id)
    }

    /// Find a task anywhere in this user's subtree
    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.folders
            .iter()
            .flat_map(|f| f.lists.iter())
            .find_map(|l| l.task(id))
    }

    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.folders
            .iter_mut()
            .flat_map(|f| f.lists.iter_mut())
            .find_map(|l| l.task_mut(id))
    }

    /// Find a list anywhere in this user's subtree
    pub fn find_list_mut(&mut self, id: &str) -> Option<&mut TaskList> {
        self.folders
            .iter_mut()
            .find_map(|f| f.list_mut(id))
    }

    /// Whether any folder, list or task under this user carries `id`
    #[cfg(test)]
    pub fn contains_id(&self, id: &str) -> bool {
        self.folders.iter().any(|f| {
            f.id == id
                || f.lists
                    .iter()
                    .any(|l| l.id == id || l.tasks.iter().any(|t| t.id == id))
        })
    }
}

/// Normalize an emoji argument, falling back to the folder glyph when empty
pub fn emoji_or_default(emoji: Option<String>) -> String {
    emoji
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(default_folder_emoji)
}
