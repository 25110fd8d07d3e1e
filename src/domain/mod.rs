pub mod entities;
pub mod enums;
pub mod selection;
pub mod store;
pub mod views;

pub use entities::{Folder, Task, TaskList, User};
pub use enums::{DueBucket, EntityKind, Theme};
pub use selection::Selection;
pub use store::EntityStore;
pub use views::{completion_badge, group_tasks_by_due_date, tree_connector};
