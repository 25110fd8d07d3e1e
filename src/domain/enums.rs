use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display bucket for a task's due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DueBucket {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    Later,
    NoDueDate,
}

impl DueBucket {
    /// Buckets in display order
    pub fn all() -> &'static [DueBucket] {
        &[
            DueBucket::Overdue,
            DueBucket::Today,
            DueBucket::Tomorrow,
            DueBucket::ThisWeek,
            DueBucket::Later,
            DueBucket::NoDueDate,
        ]
    }

    /// Heading shown above the bucket
    pub fn label(&self) -> &'static str {
        match self {
            DueBucket::Overdue => "Overdue",
            DueBucket::Today => "Today",
            DueBucket::Tomorrow => "Tomorrow",
            DueBucket::ThisWeek => "This Week",
            DueBucket::Later => "Later",
            DueBucket::NoDueDate => "No Due Date",
        }
    }
}

/// Display theme, persisted under the `theme` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme `{}`; expected light|dark", other)),
        }
    }
}

/// Kind of entity, used in error messages and log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Folder,
    List,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Folder => "folder",
            EntityKind::List => "list",
            EntityKind::Task => "task",
        };
        f.write_str(name)
    }
}
