//! JSON document format shared by the durable store and file import/export.
//!
//! Users are encoded with camelCase keys. `dueDate` is the only field carrying a point in
//! time and is handled by [`due_date`], so it round-trips as a timestamp rather than text.

use crate::domain::{EntityKind, User};
use crate::error::CodecError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;

/// Serde adapter for the `dueDate` field.
///
/// Encodes as RFC 3339 UTC with millisecond precision (`2024-05-01T10:00:00.000Z`).
/// Decoding accepts any RFC 3339 offset; `null` and `""` mean no due date.
pub mod due_date {
    use crate::domain::entities::truncate_due_date;
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(due) => serializer.serialize_str(&super::encode_due_date(due)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|due| truncate_due_date(Some(due.with_timezone(&Utc))))
                .map_err(|_| de::Error::custom(format!("invalid dueDate `{}`", text))),
        }
    }
}

/// Canonical text form of a due date
pub fn encode_due_date(due: &DateTime<Utc>) -> String {
    due.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A parsed import document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDocument {
    /// Top-level array: replaces the whole user collection
    Collection(Vec<User>),
    /// Top-level object: one user appended to the collection
    Single(User),
}

/// Parse an import document without touching any existing state
pub fn parse_document(text: &str) -> Result<ImportDocument, CodecError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.is_array() {
        let users: Vec<User> = serde_json::from_value(value)?;
        check_unique_ids(&users)?;
        Ok(ImportDocument::Collection(users))
    } else {
        let user: User = serde_json::from_value(value)?;
        check_user_subtree(&user)?;
        Ok(ImportDocument::Single(user))
    }
}

fn unique_within<'a>(kind: EntityKind, ids: impl Iterator<Item = &'a str>) -> Result<(), CodecError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CodecError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Ids must be unique inside each containing collection
fn check_user_subtree(user: &User) -> Result<(), CodecError> {
    unique_within(EntityKind::Folder, user.folders.iter().map(|f| f.id.as_str()))?;
    for folder in &user.folders {
        unique_within(EntityKind::List, folder.lists.iter().map(|l| l.id.as_str()))?;
        for list in &folder.lists {
            unique_within(EntityKind::Task, list.tasks.iter().map(|t| t.id.as_str()))?;
        }
    }
    Ok(())
}

fn check_unique_ids(users: &[User]) -> Result<(), CodecError> {
    unique_within(EntityKind::User, users.iter().map(|u| u.id.as_str()))?;
    users.iter().try_for_each(check_user_subtree)
}

/// Decode the persisted user collection
pub fn decode_users(text: &str) -> Result<Vec<User>, CodecError> {
    let users: Vec<User> = serde_json::from_str(text)?;
    check_unique_ids(&users)?;
    Ok(users)
}

/// Encode the user collection for the durable store
pub fn encode_users(users: &[User]) -> Result<String, CodecError> {
    Ok(serde_json::to_string(users)?)
}

/// Export a single user's subtree as a document
pub fn export_user(users: &[User], user_id: &str) -> Result<String, CodecError> {
    let user = users
        .iter()
        .find(|u| u.id == user_id)
        .ok_or_else(|| CodecError::UnknownUser(user_id.to_string()))?;
    Ok(serde_json::to_string_pretty(user)?)
}

/// Export every user as an array document
pub fn export_all(users: &[User]) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(users)?)
}

/// Default file name for an export
pub fn export_file_name(user_id: Option<&str>) -> String {
    match user_id {
        Some(id) => format!("task_manager_user_{}.json", id),
        None => "task_manager_all_users.json".to_string(),
    }
}
