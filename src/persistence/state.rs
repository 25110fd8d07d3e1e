use super::codec::{decode_users, encode_users};
use super::local_store::{LocalStore, CURRENT_USER_KEY, SELECTION_KEY, THEME_KEY, USERS_KEY};
use crate::domain::{Selection, Theme, User};
use anyhow::Result;
use log::warn;

/// Everything restored from the durable store at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub users: Vec<User>,
    pub current_user: Option<String>,
    pub theme: Theme,
    pub selection: Selection,
}

/// Load persisted state.
///
/// Each key loads on its own; a missing, unreadable or corrupt key falls back to its
/// default so startup never fails on stored content.
pub fn load_state(store: &LocalStore) -> PersistedState {
    let users = match store.get(USERS_KEY) {
        Ok(Some(text)) => decode_users(&text).unwrap_or_else(|e| {
            warn!("event=state_load module=persistence status=error key={} error={}", USERS_KEY, e);
            match store.quarantine(USERS_KEY) {
                Ok(path) => warn!(
                    "event=state_quarantine module=persistence status=ok key={} path={}",
                    USERS_KEY,
                    path.display()
                ),
                Err(e) => warn!(
                    "event=state_quarantine module=persistence status=error key={} error={:#}",
                    USERS_KEY, e
                ),
            }
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("event=state_load module=persistence status=error key={} error={:#}", USERS_KEY, e);
            Vec::new()
        }
    };

    let theme = match store.get(THEME_KEY) {
        Ok(Some(text)) => text.parse::<Theme>().unwrap_or_else(|e| {
            warn!("event=state_load module=persistence status=error key={} error={}", THEME_KEY, e);
            Theme::default()
        }),
        Ok(None) => Theme::default(),
        Err(e) => {
            warn!("event=state_load module=persistence status=error key={} error={:#}", THEME_KEY, e);
            Theme::default()
        }
    };

    let current_user = match store.get(CURRENT_USER_KEY) {
        Ok(value) => value
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()),
        Err(e) => {
            warn!("event=state_load module=persistence status=error key={} error={:#}", CURRENT_USER_KEY, e);
            None
        }
    };

    let selection = match store.get(SELECTION_KEY) {
        Ok(Some(text)) => serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("event=state_load module=persistence status=error key={} error={}", SELECTION_KEY, e);
            Selection::default()
        }),
        Ok(None) => Selection::default(),
        Err(e) => {
            warn!("event=state_load module=persistence status=error key={} error={:#}", SELECTION_KEY, e);
            Selection::default()
        }
    };

    PersistedState {
        users,
        current_user,
        theme,
        selection,
    }
}

/// Save the user collection
pub fn save_users(store: &LocalStore, users: &[User]) -> Result<()> {
    let text = encode_users(users)?;
    store.set(USERS_KEY, &text)
}

/// Save the theme
pub fn save_theme(store: &LocalStore, theme: Theme) -> Result<()> {
    store.set(THEME_KEY, theme.as_str())
}

/// Save the current user id; `None` clears the key
pub fn save_current_user(store: &LocalStore, user_id: Option<&str>) -> Result<()> {
    match user_id {
        Some(id) => store.set(CURRENT_USER_KEY, id),
        None => store.remove(CURRENT_USER_KEY),
    }
}

/// Save the folder/list selection
pub fn save_selection(store: &LocalStore, selection: &Selection) -> Result<()> {
    let text = serde_json::to_string(selection)?;
    store.set(SELECTION_KEY, &text)
}
