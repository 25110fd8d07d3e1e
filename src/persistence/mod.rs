pub mod codec;
pub mod files;
pub mod local_store;
pub mod state;

pub use codec::{export_all, export_file_name, export_user, parse_document, ImportDocument};
pub use files::{atomic_write, get_data_dir, init_local_data_dir, log_dir, read_file};
pub use local_store::LocalStore;
pub use state::{load_state, save_current_user, save_selection, save_theme, save_users};
