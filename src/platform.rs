// TabSnooze platform paths
// Resolves per-user directories through `dirs`, so each OS gets its native
// location (XDG on Linux, Application Support on macOS, AppData on Windows).

use std::path::PathBuf;

const APP_DIR: &str = "tabsnooze";

/// Returns the data directory holding the SQLite store.
///
/// Falls back to the current directory when the platform has no data dir.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
