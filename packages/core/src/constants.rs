use std::env;
use std::path::PathBuf;

/// Directory holding Trellis state (~/.trellis).
///
/// HOME is consulted before the platform lookup so tests can redirect
/// all storage with a single env var.
pub fn trellis_dir() -> PathBuf {
    let home = match env::var("HOME") {
        Ok(home) => PathBuf::from(home),
        Err(_) => dirs::home_dir().expect("Unable to get home directory"),
    };
    home.join(".trellis")
}

/// Default SQLite database location (~/.trellis/trellis.db)
pub fn database_file() -> PathBuf {
    trellis_dir().join("trellis.db")
}
