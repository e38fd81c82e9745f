use std::path::PathBuf;

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// `~/dev/.claude-usage`, where the dashboard has always read its files.
pub fn default_data_dir() -> PathBuf {
    match home_dir() {
        Some(home) => home.join("dev").join(".claude-usage"),
        None => PathBuf::from(".claude-usage"),
    }
}
