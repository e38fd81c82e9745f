use std::path::PathBuf;

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// `~/.claude/projects`, where session logs live.
pub fn default_source_dir() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".claude").join("projects"),
        None => PathBuf::from(".claude/projects"),
    }
}

pub fn default_account_file() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".claude.json"))
}
