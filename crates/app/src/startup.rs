use std::fs;

use jevons_store::DataPaths;

use crate::error::Result;

/// Creates the data directory and the bookkeeping directories under it.
pub fn ensure_data_dirs(paths: &DataPaths) -> Result<()> {
    fs::create_dir_all(paths.root())?;
    fs::create_dir_all(paths.heartbeat_dir())?;
    fs::create_dir_all(paths.pids_dir())?;
    fs::create_dir_all(paths.logs_dir())?;
    Ok(())
}
