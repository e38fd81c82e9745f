//! Liveness line for the sync loop: `epoch,interval,pid,status`.

use std::fs;

use jevons_store::{DataPaths, write_atomic};
use serde::Serialize;

use crate::error::Result;

const MIN_STALE_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatStatus {
    Working,
    Ok,
    Error,
}

impl HeartbeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "working" => Some(Self::Working),
            "ok" => Some(Self::Ok),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatMode {
    Running,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatState {
    pub mode: HeartbeatMode,
    pub epoch: i64,
    pub interval: u64,
    pub pid: u32,
    pub age_secs: i64,
    pub status: HeartbeatStatus,
    pub raw: String,
}

pub fn parse_heartbeat(line: &str, now: i64) -> Option<HeartbeatState> {
    let raw = line.trim();
    let mut parts = raw.split(',');
    let epoch = parts.next()?.trim().parse::<i64>().ok()?;
    let interval = parts.next()?.trim().parse::<u64>().ok()?;
    let pid = parts.next()?.trim().parse::<u32>().ok()?;
    let status = HeartbeatStatus::parse(parts.next()?.trim())?;
    let age_secs = (now - epoch).max(0);
    let threshold = (interval as i64).saturating_mul(12).max(MIN_STALE_SECS);
    let mode = if interval > 0 && age_secs <= threshold {
        HeartbeatMode::Running
    } else {
        HeartbeatMode::Stale
    };
    Some(HeartbeatState {
        mode,
        epoch,
        interval,
        pid,
        age_secs,
        status,
        raw: raw.to_string(),
    })
}

pub fn read_heartbeat(paths: &DataPaths, now: i64) -> Option<HeartbeatState> {
    let body = fs::read_to_string(paths.sync_heartbeat()).ok()?;
    parse_heartbeat(body.lines().next()?, now)
}

pub fn write_heartbeat(
    paths: &DataPaths,
    now: i64,
    interval: u64,
    status: HeartbeatStatus,
) -> Result<()> {
    let line = format!(
        "{},{},{},{}\n",
        now,
        interval,
        std::process::id(),
        status.as_str()
    );
    write_atomic(&paths.sync_heartbeat(), line.as_bytes())?;
    Ok(())
}

pub fn write_pid_file(paths: &DataPaths) -> Result<()> {
    write_atomic(
        &paths.sync_pid(),
        format!("{}\n", std::process::id()).as_bytes(),
    )?;
    Ok(())
}

pub fn remove_pid_file(paths: &DataPaths) {
    let _ = fs::remove_file(paths.sync_pid());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_heartbeat_is_running() {
        let state = parse_heartbeat("1000,15,42,ok\n", 1_100).expect("parse");
        assert_eq!(state.mode, HeartbeatMode::Running);
        assert_eq!(state.age_secs, 100);
        assert_eq!(state.pid, 42);
        assert_eq!(state.status, HeartbeatStatus::Ok);
    }

    #[test]
    fn stale_after_twelve_intervals_with_floor() {
        assert_eq!(
            parse_heartbeat("1000,15,1,ok", 1_000 + 300).expect("parse").mode,
            HeartbeatMode::Running
        );
        assert_eq!(
            parse_heartbeat("1000,15,1,ok", 1_000 + 301).expect("parse").mode,
            HeartbeatMode::Stale
        );
        assert_eq!(
            parse_heartbeat("1000,60,1,ok", 1_000 + 720).expect("parse").mode,
            HeartbeatMode::Running
        );
        assert_eq!(
            parse_heartbeat("1000,0,1,ok", 1_000).expect("parse").mode,
            HeartbeatMode::Stale
        );
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_heartbeat("", 0).is_none());
        assert!(parse_heartbeat("1,2,3,sleeping", 0).is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = DataPaths::new(dir.path());
        write_heartbeat(&paths, 500, 15, HeartbeatStatus::Working).expect("write");
        let state = read_heartbeat(&paths, 510).expect("read");
        assert_eq!(state.status, HeartbeatStatus::Working);
        assert_eq!(state.pid, std::process::id());
        write_pid_file(&paths).expect("pid");
        assert!(paths.sync_pid().exists());
        remove_pid_file(&paths);
        assert!(!paths.sync_pid().exists());
    }
}
