mod scope;

use serde::{Deserialize, Serialize};

pub use scope::{ROOT_SCOPE, ScopeId, ScopeNode, ScopeTree, split_path};

/// One billable interaction, as stored in `events.tsv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub ts_epoch: i64,
    pub ts_iso: String,
    pub project_slug: String,
    pub session_id: String,
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_create: u64,
    pub billable: u64,
    pub total_with_cache: u64,
    pub content_type: String,
    pub signature: String,
}

impl UsageEvent {
    /// Cache tokens of both kinds.
    pub fn cached(&self) -> u64 {
        self.cache_read.saturating_add(self.cache_create)
    }

    pub fn metric(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Billable => self.billable,
            Metric::Input => self.input,
            Metric::Output => self.output,
            Metric::CacheRead => self.cache_read,
            Metric::CacheCreate => self.cache_create,
            Metric::Cached => self.cached(),
            Metric::TotalWithCache => self.total_with_cache,
        }
    }
}

/// A recent event with the preview of the prompt that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveUsageEvent {
    #[serde(flatten)]
    pub event: UsageEvent,
    pub prompt_preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub slug: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub last_sync_epoch: i64,
    pub last_sync_iso: String,
    #[serde(default)]
    pub sessions_synced: u64,
    #[serde(default)]
    pub events_written: u64,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_events_written: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
}

/// Account metadata fetched by the sync; never aggregated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

impl AccountInfo {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.member_id.is_none() && self.organization.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiContext {
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Half-open `[start, end)` interval in epoch seconds. A missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(start: i64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn between(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, ts: i64) -> bool {
        if let Some(start) = self.start
            && ts < start
        {
            return false;
        }
        if let Some(end) = self.end
            && ts >= end
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Billable,
    Input,
    Output,
    CacheRead,
    CacheCreate,
    Cached,
    TotalWithCache,
}

impl Metric {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "billable" => Some(Self::Billable),
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            "cache_read" => Some(Self::CacheRead),
            "cache_create" => Some(Self::CacheCreate),
            "cached" => Some(Self::Cached),
            "total" | "total_with_cache" => Some(Self::TotalWithCache),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billable => "billable",
            Self::Input => "input",
            Self::Output => "output",
            Self::CacheRead => "cache_read",
            Self::CacheCreate => "cache_create",
            Self::Cached => "cached",
            Self::TotalWithCache => "total_with_cache",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphMode {
    #[default]
    Single,
    InOut,
}

impl GraphMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "single" | "metric" => Some(Self::Single),
            "in_out" => Some(Self::InOut),
            _ => None,
        }
    }
}

/// Exact integer sums over a set of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub events: u64,
    pub billable: u64,
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_create: u64,
    pub cached: u64,
    pub total_with_cache: u64,
}

impl UsageTotals {
    pub fn add(&mut self, event: &UsageEvent) {
        self.events += 1;
        self.billable = self.billable.saturating_add(event.billable);
        self.input = self.input.saturating_add(event.input);
        self.output = self.output.saturating_add(event.output);
        self.cache_read = self.cache_read.saturating_add(event.cache_read);
        self.cache_create = self.cache_create.saturating_add(event.cache_create);
        self.cached = self.cached.saturating_add(event.cached());
        self.total_with_cache = self.total_with_cache.saturating_add(event.total_with_cache);
    }

    pub fn merge(&mut self, other: &UsageTotals) {
        self.events += other.events;
        self.billable = self.billable.saturating_add(other.billable);
        self.input = self.input.saturating_add(other.input);
        self.output = self.output.saturating_add(other.output);
        self.cache_read = self.cache_read.saturating_add(other.cache_read);
        self.cache_create = self.cache_create.saturating_add(other.cache_create);
        self.cached = self.cached.saturating_add(other.cached);
        self.total_with_cache = self.total_with_cache.saturating_add(other.total_with_cache);
    }

    pub fn is_empty(&self) -> bool {
        self.events == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub key: String,
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardsSummary {
    pub range: TimeRange,
    pub scope: String,
    pub totals: UsageTotals,
    pub cards: Vec<Card>,
    pub no_data: bool,
    pub skipped_records: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub bucket_start: i64,
    pub bucket_iso: String,
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub metric: Metric,
    pub mode: GraphMode,
    pub bucket_seconds: i64,
    pub points: Vec<TimeSeriesPoint>,
    pub no_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBreakdown {
    pub slug: String,
    pub path: Option<String>,
    pub totals: UsageTotals,
}
