use jevons_app::RangeParams;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct RangeRequest {
    pub range: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub scope: Option<String>,
}

impl RangeRequest {
    pub fn range_params(&self) -> RangeParams {
        RangeParams {
            range: self.range.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SeriesRequest {
    pub range: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub scope: Option<String>,
    pub metric: Option<String>,
    pub mode: Option<String>,
    pub bucket: Option<String>,
}

impl SeriesRequest {
    pub fn range_params(&self) -> RangeParams {
        RangeParams {
            range: self.range.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ScopesRequest {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LiveRequest {
    pub window: Option<String>,
    pub scope: Option<String>,
    pub limit: Option<usize>,
}
