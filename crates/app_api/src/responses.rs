use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StartedResponse {
    pub started: bool,
}
