use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Deserialize, Default)]
pub struct ListParams {
    #[serde(default)]
    pub draft: bool,
}

#[derive(Deserialize, Default)]
pub struct PostParams {
    #[serde(default)]
    pub preview: bool,
}

#[derive(Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub now: DateTime<Utc>,
    pub tags: Vec<String>,
    pub paths: Vec<String>,
}

#[derive(Serialize)]
pub struct RevalidateInfo {
    pub message: String,
    pub method: String,
    pub header: String,
    pub last_revalidated_at: Option<DateTime<Utc>>,
}
