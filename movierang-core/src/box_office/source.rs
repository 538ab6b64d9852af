use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::DailyBoxOffice;
use super::kobis::KobisDailyResponse;
use crate::error::Result;

/// Provider of the daily ranked feed.
#[async_trait]
pub trait BoxOfficeSource: Send + Sync {
    async fn daily(&self, target: NaiveDate) -> Result<DailyBoxOffice>;
}

/// Serves a KOBIS daily document saved on disk, whatever the target date.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BoxOfficeSource for JsonFileSource {
    async fn daily(&self, _target: NaiveDate) -> Result<DailyBoxOffice> {
        let raw = tokio::fs::read(&self.path).await?;
        let response: KobisDailyResponse = serde_json::from_slice(&raw)?;
        response.into_daily()
    }
}
