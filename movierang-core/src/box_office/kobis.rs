//! Wire format of the KOBIS daily box-office API.
//!
//! KOBIS sends every numeric as a JSON string, so the raw structs keep them
//! as strings and [`KobisDailyResponse::into_daily`] does the parsing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use movierang_model::{BoxOfficeEntry, BoxOfficeMetrics};
use serde::Deserialize;
use tracing::debug;

use super::DailyBoxOffice;
use crate::error::{MovieError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KobisDailyResponse {
    pub box_office_result: KobisBoxOfficeResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KobisBoxOfficeResult {
    #[serde(rename = "boxofficeType", default)]
    pub box_office_type: String,
    #[serde(rename = "showRange", default)]
    pub show_range: String,
    #[serde(rename = "dailyBoxOfficeList", default)]
    pub daily_box_office_list: Vec<KobisDailyItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KobisDailyItem {
    pub rank: String,
    pub rank_inten: Option<String>,
    pub rank_old_and_new: Option<String>,
    pub movie_cd: String,
    pub movie_nm: String,
    pub open_dt: Option<String>,
    pub sales_amt: Option<String>,
    pub sales_acc: Option<String>,
    pub audi_cnt: Option<String>,
    pub audi_acc: Option<String>,
}

impl KobisDailyResponse {
    /// Convert to the domain feed. Entries are ordered by rank; a repeated
    /// rank keeps its first occurrence.
    pub fn into_daily(self) -> Result<DailyBoxOffice> {
        let result = self.box_office_result;

        let mut by_rank = BTreeMap::new();
        for item in result.daily_box_office_list {
            let entry = item.into_entry()?;
            if by_rank.contains_key(&entry.rank) {
                debug!(rank = entry.rank, title = %entry.title, "dropping duplicate rank");
                continue;
            }
            by_rank.insert(entry.rank, entry);
        }

        Ok(DailyBoxOffice {
            box_office_type: result.box_office_type,
            show_range: display_show_range(&result.show_range),
            entries: by_rank.into_values().collect(),
        })
    }
}

impl KobisDailyItem {
    fn into_entry(self) -> Result<BoxOfficeEntry> {
        let rank: u32 = self.rank.trim().parse().map_err(|e| {
            MovieError::InvalidFeed(format!(
                "rank {:?} for {:?} is not a number: {e}",
                self.rank, self.movie_nm
            ))
        })?;

        let metrics = BoxOfficeMetrics {
            sales_amount: parse_amount(self.sales_amt.as_deref()),
            sales_accumulated: parse_amount(self.sales_acc.as_deref()),
            audience_count: parse_amount(self.audi_cnt.as_deref()),
            audience_accumulated: parse_amount(self.audi_acc.as_deref()),
            rank_change: self
                .rank_inten
                .as_deref()
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(0),
            is_new: self.rank_old_and_new.as_deref() == Some("NEW"),
        };

        Ok(BoxOfficeEntry {
            rank,
            movie_code: self.movie_cd,
            title: self.movie_nm,
            open_date: self.open_dt.as_deref().and_then(parse_open_date),
            metrics,
        })
    }
}

fn parse_amount(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

/// `YYYY-MM-DD` or `YYYYMMDD`; anything else (including blank) is unknown.
pub fn parse_open_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

/// First day of the range in ISO form: `20251110~20251110` becomes
/// `2025-11-10`. Unparseable values are passed through unchanged.
pub fn display_show_range(raw: &str) -> String {
    let start = raw.split_once('~').map_or(raw, |(start, _)| start).trim();
    match NaiveDate::parse_from_str(start, "%Y%m%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}
