use chrono::NaiveDate;

/// One ranked row of a daily box-office feed.
///
/// Regenerated on every refresh and never persisted. The title is free
/// text from the feed provider and is the only join key available.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxOfficeEntry {
    pub rank: u32,
    /// Feed provider's own movie code. Not a catalog key.
    pub movie_code: String,
    pub title: String,
    pub open_date: Option<NaiveDate>,
    pub metrics: BoxOfficeMetrics,
}

impl BoxOfficeEntry {
    pub fn new(rank: u32, title: impl Into<String>, open_date: Option<NaiveDate>) -> Self {
        Self {
            rank,
            movie_code: String::new(),
            title: title.into(),
            open_date,
            metrics: BoxOfficeMetrics::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxOfficeMetrics {
    /// Gross sales for the day.
    pub sales_amount: u64,
    /// Cumulative gross sales since opening.
    pub sales_accumulated: u64,
    pub audience_count: u64,
    pub audience_accumulated: u64,
    /// Rank movement versus the previous day; positive is an upward move.
    pub rank_change: i32,
    /// Entry is new to the chart today.
    pub is_new: bool,
}
