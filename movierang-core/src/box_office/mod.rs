//! Daily box-office feed: decoding, sources and the assembled board.

mod board;
pub mod kobis;
mod source;

use movierang_model::BoxOfficeEntry;

pub use board::{BoardRow, DailyBoard};
pub use source::{BoxOfficeSource, JsonFileSource};

/// One refresh cycle of the feed, ranked and deduplicated by rank.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DailyBoxOffice {
    pub box_office_type: String,
    /// Display form of the covered day, e.g. `2025-11-10`.
    pub show_range: String,
    pub entries: Vec<BoxOfficeEntry>,
}
