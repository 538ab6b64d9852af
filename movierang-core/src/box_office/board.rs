use movierang_model::{BoxOfficeEntry, MovieIdentity};
use serde::Serialize;

use super::DailyBoxOffice;
use crate::domain::reconcile::ReconciledTitles;

/// Feed entry paired with the catalog record it reconciled to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardRow {
    pub entry: BoxOfficeEntry,
    /// `None` when the catalog has no local data for the title.
    pub movie: Option<MovieIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBoard {
    pub box_office_type: String,
    pub show_range: String,
    pub rows: Vec<BoardRow>,
}

impl DailyBoard {
    /// Pair every entry, in feed order, with its match from `matched`.
    pub fn assemble(feed: DailyBoxOffice, matched: &ReconciledTitles) -> Self {
        let rows = feed
            .entries
            .into_iter()
            .map(|entry| {
                let movie = matched.get(&entry.title).cloned();
                BoardRow { entry, movie }
            })
            .collect();

        Self {
            box_office_type: feed.box_office_type,
            show_range: feed.show_range,
            rows,
        }
    }

    pub fn matched_count(&self) -> usize {
        self.rows.iter().filter(|row| row.movie.is_some()).count()
    }
}
