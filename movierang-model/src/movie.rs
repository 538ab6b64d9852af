use crate::ids::MovieId;

/// Canonical catalog record for a movie.
///
/// Rows are written by the catalog ingestion job and are read-only for
/// everything in this workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovieIdentity {
    pub id: MovieId,
    /// External catalog document id (unique).
    pub doc_id: String,
    /// Primary display title.
    pub title: String,
    pub title_eng: Option<String>,
    /// Catalog aliases, akas and subtitles joined into one searchable field.
    pub alternate_titles: Option<String>,
    /// Representative release date, `YYYYMMDD`. The day may be `"00"`.
    pub release_date: Option<String>,
    pub genre: Option<String>,
    pub poster_url: Option<String>,
}

impl MovieIdentity {
    pub fn new(id: MovieId, doc_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            doc_id: doc_id.into(),
            title: title.into(),
            title_eng: None,
            alternate_titles: None,
            release_date: None,
            genre: None,
            poster_url: None,
        }
    }

    pub fn with_release_date(mut self, release_date: impl Into<String>) -> Self {
        self.release_date = Some(release_date.into());
        self
    }

    pub fn with_alternate_titles(mut self, alternate_titles: impl Into<String>) -> Self {
        self.alternate_titles = Some(alternate_titles.into());
        self
    }
}
