//! Read-only view over the catalog's `YYYYMMDD` release-date strings.
//!
//! The catalog stores dates as text, marks an unknown day with `"00"` and
//! occasionally ships only a year. Only the year is ever read.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseDate<'a> {
    raw: &'a str,
}

impl<'a> ReleaseDate<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// Year parsed from the first four characters.
    pub fn year(&self) -> Option<i32> {
        self.raw.get(..4)?.parse().ok()
    }
}
