use chrono::{Datelike, NaiveDate};
use movierang_model::{MovieIdentity, ReleaseDate};

/// Distance assigned when a candidate's release year (or the entry's open
/// date) is unknown. Larger than any real distance, so such a candidate only
/// wins when it has no competition.
pub const UNKNOWN_YEAR_DISTANCE: u32 = u32::MAX;

/// Absolute distance in years between a catalog release date and a feed
/// open date.
pub fn year_distance(release_date: Option<&str>, open_date: Option<NaiveDate>) -> u32 {
    let (Some(release_year), Some(open_date)) =
        (release_date.and_then(|raw| ReleaseDate::new(raw).year()), open_date)
    else {
        return UNKNOWN_YEAR_DISTANCE;
    };

    release_year.abs_diff(open_date.year())
}

/// The candidate released closest to `open_date`. Equal distances go to the
/// lowest internal id, independent of the order candidates arrive in.
pub fn closest_by_release_year<'a, I>(
    candidates: I,
    open_date: Option<NaiveDate>,
) -> Option<&'a MovieIdentity>
where
    I: IntoIterator<Item = &'a MovieIdentity>,
{
    candidates.into_iter().min_by_key(|candidate| {
        (
            year_distance(candidate.release_date.as_deref(), open_date),
            candidate.id,
        )
    })
}

/// Feed title with every whitespace character removed.
pub fn normalize_title(title: &str) -> String {
    title.chars().filter(|c| !c.is_whitespace()).collect()
}
