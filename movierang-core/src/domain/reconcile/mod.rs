//! Box-office to catalog reconciliation.
//!
//! Feed titles are untrusted free text, so matching runs in two phases:
//! one batched exact-title lookup, then a whitespace-insensitive search of
//! the catalog's alternate-titles field for whatever is still unmatched.
//! Duplicate candidates are ranked by release-year distance to the feed's
//! open date. Scoring lives in [`scoring`] and performs no I/O.

mod engine;
pub mod scoring;

pub use engine::{ReconciledTitles, Reconciler};
pub use scoring::{UNKNOWN_YEAR_DISTANCE, closest_by_release_year, normalize_title, year_distance};
