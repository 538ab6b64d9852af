use std::collections::{HashMap, HashSet};
use std::{any::type_name_of_val, fmt, sync::Arc};

use chrono::NaiveDate;
use movierang_model::{BoxOfficeEntry, MovieIdentity};
use tracing::{debug, info, warn};

use super::scoring::{closest_by_release_year, normalize_title};
use crate::box_office::{BoxOfficeSource, DailyBoard, DailyBoxOffice};
use crate::database::ports::CatalogRepository;
use crate::error::Result;

/// Feed title to matched catalog record. Unmatched titles are absent.
pub type ReconciledTitles = HashMap<String, MovieIdentity>;

/// Matches box-office entries to canonical catalog records.
pub struct Reconciler<C>
where
    C: CatalogRepository + ?Sized,
{
    catalog: Arc<C>,
}

impl<C> Clone for Reconciler<C>
where
    C: CatalogRepository + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<C> fmt::Debug for Reconciler<C>
where
    C: CatalogRepository + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("catalog", &type_name_of_val(self.catalog.as_ref()))
            .finish()
    }
}

impl<C> Reconciler<C>
where
    C: CatalogRepository + ?Sized,
{
    pub fn new(catalog: Arc<C>) -> Self {
        Self { catalog }
    }

    /// Map each distinct entry title to its catalog record.
    ///
    /// Never fails: titles without a match are left out, and a failed
    /// lookup is logged and treated as a phase with no candidates. When the
    /// feed repeats a title, the first entry's open date is used.
    pub async fn reconcile(&self, entries: &[BoxOfficeEntry]) -> ReconciledTitles {
        let mut open_dates: HashMap<&str, Option<NaiveDate>> = HashMap::new();
        let mut titles: Vec<&str> = Vec::new();
        for entry in entries {
            if !open_dates.contains_key(entry.title.as_str()) {
                open_dates.insert(entry.title.as_str(), entry.open_date);
                titles.push(entry.title.as_str());
            }
        }

        let mut matched = ReconciledTitles::with_capacity(titles.len());
        if titles.is_empty() {
            return matched;
        }

        let requested: HashSet<String> = titles.iter().map(|title| title.to_string()).collect();
        let exact = match self.catalog.find_by_exact_titles(&requested).await {
            Ok(movies) => movies,
            Err(err) => {
                warn!(%err, "exact title lookup failed; falling back to alternate titles");
                Vec::new()
            }
        };

        let mut by_title: HashMap<&str, Vec<&MovieIdentity>> = HashMap::new();
        for movie in &exact {
            by_title.entry(movie.title.as_str()).or_default().push(movie);
        }

        for title in &titles {
            let Some(candidates) = by_title.get(title) else {
                continue;
            };
            let open_date = open_dates[title];
            if candidates.len() > 1 {
                debug!(
                    title,
                    candidates = candidates.len(),
                    ?open_date,
                    "duplicate exact titles; ranking by release year"
                );
            }
            if let Some(best) = closest_by_release_year(candidates.iter().copied(), open_date) {
                matched.insert(title.to_string(), best.clone());
            }
        }

        debug!(
            exact = matched.len(),
            total = titles.len(),
            "exact title pass complete"
        );

        for title in &titles {
            if matched.contains_key(*title) {
                continue;
            }
            match self.match_alternate_title(title, open_dates[title]).await {
                Some(movie) => {
                    matched.insert(title.to_string(), movie);
                }
                None => warn!(title, "no catalog match for box office title"),
            }
        }

        info!(
            matched = matched.len(),
            total = titles.len(),
            "box office reconciliation complete"
        );
        matched
    }

    /// Reconcile a decoded feed and pair every entry with its match.
    pub async fn daily_board(&self, feed: DailyBoxOffice) -> DailyBoard {
        let matched = self.reconcile(&feed.entries).await;
        DailyBoard::assemble(feed, &matched)
    }

    /// Pull the feed for `target` from `source` and build its board. Feed
    /// retrieval errors propagate; reconciliation misses do not.
    pub async fn refresh<S>(&self, source: &S, target: NaiveDate) -> Result<DailyBoard>
    where
        S: BoxOfficeSource + ?Sized,
    {
        let feed = source.daily(target).await?;
        info!(
            %target,
            entries = feed.entries.len(),
            "box office feed loaded"
        );
        Ok(self.daily_board(feed).await)
    }

    async fn match_alternate_title(
        &self,
        title: &str,
        open_date: Option<NaiveDate>,
    ) -> Option<MovieIdentity> {
        let normalized = normalize_title(title);
        if normalized.is_empty() {
            return None;
        }

        let candidates = match self
            .catalog
            .find_by_alternate_title_contains(&normalized)
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(%err, title, "alternate title lookup failed");
                return None;
            }
        };

        let best = closest_by_release_year(&candidates, open_date)?.clone();
        debug!(
            title,
            normalized = %normalized,
            movie_id = %best.id,
            candidates = candidates.len(),
            "matched via alternate titles"
        );
        Some(best)
    }
}
