mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::NaiveDate;
use movierang_core::box_office::{BoxOfficeSource, DailyBoxOffice, JsonFileSource};
use movierang_core::domain::reconcile::Reconciler;
use movierang_model::{BoxOfficeEntry, MovieId};

use support::{FailingCatalog, movie, store_with};

fn entry(rank: u32, title: &str, open: (i32, u32, u32)) -> BoxOfficeEntry {
    BoxOfficeEntry::new(rank, title, NaiveDate::from_ymd_opt(open.0, open.1, open.2))
}

#[tokio::test]
async fn duplicate_exact_titles_resolve_to_closest_release_year() {
    let store = store_with([movie(1, "A", "19990312"), movie(2, "A", "20240500")]);
    let reconciler = Reconciler::new(store);

    let matched = reconciler.reconcile(&[entry(1, "A", (2024, 5, 1))]).await;

    assert_eq!(matched.len(), 1);
    assert_eq!(matched["A"].id, MovieId(2));
}

#[tokio::test]
async fn alternate_title_matches_after_whitespace_removal() {
    let store = store_with([
        movie(7, "무비 비", "20230101").with_alternate_titles("MovieB|The B Movie"),
        movie(8, "Unrelated", "20230101").with_alternate_titles("Other"),
    ]);
    let reconciler = Reconciler::new(store);

    let matched = reconciler.reconcile(&[entry(3, "Movie B", (2023, 6, 1))]).await;

    assert_eq!(matched.get("Movie B").map(|m| m.id), Some(MovieId(7)));
}

#[tokio::test]
async fn alternate_candidates_are_ranked_by_year_distance() {
    let store = store_with([
        movie(3, "Batman 1989", "19890623").with_alternate_titles("TheBatman"),
        movie(4, "Batman 2022", "20220301").with_alternate_titles("TheBatman"),
    ]);
    let reconciler = Reconciler::new(store);

    let matched = reconciler
        .reconcile(&[entry(1, "The Batman", (2022, 3, 1))])
        .await;

    assert_eq!(matched["The Batman"].id, MovieId(4));
}

#[tokio::test]
async fn unmatched_titles_are_absent() {
    let store = store_with([movie(1, "Known", "20200101")]);
    let reconciler = Reconciler::new(store);

    let matched = reconciler
        .reconcile(&[entry(1, "Known", (2020, 1, 1)), entry(2, "Nowhere", (2020, 1, 1))])
        .await;

    assert_eq!(matched.len(), 1);
    assert!(matched.contains_key("Known"));
    assert!(!matched.contains_key("Nowhere"));
}

#[tokio::test]
async fn short_release_date_is_selected_when_it_is_the_only_candidate() {
    let store = store_with([movie(5, "Old Reel", "19")]);
    let reconciler = Reconciler::new(store);

    let matched = reconciler.reconcile(&[entry(1, "Old Reel", (2024, 1, 1))]).await;

    assert_eq!(matched["Old Reel"].id, MovieId(5));
}

#[tokio::test]
async fn equal_distance_prefers_lowest_id() {
    // Inserted out of id order; the store iterates by id but the rule must
    // not rely on that.
    let store = store_with([
        movie(42, "Twin", "20200101"),
        movie(17, "Twin", "20200101"),
        movie(23, "Twin", "20200101"),
    ]);
    let reconciler = Reconciler::new(store);

    let matched = reconciler.reconcile(&[entry(1, "Twin", (2020, 2, 2))]).await;

    assert_eq!(matched["Twin"].id, MovieId(17));
}

#[tokio::test]
async fn missing_open_date_falls_back_to_lowest_id() {
    let store = store_with([movie(9, "Undated", "20100101"), movie(6, "Undated", "20240101")]);
    let reconciler = Reconciler::new(store);

    let matched = reconciler
        .reconcile(&[BoxOfficeEntry::new(1, "Undated", None)])
        .await;

    assert_eq!(matched["Undated"].id, MovieId(6));
}

#[tokio::test]
async fn lookup_failures_leave_titles_unmatched() {
    let catalog = Arc::new(FailingCatalog::default());
    let reconciler = Reconciler::new(catalog.clone());

    let matched = reconciler
        .reconcile(&[entry(1, "A", (2024, 1, 1)), entry(2, "B", (2024, 1, 1))])
        .await;

    assert!(matched.is_empty());
    // One exact batch plus one alternate lookup per title.
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn whitespace_only_title_is_not_searched() {
    let catalog = Arc::new(FailingCatalog::default());
    let reconciler = Reconciler::new(catalog.clone());

    let matched = reconciler.reconcile(&[entry(1, "  ", (2024, 1, 1))]).await;

    assert!(matched.is_empty());
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_feed_issues_no_lookups() {
    let catalog = Arc::new(FailingCatalog::default());
    let reconciler = Reconciler::new(catalog.clone());

    assert!(reconciler.reconcile(&[]).await.is_empty());
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn daily_board_pairs_entries_in_rank_order() {
    let store = store_with([movie(1, "퍼스트 라이드", "20251029")]);
    let reconciler = Reconciler::new(store);
    let feed = DailyBoxOffice {
        box_office_type: "일별 박스오피스".into(),
        show_range: "2025-11-10".into(),
        entries: vec![
            entry(1, "프레데터: 죽음의 땅", (2025, 11, 5)),
            entry(2, "퍼스트 라이드", (2025, 10, 29)),
        ],
    };

    let board = reconciler.daily_board(feed).await;

    assert_eq!(board.rows.len(), 2);
    assert!(board.rows[0].movie.is_none());
    assert_eq!(board.rows[1].movie.as_ref().map(|m| m.id), Some(MovieId(1)));
}

#[tokio::test]
async fn refresh_reads_a_saved_kobis_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("daily.json");
    std::fs::write(
        &path,
        r#"{
            "boxOfficeResult": {
                "boxofficeType": "일별 박스오피스",
                "showRange": "20251110~20251110",
                "dailyBoxOfficeList": [
                    { "rank": "1", "movieCd": "20253852", "movieNm": "퍼스트 라이드",
                      "openDt": "2025-10-29", "audiCnt": "12074" }
                ]
            }
        }"#,
    )?;

    let source = JsonFileSource::new(&path);
    let target = NaiveDate::from_ymd_opt(2025, 11, 10).expect("valid date");
    assert_eq!(source.daily(target).await?.entries.len(), 1);

    let reconciler = Reconciler::new(store_with([movie(1, "퍼스트 라이드", "20251029")]));
    let board = reconciler.refresh(&source, target).await?;

    assert_eq!(board.show_range, "2025-11-10");
    assert_eq!(board.matched_count(), 1);
    assert_eq!(board.rows[0].entry.metrics.audience_count, 12_074);
    Ok(())
}
