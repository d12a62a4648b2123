#[path = "common/mod.rs"]
mod common;

use common::*;
use std::fs;
use std::path::Path;
use subpolar::{
    full_text, read_csv, unify_row, Country, DatasetKind, MergeSource, Phase, Post, PostRow, UnifiedRow,
};
use time::macros::datetime;
use time::OffsetDateTime;

fn tagged(id: &str, title: &str, selftext: &str, created: OffsetDateTime, country: Country, phase: Phase) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        selftext: selftext.to_string(),
        created,
        country,
        phase,
        score: 10,
        flair: Some("Politik".to_string()),
        author: "tester".to_string(),
        num_comments: 3,
        upvote_ratio: None,
        permalink: format!("https://reddit.com/r/test/comments/{}/", id),
        url: "https://example.org/article".to_string(),
        subreddit: "test".to_string(),
        is_self: false,
        over_18: false,
    }
}

/// Exporting the same posts twice overwrites rather than appends.
#[test]
fn export_is_idempotent() {
    let dir = tempdir();
    let exporter = collector_in(&dir).exporter();
    let posts = vec![
        tagged("a", "Scholz", "", datetime!(2024-06-20 10:00 UTC), Country::Germany, Phase::During),
        tagged("b", "Fußball", "Tor!", datetime!(2024-06-21 10:00 UTC), Country::Germany, Phase::During),
    ];

    let p1 = exporter.export(Country::Germany, Phase::During, DatasetKind::Raw, &posts).unwrap();
    let p2 = exporter.export(Country::Germany, Phase::During, DatasetKind::Raw, &posts).unwrap();
    assert_eq!(p1, p2);
    assert_eq!(p1, dir.join("raw").join("germany_during.csv"));

    let rows: Vec<PostRow> = read_csv(&p1).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].created, "2024-06-20T10:00:00Z");
    assert_eq!(rows[0].flair, "Politik");
    assert!(rows[0].is_political);
    assert!(!rows[1].is_political);
    assert_eq!(rows[1].full_text, "Fußball Tor!");
    // no staging leftovers
    assert_eq!(fs::read_dir(dir.join("raw")).unwrap().count(), 1);
}

/// An empty collection still produces a header-only file.
#[test]
fn empty_export_writes_header() {
    let dir = tempdir();
    let exporter = collector_in(&dir).exporter();
    let path = exporter.export(Country::France, Phase::Post, DatasetKind::Clean, &[]).unwrap();
    assert_eq!(path, dir.join("clean").join("france_post_politics.csv"));

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("id,title,selftext,created,country,phase,score,flair"));
    let rows: Vec<PostRow> = read_csv(&path).unwrap();
    assert!(rows.is_empty());
}

/// The exporter refuses posts outside the phase window or tagged for another pair.
#[test]
fn export_rejects_out_of_window_posts() {
    let dir = tempdir();
    let exporter = collector_in(&dir).exporter();
    let late = tagged("x", "t", "", datetime!(2024-09-01 00:00 UTC), Country::Germany, Phase::Post);
    assert!(exporter.export(Country::Germany, Phase::Post, DatasetKind::Raw, &[late]).is_err());

    let other = tagged("y", "t", "", datetime!(2024-06-20 00:00 UTC), Country::France, Phase::During);
    assert!(exporter.export(Country::Germany, Phase::During, DatasetKind::Raw, &[other]).is_err());
}

#[test]
fn full_text_joins_title_and_body() {
    assert_eq!(full_text("Hello", ""), "Hello");
    assert_eq!(full_text("Hello", "world"), "Hello world");
    assert_eq!(full_text("", "only body"), "only body");
}

/// Unified rows count equals the sum of the available clean files; missing
/// pairs are skipped.
#[test]
fn merge_sums_available_files_and_skips_missing() {
    let dir = tempdir();
    let collector = collector_in(&dir);
    let exporter = collector.exporter();

    let de = vec![
        tagged("d1", "AfD", "", datetime!(2024-05-20 10:00 UTC), Country::Germany, Phase::Pre),
        tagged("d2", "Ampel", "Streit https://example.com/x", datetime!(2024-05-21 10:00 UTC), Country::Germany, Phase::Pre),
    ];
    let nl = vec![tagged("n1", "Wilders", "", datetime!(2024-07-20 10:00 UTC), Country::Netherlands, Phase::Post)];
    exporter.export(Country::Germany, Phase::Pre, DatasetKind::Clean, &de).unwrap();
    exporter.export(Country::Netherlands, Phase::Post, DatasetKind::Clean, &nl).unwrap();

    let report = collector.merge(MergeSource::Clean).unwrap();
    assert_eq!(report.rows, 3);
    assert_eq!(report.files_read, 2);
    assert_eq!(report.missing.len(), 7);
    assert_eq!(report.output, dir.join("processed").join("unified_posts.csv"));

    let rows: Vec<UnifiedRow> = read_csv(&report.output).unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["d1", "d2", "n1"]);
    assert!(rows.iter().all(|r| !r.full_text.is_empty() && r.is_political));
    assert_eq!(rows[1].full_text, "Ampel Streit https://example.com/x");
    assert_eq!(rows[1].clean_text, "ampel streit");
}

/// Merging with no inputs at all still succeeds with an empty dataset.
#[test]
fn merge_with_nothing_to_read() {
    let dir = tempdir();
    let report = collector_in(&dir).merge(MergeSource::Raw).unwrap();
    assert_eq!(report.rows, 0);
    assert_eq!(report.missing.len(), 9);
    assert!(report.output.ends_with("unified_raw.csv"));
}

/// The classifier is re-run on merge: a stale flag in the file is corrected.
#[test]
fn merge_reclassifies_rows() {
    let row = PostRow {
        id: "z".into(),
        title: "Macron".into(),
        selftext: String::new(),
        created: "2024-06-20T00:00:00Z".into(),
        country: "france".into(),
        phase: "during".into(),
        score: 0,
        flair: String::new(),
        author: String::new(),
        num_comments: 0,
        upvote_ratio: None,
        permalink: String::new(),
        url: String::new(),
        subreddit: "france".into(),
        is_self: true,
        over_18: false,
        full_text: String::new(),
        is_political: false,
    };
    let unified = unify_row(row.clone()).unwrap();
    assert!(unified.is_political);
    assert_eq!(unified.full_text, "Macron");

    let unknown = PostRow { country: "belgium".into(), ..row };
    assert!(unify_row(unknown).is_err());
}

/// Link metadata survives the export and the merge.
#[test]
fn link_columns_are_kept() {
    let dir = tempdir();
    let collector = collector_in(&dir);
    let mut post = tagged("l1", "Macron", "", datetime!(2024-06-20 10:00 UTC), Country::France, Phase::During);
    post.over_18 = true;
    let path = collector.exporter().export(Country::France, Phase::During, DatasetKind::Clean, &[post]).unwrap();

    let header = fs::read_to_string(&path).unwrap().lines().next().unwrap().to_string();
    assert_eq!(header, PostRow::HEADERS.join(","));
    let rows: Vec<PostRow> = read_csv(&path).unwrap();
    assert_eq!(rows[0].url, "https://example.org/article");
    assert_eq!(rows[0].subreddit, "test");
    assert!(!rows[0].is_self);
    assert!(rows[0].over_18);

    let report = collector.merge(MergeSource::Clean).unwrap();
    let unified: Vec<UnifiedRow> = read_csv(&report.output).unwrap();
    assert_eq!(unified[0].url, "https://example.org/article");
    assert!(unified[0].over_18);
}

/// A damaged file is reported and skipped; the other pairs still merge.
#[test]
fn merge_skips_unreadable_file() {
    let dir = tempdir();
    let collector = collector_in(&dir);
    let exporter = collector.exporter();
    let de = vec![tagged("d1", "AfD", "", datetime!(2024-05-20 10:00 UTC), Country::Germany, Phase::Pre)];
    exporter.export(Country::Germany, Phase::Pre, DatasetKind::Clean, &de).unwrap();

    let broken = exporter.path(Country::France, Phase::Post, DatasetKind::Clean);
    fs::create_dir_all(broken.parent().unwrap()).unwrap();
    fs::write(&broken, "id,title\nx,half a row\n").unwrap();

    let report = collector.merge(MergeSource::Clean).unwrap();
    assert_eq!(report.rows, 1);
    assert_eq!(report.files_read, 1);
    assert_eq!(report.unreadable.len(), 1);
    assert_eq!(report.unreadable[0].0, broken);
    assert_eq!(report.missing.len(), 7);

    let rows: Vec<UnifiedRow> = read_csv(&report.output).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "d1");
}

fn ids_in(path: &Path) -> Vec<String> {
    read_csv::<PostRow>(path).unwrap().into_iter().map(|r| r.id).collect()
}

/// Raw and clean files of a pair are replaced together: when the clean file
/// cannot be written, the previous raw file stays as it was.
#[test]
fn pair_export_leaves_old_files_on_failure() {
    let dir = tempdir();
    let exporter = collector_in(&dir).exporter();
    let first = vec![tagged("a", "Scholz", "", datetime!(2024-06-20 10:00 UTC), Country::Germany, Phase::During)];
    let (raw, clean) = exporter.export_pair(Country::Germany, Phase::During, &first, &first).unwrap();
    assert_eq!(ids_in(&raw), vec!["a"]);
    assert_eq!(ids_in(&clean), vec!["a"]);

    // make the clean directory unusable
    fs::remove_dir_all(dir.join("clean")).unwrap();
    fs::write(dir.join("clean"), "not a directory").unwrap();

    let second = vec![tagged("b", "Wahl", "", datetime!(2024-06-21 10:00 UTC), Country::Germany, Phase::During)];
    assert!(exporter.export_pair(Country::Germany, Phase::During, &second, &second).is_err());
    assert_eq!(ids_in(&raw), vec!["a"]);
    assert_eq!(fs::read_dir(dir.join("raw")).unwrap().count(), 1);
}
