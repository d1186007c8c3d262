use chrono::Utc;

use super::*;

fn canonical() -> ImageNormalizer {
    ImageNormalizer::new(2000, 3000)
}

#[test]
fn rewrites_size_segment_and_drops_query() {
    let out = canonical().normalize("https://img.example/x/-0-230-0-345-crop/poster.jpg?v=2");
    assert_eq!(out, "https://img.example/x/-0-2000-0-3000-crop/poster.jpg");
}

#[test]
fn url_without_size_segment_only_loses_query() {
    let out = canonical().normalize("https://img.example/plain/poster.jpg?k=abc&v=2");
    assert_eq!(out, "https://img.example/plain/poster.jpg");
}

#[test]
fn url_without_size_segment_or_query_is_unchanged() {
    let url = "https://img.example/plain/poster.jpg";
    assert_eq!(canonical().normalize(url), url);
}

#[test]
fn query_is_cut_at_first_question_mark() {
    let out = canonical().normalize("https://img.example/-0-1-0-2-crop/a.jpg?x=1?y=-0-5-0-5-crop");
    assert_eq!(out, "https://img.example/-0-2000-0-3000-crop/a.jpg");
}

#[test]
fn every_size_segment_is_rewritten() {
    let out = canonical().normalize("https://img.example/-0-70-0-105-crop/b/-0-150-0-225-crop.jpg");
    assert_eq!(
        out,
        "https://img.example/-0-2000-0-3000-crop/b/-0-2000-0-3000-crop.jpg"
    );
}

#[test]
fn normalization_is_idempotent() {
    let normalizer = canonical();
    for url in [
        "https://img.example/x/-0-230-0-345-crop/poster.jpg?v=2",
        "https://img.example/plain/poster.jpg?v=2",
        "",
        "?only-query",
        "https://img.example/-0-2000-0-3000-crop/done.jpg",
    ] {
        let once = normalizer.normalize(url);
        assert_eq!(normalizer.normalize(&once), once, "not idempotent for {url:?}");
    }
}

#[test]
fn empty_url_stays_empty() {
    assert_eq!(canonical().normalize(""), "");
}

#[test]
fn zero_dimension_is_a_no_op() {
    let url = "https://img.example/x/-0-230-0-345-crop/poster.jpg?v=2";
    assert_eq!(ImageNormalizer::new(0, 3000).normalize(url), url);
    assert_eq!(ImageNormalizer::new(2000, 0).normalize(url), url);
}

#[test]
fn default_uses_canonical_poster_size() {
    assert_eq!(ImageNormalizer::default(), ImageNormalizer::new(2000, 3000));
}

#[test]
fn normalize_records_rewrites_image_urls_only() {
    let mut records = vec![FavoriteRecord {
        title: "Stalker".to_string(),
        release_year: "1979".to_string(),
        image_url: "https://img.example/-0-70-0-105-crop/s.jpg?v=9".to_string(),
        page_url: "https://letterboxd.com/film/stalker/?ref=x".to_string(),
        observed_at: Utc::now(),
    }];

    canonical().normalize_records(&mut records);

    assert_eq!(records[0].image_url, "https://img.example/-0-2000-0-3000-crop/s.jpg");
    assert_eq!(records[0].page_url, "https://letterboxd.com/film/stalker/?ref=x");
}

#[test]
fn dimensions_reads_first_size_segment() {
    assert_eq!(
        dimensions("https://img.example/-0-230-0-345-crop/p.jpg"),
        Some((230, 345))
    );
    assert_eq!(dimensions("https://img.example/p.jpg"), None);
}

#[test]
fn dimensions_rejects_overflowing_numbers() {
    assert_eq!(dimensions("https://img.example/-0-99999999999-0-1-crop/p.jpg"), None);
}

#[test]
fn is_canonical_after_normalization() {
    let normalizer = canonical();
    let url = "https://img.example/-0-230-0-345-crop/p.jpg";
    assert!(!normalizer.is_canonical(url));
    assert!(normalizer.is_canonical(&normalizer.normalize(url)));
    assert!(!normalizer.is_canonical("https://img.example/p.jpg"));
}

#[test]
fn resize_uses_explicit_dimensions() {
    assert_eq!(
        resize("https://img.example/-0-230-0-345-crop/p.jpg?x", 500, 750),
        "https://img.example/-0-500-0-750-crop/p.jpg"
    );
}
