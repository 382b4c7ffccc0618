mod common;

use common::*;

use std::fs;

use phishlens::brand::{ReferenceStore, StoreError};
use phishlens::result_log::ResultLog;
use phishlens::verdict::{StageTimings, Verdict};
use tempfile::TempDir;

#[test]
fn test_store_load_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("reference_store.json");

    let original = ReferenceStore {
        brands: vec![
            brand("paypal", &["paypal"], &[1.0, 0.0, 0.0]),
            brand("ebay", &["ebay", "ebay-kleinanzeigen"], &[0.0, 1.0, 0.0]),
        ],
    };
    fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();

    let loaded = ReferenceStore::load(&path).unwrap();
    assert_eq!(loaded.brand_count(), 2);
    assert_eq!(loaded.embedding_count(), 2);
    assert!(loaded.get("ebay").unwrap().owns_domain("EBAY"));
    assert!(!loaded.get("ebay").unwrap().owns_domain("paypal"));
}

#[test]
fn test_store_missing_file() {
    let result = ReferenceStore::load(std::path::Path::new("/nonexistent/store.json"));
    assert!(matches!(result, Err(StoreError::FileNotFound(_))));
}

#[test]
fn test_store_rejects_mixed_dimensions() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.json");

    let store = ReferenceStore {
        brands: vec![
            brand("a", &["a"], &[1.0, 0.0]),
            brand("b", &["b"], &[1.0, 0.0, 0.0]),
        ],
    };
    fs::write(&path, serde_json::to_string(&store).unwrap()).unwrap();

    let result = ReferenceStore::load(&path);
    assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
}

#[test]
fn test_store_rejects_garbage_json() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.json");
    fs::write(&path, "{ not json").unwrap();

    let result = ReferenceStore::load(&path);
    assert!(matches!(result, Err(StoreError::ParseError(_))));
}

#[test]
fn test_result_log_appends_and_recovers_urls() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("results.txt");

    let mut log = ResultLog::open(&path).unwrap();
    log.append("a", "http://a.test", &Verdict::benign(StageTimings::default())).unwrap();
    log.append("b", "http://b.test", &Verdict::benign(StageTimings::default())).unwrap();
    assert_eq!(log.count(), 2);
    drop(log);

    // Reopening appends rather than truncating
    let mut log = ResultLog::open(&path).unwrap();
    log.append("c", "http://c.test", &Verdict::benign(StageTimings::default())).unwrap();
    drop(log);

    let urls = ResultLog::processed_urls(&path).unwrap();
    assert_eq!(urls.len(), 3);
    assert!(urls.contains("http://b.test"));
}
