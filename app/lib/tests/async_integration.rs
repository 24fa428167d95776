//! Integration tests for the async driver entry point.
//!
//! The async path runs the blocking conversion on Tokio's blocking pool and
//! must report exactly what the synchronous path reports.

#![cfg(feature = "async")]

use std::fs;
use std::sync::Arc;

use accel_convert::{ConversionDriver, ConversionPair, ConvertError, ConverterConfig, MemoryStore};
use tempfile::tempdir;

fn pairs(specs: &[&str]) -> Vec<ConversionPair> {
    specs.iter().map(|s| s.parse().unwrap()).collect()
}

#[tokio::test]
async fn test_run_async_matches_sync() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("Log.txt");
    fs::write(&log, "[I] (12ms) 3 4.567 89;\nnot a log line\n[I] (13ms) 4 5.0 90;\n").unwrap();

    let store = Arc::new(MemoryStore::new());
    let driver = ConversionDriver::new(ConverterConfig::default().with_overwrite(true))
        .with_store(store.clone());
    let requested = pairs(&["flat:none", "columnar:gzip", "table:bzip2"]);

    let async_report = driver.run_async(log.clone(), requested.clone()).await.unwrap();
    let sync_report = driver.run(&log, &requested).unwrap();

    assert!(async_report.all_succeeded());
    assert_eq!(async_report.records, sync_report.records);
    assert_eq!(
        async_report.written().collect::<Vec<_>>(),
        sync_report.written().collect::<Vec<_>>()
    );
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_run_async_missing_source() {
    let dir = tempdir().unwrap();
    let driver = ConversionDriver::new(ConverterConfig::default());

    let err = driver
        .run_async(dir.path().join("absent.txt"), pairs(&["flat:none"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::SourceUnreadable { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_async_runs() {
    let dir = tempdir().unwrap();
    let mut handles = Vec::new();

    for i in 0..4 {
        let log = dir.path().join(format!("Log{}.txt", i));
        fs::write(&log, format!("[I] ({}ms) {} 1.0 {};\n", i, i, i * 10)).unwrap();
        let driver = ConversionDriver::new(ConverterConfig::default())
            .with_store(Arc::new(MemoryStore::new()));
        handles.push(tokio::spawn(async move {
            driver.run_async(log, pairs(&["flat:none", "columnar:none"])).await
        }));
    }

    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!(report.all_succeeded());
        assert_eq!(report.records, 1);
    }
}
