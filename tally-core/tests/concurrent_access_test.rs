//! Concurrent access tests
//!
//! The demo backend and the event log each share a single mutex-guarded
//! DuckDB connection. These tests hammer both from many tasks and threads
//! and check that no write is lost.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::{Arc, Barrier};
use std::thread;

use serde_json::json;
use tempfile::TempDir;

use tally_core::adapters::local::LocalBackend;
use tally_core::domain::UserMetadata;
use tally_core::ports::{AuthProvider, TableQuery, TableStore};
use tally_core::services::{EntryPoint, LoggingService};

const TASK_COUNT: usize = 6;
const ITERATIONS_PER_TASK: usize = 5;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_on_shared_backend() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(LocalBackend::open(dir.path()).unwrap());
    let session = backend
        .sign_up("load@example.com", "Load1234", &UserMetadata::default(), "")
        .await
        .unwrap()
        .session
        .unwrap();
    let token = Arc::new(session.access_token);

    let mut handles = Vec::new();
    for task_id in 0..TASK_COUNT {
        let backend = Arc::clone(&backend);
        let token = Arc::clone(&token);
        handles.push(tokio::spawn(async move {
            for i in 0..ITERATIONS_PER_TASK {
                backend
                    .insert(
                        &token,
                        "categories",
                        json!({ "name": format!("task-{}-{}", task_id, i) }),
                    )
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let rows = backend
        .select(&token, &TableQuery::from("categories"))
        .await
        .unwrap();
    assert_eq!(rows.len(), TASK_COUNT * ITERATIONS_PER_TASK);

    let mut ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), rows.len(), "row ids must be unique");
}

#[test]
fn test_concurrent_logging_threads() {
    let dir = TempDir::new().unwrap();
    let logger = Arc::new(LoggingService::new(dir.path(), EntryPoint::Cli, "test").unwrap());
    let barrier = Arc::new(Barrier::new(TASK_COUNT));

    let handles: Vec<_> = (0..TASK_COUNT)
        .map(|thread_id| {
            let logger = Arc::clone(&logger);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ITERATIONS_PER_TASK {
                    logger
                        .log_command(&format!("thread-{}", thread_id), "local")
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // IDs embed a per-millisecond counter, so every entry must survive
    assert_eq!(logger.count().unwrap(), (TASK_COUNT * ITERATIONS_PER_TASK) as u64);
}
