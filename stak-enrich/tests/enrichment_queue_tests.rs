//! Background queue behaviour

mod common;

use std::sync::Arc;

use common::*;
use stak_enrich::config::EnrichmentSettings;
use stak_enrich::db::enrichment_logs::list_enrichment_logs;
use stak_enrich::db::SqliteEnrichmentStore;
use stak_enrich::services::{EnrichmentOrchestrator, EnrichmentQueue, QueueError};
use stak_enrich::services::llm_client::TextGenerator;
use stak_enrich::types::{LogStatus, TriggerType};

fn start_queue(
    pool: &sqlx::SqlitePool,
    generator: Arc<dyn TextGenerator>,
    capacity: usize,
) -> (EnrichmentQueue, tokio::task::JoinHandle<()>) {
    let orchestrator = Arc::new(EnrichmentOrchestrator::new(
        Arc::new(SqliteEnrichmentStore::new(pool.clone())),
        generator,
        &EnrichmentSettings::default(),
    ));
    EnrichmentQueue::start(orchestrator, capacity)
}

#[tokio::test]
async fn test_enqueued_run_is_processed() {
    let pool = setup_test_db().await;
    insert_sample_profile(&pool, "u1", None).await;
    let (queue, _worker) = start_queue(&pool, ScriptedGenerator::replying(GOOD_REPLY), 8);

    queue.enqueue("u1", TriggerType::Initial).unwrap();

    let done = wait_for(|| {
        let pool = pool.clone();
        async move { !list_enrichment_logs(&pool, "u1").await.unwrap().is_empty() }
    })
    .await;
    assert!(done, "queued run never wrote a log");

    let logs = list_enrichment_logs(&pool, "u1").await.unwrap();
    assert_eq!(logs[0].status, LogStatus::Success);
    assert_eq!(logs[0].enrichment_type, "initial");
}

#[tokio::test]
async fn test_unknown_profile_does_not_stop_worker() {
    let pool = setup_test_db().await;
    insert_sample_profile(&pool, "u1", None).await;
    let (queue, _worker) = start_queue(&pool, ScriptedGenerator::replying(GOOD_REPLY), 8);

    queue.enqueue("ghost", TriggerType::Refresh).unwrap();
    queue.enqueue("u1", TriggerType::Refresh).unwrap();

    let done = wait_for(|| {
        let pool = pool.clone();
        async move { !list_enrichment_logs(&pool, "u1").await.unwrap().is_empty() }
    })
    .await;
    assert!(done);
}

#[tokio::test]
async fn test_full_queue_rejects_without_blocking() {
    let pool = setup_test_db().await;
    insert_sample_profile(&pool, "u1", None).await;
    let generator = BlockingGenerator::new();
    let (queue, _worker) = start_queue(&pool, generator.clone(), 1);

    // First job is taken by the worker and parks inside the generator
    queue.enqueue("u1", TriggerType::Refresh).unwrap();
    generator.started.notified().await;

    // Second job fills the single slot
    queue.enqueue("u1", TriggerType::Refresh).unwrap();
    assert_eq!(queue.enqueue("u1", TriggerType::Refresh), Err(QueueError::Full));

    generator.release.notify_one();
}

#[tokio::test]
async fn test_stopped_worker_reports_closed() {
    let pool = setup_test_db().await;
    let (queue, worker) = start_queue(&pool, ScriptedGenerator::replying("{}"), 4);

    worker.abort();
    let _ = worker.await;

    assert_eq!(
        queue.enqueue("u1", TriggerType::Refresh),
        Err(QueueError::Closed)
    );
}
