//! Shared test doubles and fixtures for stak-enrich integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use stak_common::{Error, Result};
use tokio::sync::Notify;

use stak_enrich::db::{profiles, EnrichmentStore, SqliteEnrichmentStore};
use stak_enrich::models::{
    MetadataUpsert, NewEnrichmentLog, NewLlmUsage, NewProfileEnrichment, Profile,
};
use stak_enrich::services::llm_client::{Completion, GenerationRequest, LlmError, TextGenerator, TokenUsage};

/// Single-connection in-memory database with the full schema
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    stak_common::db::create_all_tables(&pool).await.unwrap();
    pool
}

pub fn sample_profile(id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        first_name: Some("Ada".into()),
        last_name: Some("Lovelace".into()),
        email: Some("ada@engines.io".into()),
        company: Some("Analytical Engines".into()),
        linkedin_url: Some("https://linkedin.com/in/ada".into()),
        github_url: Some("https://github.com/ada".into()),
        ..Default::default()
    }
}

pub async fn insert_sample_profile(pool: &SqlitePool, id: &str, consent: Option<&str>) -> Profile {
    let mut profile = sample_profile(id);
    profile.public_enrichment_consent = consent.map(str::to_string);
    profiles::insert_profile(pool, &profile).await.unwrap();
    profile
}

/// Generator that replays a fixed reply and counts calls
pub struct ScriptedGenerator {
    reply: std::result::Result<String, (u16, String)>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn replying(content: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(content.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err((status, "upstream unavailable".to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_json(
        &self,
        _request: &GenerationRequest,
    ) -> std::result::Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(content) => Ok(Completion {
                content: content.clone(),
                model: "scripted-model".into(),
                usage: TokenUsage {
                    prompt_tokens: 120,
                    completion_tokens: 30,
                    cost_usd: 0.0001,
                },
            }),
            Err((status, body)) => Err(LlmError::Api(*status, body.clone())),
        }
    }
}

/// Generator that parks every call until released
pub struct BlockingGenerator {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl BlockingGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for BlockingGenerator {
    async fn generate_json(
        &self,
        _request: &GenerationRequest,
    ) -> std::result::Result<Completion, LlmError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(Completion {
            content: "{}".into(),
            model: "blocking-model".into(),
            usage: TokenUsage::default(),
        })
    }
}

/// Which store write should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    LoadProfile,
    /// Every ProfileEnrichment insert, including the failed-row write
    History,
    Metadata,
    TrustSignals,
    Logs,
}

/// SQLite store with one injected failure
pub struct FailingStore {
    inner: SqliteEnrichmentStore,
    fail_at: FailAt,
}

impl FailingStore {
    pub fn new(pool: SqlitePool, fail_at: FailAt) -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteEnrichmentStore::new(pool),
            fail_at,
        })
    }

    fn check(&self, at: FailAt) -> Result<()> {
        if self.fail_at == at {
            Err(Error::Internal(format!("injected failure at {:?}", at)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EnrichmentStore for FailingStore {
    async fn load_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        self.check(FailAt::LoadProfile)?;
        self.inner.load_profile(user_id).await
    }

    async fn insert_profile_enrichment(&self, record: &NewProfileEnrichment) -> Result<String> {
        self.check(FailAt::History)?;
        self.inner.insert_profile_enrichment(record).await
    }

    async fn insert_enrichment_log(&self, log: &NewEnrichmentLog) -> Result<String> {
        self.check(FailAt::Logs)?;
        self.inner.insert_enrichment_log(log).await
    }

    async fn upsert_profile_metadata(&self, upsert: &MetadataUpsert) -> Result<()> {
        self.check(FailAt::Metadata)?;
        self.inner.upsert_profile_metadata(upsert).await
    }

    async fn load_trust_signals(&self, user_id: &str) -> Result<Option<Value>> {
        self.inner.load_trust_signals(user_id).await
    }

    async fn upsert_trust_signals(&self, user_id: &str, signals: &Value) -> Result<()> {
        self.check(FailAt::TrustSignals)?;
        self.inner.upsert_trust_signals(user_id, signals).await
    }

    async fn record_llm_usage(&self, usage: &NewLlmUsage) -> Result<()> {
        self.inner.record_llm_usage(usage).await
    }
}

/// Poll until `check` returns true or the deadline passes
pub async fn wait_for<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

pub const GOOD_REPLY: &str = r#"{
    "title": {"value": "Principal Engineer", "confidence": 0.9, "sources": ["https://engines.io/team"]},
    "bio": {"value": "Writes notes on engines", "confidence": 0.4, "sources": []},
    "skills": {"value": ["Mathematics", "Programming"], "confidence": 0.8, "sources": []}
}"#;
