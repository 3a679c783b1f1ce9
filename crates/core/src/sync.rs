//! One-directional SAM.gov -> SharePoint synchronization orchestrator.
//!
//! The [`SyncOrchestrator`] drives each run:
//!
//! 1. Authenticate against SharePoint (fatal on failure).
//! 2. Load the set of notice IDs already in the target list.
//! 3. Fetch every opportunity posted in the configured window.
//! 4. For each record not already present: transform, create the list item,
//!    then download and attach its resource links.
//!
//! A failure while processing one record is counted and logged, never
//! allowed to abort the loop. Attachment failures are logged only.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::errors::{SamError, SharePointError, SyncError};
use crate::sam::models::Opportunity;
use crate::sam::SamClient;
use crate::sharepoint::{SharePointClient, TokenClient};
use crate::transform::{transform, FieldMap};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Read side of a sync run: the opportunity listings service.
#[allow(async_fn_in_trait)]
pub trait OpportunitySource {
    async fn fetch_all(&self, days_back: i64) -> Result<Vec<Opportunity>, SamError>;

    /// Download one resource link; `None` on any failure (non-fatal).
    async fn download_resource(&self, url: &str, filename: &str) -> Option<Vec<u8>>;
}

/// Write side of a sync run: the target list store.
#[allow(async_fn_in_trait)]
pub trait OpportunityStore {
    async fn authenticate(&mut self) -> Result<(), SharePointError>;

    async fn existing_notice_ids(&mut self) -> Result<HashSet<String>, SharePointError>;

    /// Create a list item; returns the store-assigned item identifier.
    async fn create_list_item(&mut self, fields: &FieldMap) -> Result<String, SharePointError>;

    /// Upload an attachment; `false` on failure (non-fatal).
    async fn add_attachment(&mut self, item_id: &str, filename: &str, content: Vec<u8>) -> bool;
}

impl OpportunitySource for SamClient {
    async fn fetch_all(&self, days_back: i64) -> Result<Vec<Opportunity>, SamError> {
        self.fetch_all_opportunities(days_back).await
    }

    async fn download_resource(&self, url: &str, filename: &str) -> Option<Vec<u8>> {
        SamClient::download_resource(self, url, filename).await
    }
}

impl OpportunityStore for SharePointClient {
    async fn authenticate(&mut self) -> Result<(), SharePointError> {
        SharePointClient::authenticate(self).await
    }

    async fn existing_notice_ids(&mut self) -> Result<HashSet<String>, SharePointError> {
        SharePointClient::existing_notice_ids(self).await
    }

    async fn create_list_item(&mut self, fields: &FieldMap) -> Result<String, SharePointError> {
        SharePointClient::create_list_item(self, fields).await
    }

    async fn add_attachment(&mut self, item_id: &str, filename: &str, content: Vec<u8>) -> bool {
        SharePointClient::add_attachment(self, item_id, filename, content).await
    }
}

// ---------------------------------------------------------------------------
// Run state machine
// ---------------------------------------------------------------------------

/// States of a sync run. `Processing` loops per record; transitions never
/// backtrack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Authenticated,
    KeysLoaded,
    Fetching,
    Processing,
    Done,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::KeysLoaded => write!(f, "keys_loaded"),
            Self::Fetching => write!(f, "fetching"),
            Self::Processing => write!(f, "processing"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Counters from a single sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Opportunities seen in the window.
    pub total: usize,
    /// List items created.
    pub new: usize,
    /// Records skipped because their notice ID already existed.
    pub skipped: usize,
    /// Records that failed during transform/create.
    pub errors: usize,
    pub started_at: String,
    pub completed_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// The sync orchestrator, generic over its source and store seams.
pub struct SyncOrchestrator<S, T> {
    source: S,
    store: T,
    days_back: i64,
    download_attachments: bool,
    state: SyncState,
}

impl SyncOrchestrator<SamClient, SharePointClient> {
    /// Build an orchestrator with the production clients from config.
    pub fn from_config(config: &AppConfig) -> Self {
        let source = SamClient::new(&config.sam);
        let token_client = TokenClient::new(&config.azure);
        let store = SharePointClient::new(&config.sharepoint, token_client);
        Self::new(
            source,
            store,
            config.sam.days_to_sync,
            config.sam.download_attachments,
        )
    }
}

impl<S: OpportunitySource, T: OpportunityStore> SyncOrchestrator<S, T> {
    pub fn new(source: S, store: T, days_back: i64, download_attachments: bool) -> Self {
        Self {
            source,
            store,
            days_back,
            download_attachments,
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    fn set_state(&mut self, next: SyncState) {
        debug!(from = %self.state, to = %next, "sync state transition");
        self.state = next;
    }

    /// Execute one full sync run.
    ///
    /// Authentication, key enumeration, and the window fetch are fatal on
    /// failure and unwind to the caller. Per-record failures are counted in
    /// the returned [`SyncStats`] and never abort the loop.
    pub async fn run(&mut self) -> Result<SyncStats, SyncError> {
        info!(days_back = self.days_back, "starting SAM.gov to SharePoint sync");

        let mut stats = SyncStats {
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        };

        self.store.authenticate().await.map_err(SyncError::from)?;
        self.set_state(SyncState::Authenticated);

        let existing = self
            .store
            .existing_notice_ids()
            .await
            .map_err(SyncError::from)?;
        self.set_state(SyncState::KeysLoaded);

        self.set_state(SyncState::Fetching);
        let opportunities = self
            .source
            .fetch_all(self.days_back)
            .await
            .map_err(SyncError::from)?;
        stats.total = opportunities.len();

        self.set_state(SyncState::Processing);
        for opp in &opportunities {
            let notice_id = opp.notice_id.as_deref();

            if let Some(id) = notice_id {
                if existing.contains(id) {
                    stats.skipped += 1;
                    debug!(notice_id = id, "skipping existing opportunity");
                    continue;
                }
            }

            match self.process_record(opp).await {
                Ok(()) => stats.new += 1,
                Err(e) => {
                    stats.errors += 1;
                    error!(
                        notice_id = notice_id.unwrap_or("<none>"),
                        error = %e,
                        "error processing opportunity"
                    );
                }
            }
        }
        self.set_state(SyncState::Done);

        stats.completed_at = Some(Utc::now().to_rfc3339());
        info!(
            total = stats.total,
            new = stats.new,
            skipped = stats.skipped,
            errors = stats.errors,
            "sync complete"
        );
        Ok(stats)
    }

    /// Transform one record, create the list item, and attach its resources.
    async fn process_record(&mut self, opp: &Opportunity) -> Result<(), SharePointError> {
        let fields = transform(opp);
        let item_id = self.store.create_list_item(&fields).await?;

        let title = opp.title.as_deref().unwrap_or("<untitled>");
        info!(
            item_id = %item_id,
            title = truncate(title, 50),
            "created list item"
        );

        if self.download_attachments {
            let notice_id = opp.notice_id.as_deref().unwrap_or("unknown");
            for (idx, link) in opp.resource_links.iter().enumerate() {
                let filename = format!("{}_attachment_{}.pdf", notice_id, idx + 1);
                match self.source.download_resource(link, &filename).await {
                    Some(content) => {
                        if !self.store.add_attachment(&item_id, &filename, content).await {
                            warn!(filename, "attachment upload failed");
                        }
                    }
                    None => {
                        warn!(filename, "attachment download failed");
                    }
                }
            }
        }

        Ok(())
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
