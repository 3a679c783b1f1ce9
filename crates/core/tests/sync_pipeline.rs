//! End-to-end orchestrator test over in-memory source and store fakes:
//! a full run through fetch, dedup, transform, create, and attach.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use samsync_core::errors::{SamError, SharePointError};
use samsync_core::sam::models::{
    Award, Awardee, NamedRef, Opportunity, PlaceOfPerformance, PointOfContact,
};
use samsync_core::sync::{OpportunitySource, OpportunityStore, SyncOrchestrator};
use samsync_core::transform::FieldMap;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct MemorySource {
    opportunities: Vec<Opportunity>,
    resources: HashMap<String, Vec<u8>>,
}

impl OpportunitySource for MemorySource {
    async fn fetch_all(&self, _days_back: i64) -> Result<Vec<Opportunity>, SamError> {
        Ok(self.opportunities.clone())
    }

    async fn download_resource(&self, url: &str, _filename: &str) -> Option<Vec<u8>> {
        self.resources.get(url).cloned()
    }
}

#[derive(Default)]
struct StoreState {
    created: Vec<FieldMap>,
    attachments: Vec<(String, String, usize)>,
}

struct MemoryStore {
    existing: HashSet<String>,
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    fn new(existing: HashSet<String>) -> (Self, Arc<Mutex<StoreState>>) {
        let state = Arc::new(Mutex::new(StoreState::default()));
        (
            Self {
                existing,
                state: state.clone(),
            },
            state,
        )
    }
}

impl OpportunityStore for MemoryStore {
    async fn authenticate(&mut self) -> Result<(), SharePointError> {
        Ok(())
    }

    async fn existing_notice_ids(&mut self) -> Result<HashSet<String>, SharePointError> {
        Ok(self.existing.clone())
    }

    async fn create_list_item(&mut self, fields: &FieldMap) -> Result<String, SharePointError> {
        let mut state = self.state.lock().unwrap();
        state.created.push(fields.clone());
        Ok(format!("{}", state.created.len()))
    }

    async fn add_attachment(&mut self, item_id: &str, filename: &str, content: Vec<u8>) -> bool {
        let mut state = self.state.lock().unwrap();
        state
            .attachments
            .push((item_id.to_string(), filename.to_string(), content.len()));
        true
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn bogota_opportunity() -> Opportunity {
    Opportunity {
        notice_id: Some("abc123".into()),
        title: Some("Embassy Maintenance Services".into()),
        solicitation_number: Some("19BO5025R0003".into()),
        full_parent_path_name: Some(
            "STATE, DEPARTMENT OF.STATE, DEPARTMENT OF.US EMBASSY BOGOTA".into(),
        ),
        posted_date: Some("2025-12-31".into()),
        response_deadline: Some("2026-01-26T16:00:00-05:00".into()),
        notice_type: Some("Solicitation".into()),
        type_of_set_aside: Some("WOSB".into()),
        active: Some("Yes".into()),
        point_of_contact: vec![PointOfContact {
            contact_type: Some("primary".into()),
            full_name: Some("Jane Doe".into()),
            email: Some("jane@state.gov".into()),
            ..Default::default()
        }],
        place_of_performance: Some(PlaceOfPerformance {
            city: Some(NamedRef {
                name: Some("Bogota".into()),
                ..Default::default()
            }),
            country: Some(NamedRef {
                name: Some("Colombia".into()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        award: Some(Award {
            number: Some("W91".into()),
            amount: Some("1000000".into()),
            date: Some("2025-11-01".into()),
            awardee: Some(Awardee {
                name: Some("Acme Corp".into()),
                location: Some("Reston, VA".into()),
            }),
        }),
        resource_links: vec!["https://sam.gov/files/sow".into()],
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_pipeline_creates_transformed_item_with_attachment() {
    let mut resources = HashMap::new();
    resources.insert("https://sam.gov/files/sow".to_string(), vec![1u8; 2048]);
    let source = MemorySource {
        opportunities: vec![bogota_opportunity()],
        resources,
    };
    let (store, state) = MemoryStore::new(HashSet::new());

    let mut orch = SyncOrchestrator::new(source, store, 30, true);
    let stats = orch.run().await.unwrap();

    assert_eq!(stats.total, 1);
    assert_eq!(stats.new, 1);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.errors, 0);
    assert!(stats.completed_at.is_some());

    let state = state.lock().unwrap();
    assert_eq!(state.created.len(), 1);
    let fields = &state.created[0];

    // Flattened hierarchy and normalized dates made it through intact.
    assert_eq!(
        fields.get("Department").and_then(|v| v.as_str()),
        Some("STATE, DEPARTMENT OF")
    );
    assert_eq!(
        fields.get("Office").and_then(|v| v.as_str()),
        Some("US EMBASSY BOGOTA")
    );
    assert_eq!(
        fields.get("PostedDate").and_then(|v| v.as_str()),
        Some("2025-12-31T00:00:00Z")
    );
    assert_eq!(
        fields.get("ResponseDeadline").and_then(|v| v.as_str()),
        Some("2026-01-26T16:00:00-05:00")
    );
    assert_eq!(
        fields.get("SetAsideDescription").and_then(|v| v.as_str()),
        Some("Women-Owned Small Business (WOSB) Program Set-Aside (FAR 19.15)")
    );
    assert_eq!(
        fields.get("POC_Name").and_then(|v| v.as_str()),
        Some("Jane Doe")
    );
    assert_eq!(
        fields.get("PoP_City").and_then(|v| v.as_str()),
        Some("Bogota")
    );
    assert_eq!(
        fields.get("AwardeeName").and_then(|v| v.as_str()),
        Some("Acme Corp")
    );
    assert!(fields.values().all(|v| !v.is_null()));

    // The single resource link became attachment #1 on the created item.
    assert_eq!(
        state.attachments.as_slice(),
        [("1".to_string(), "abc123_attachment_1.pdf".to_string(), 2048)]
    );
}

#[tokio::test]
async fn rerun_with_populated_store_is_idempotent() {
    let source = MemorySource {
        opportunities: vec![bogota_opportunity()],
        resources: HashMap::new(),
    };
    let mut existing = HashSet::new();
    existing.insert("abc123".to_string());
    let (store, state) = MemoryStore::new(existing);

    let mut orch = SyncOrchestrator::new(source, store, 30, true);
    let stats = orch.run().await.unwrap();

    assert_eq!(stats.new, 0);
    assert_eq!(stats.skipped, 1);
    let state = state.lock().unwrap();
    assert!(state.created.is_empty());
    assert!(state.attachments.is_empty());
}
