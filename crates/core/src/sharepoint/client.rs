//! SharePoint client over Microsoft Graph, plus the list-item attachment
//! endpoint from the classic REST API (Graph has no attachment support for
//! list items).

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::SharePointConfig;
use crate::errors::SharePointError;
use crate::sharepoint::auth::{sharepoint_rest_scope, TokenClient, GRAPH_SCOPE};
use crate::transform::FieldMap;

const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Request timeout for Graph and REST calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Graph response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SiteResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListCollection {
    #[serde(default)]
    value: Vec<ListInfo>,
}

#[derive(Debug, Deserialize)]
struct ListInfo {
    id: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
}

/// One page of list items, with the continuation cursor for the next page.
#[derive(Debug, Deserialize)]
pub(crate) struct ItemsPage {
    #[serde(default)]
    pub value: Vec<ListItem>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListItem {
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CreatedItem {
    id: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Asynchronous SharePoint client.
///
/// Site and list identifiers are resolved lazily and memoized for the
/// client's lifetime; tokens are acquired once per run via
/// [`authenticate`](Self::authenticate).
pub struct SharePointClient {
    http: reqwest::Client,
    token_client: TokenClient,
    hostname: String,
    site_relative_url: String,
    list_name: String,
    graph_token: Option<String>,
    rest_token: Option<String>,
    site_id: Option<String>,
    list_id: Option<String>,
}

impl SharePointClient {
    pub fn new(config: &SharePointConfig, token_client: TokenClient) -> Self {
        let (hostname, site_relative_url) = parse_site_url(&config.site_url);
        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build reqwest client");
        info!(%hostname, %site_relative_url, list = %config.list_name, "created SharePointClient");
        Self {
            http,
            token_client,
            hostname,
            site_relative_url,
            list_name: config.list_name.clone(),
            graph_token: None,
            rest_token: None,
            site_id: None,
            list_id: None,
        }
    }

    /// Acquire the Graph and SharePoint REST tokens for this run.
    #[instrument(skip(self))]
    pub async fn authenticate(&mut self) -> Result<(), SharePointError> {
        let graph = self.token_client.acquire(GRAPH_SCOPE).await?;
        info!("Graph API authentication successful");

        let rest_scope = sharepoint_rest_scope(&self.hostname);
        let rest = self.token_client.acquire(&rest_scope).await?;
        info!("SharePoint REST API authentication successful");

        self.graph_token = Some(graph);
        self.rest_token = Some(rest);
        Ok(())
    }

    fn graph_token(&self) -> Result<&str, SharePointError> {
        self.graph_token
            .as_deref()
            .ok_or_else(|| SharePointError::NotAuthenticated {
                scope: "Graph".into(),
            })
    }

    fn rest_token(&self) -> Result<&str, SharePointError> {
        self.rest_token
            .as_deref()
            .ok_or_else(|| SharePointError::NotAuthenticated {
                scope: "SharePoint REST".into(),
            })
    }

    /// Resolve the site identifier by hostname and server-relative path.
    /// Memoized; a site's identifier does not change mid-run.
    #[instrument(skip(self))]
    pub async fn site_id(&mut self) -> Result<String, SharePointError> {
        if let Some(ref id) = self.site_id {
            return Ok(id.clone());
        }

        let url = format!(
            "{GRAPH_BASE}/sites/{}:{}",
            self.hostname, self.site_relative_url
        );
        let token = self.graph_token()?.to_string();
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SharePointError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let site: SiteResponse = resp.json().await?;
        info!(site_id = %site.id, "resolved site");
        self.site_id = Some(site.id.clone());
        Ok(site.id)
    }

    /// Resolve the target list identifier by exact display name. Memoized.
    #[instrument(skip(self))]
    pub async fn list_id(&mut self) -> Result<String, SharePointError> {
        if let Some(ref id) = self.list_id {
            return Ok(id.clone());
        }

        let site_id = self.site_id().await?;
        let url = format!("{GRAPH_BASE}/sites/{site_id}/lists");
        let token = self.graph_token()?.to_string();
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SharePointError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let lists: ListCollection = resp.json().await?;
        for list in lists.value {
            if list.display_name == self.list_name {
                info!(list_id = %list.id, "resolved list");
                self.list_id = Some(list.id.clone());
                return Ok(list.id);
            }
        }

        Err(SharePointError::ListNotFound(self.list_name.clone()))
    }

    /// Enumerate every `NoticeId` already present in the list.
    ///
    /// Follows the `@odata.nextLink` continuation cursor across all pages.
    /// This is the authoritative dedup source for a run; it is never cached
    /// across runs.
    #[instrument(skip(self))]
    pub async fn existing_notice_ids(&mut self) -> Result<HashSet<String>, SharePointError> {
        let site_id = self.site_id().await?;
        let list_id = self.list_id().await?;
        let token = self.graph_token()?.to_string();

        let mut existing = HashSet::new();
        let mut url = Some(format!(
            "{GRAPH_BASE}/sites/{site_id}/lists/{list_id}/items?$expand=fields&$select=fields"
        ));

        while let Some(page_url) = url {
            let resp = self
                .http
                .get(&page_url)
                .bearer_auth(&token)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SharePointError::ApiError {
                    status: status.as_u16(),
                    body,
                });
            }

            let page: ItemsPage = resp.json().await?;
            collect_notice_ids(&page, &mut existing);
            url = page.next_link;
        }

        info!(count = existing.len(), "found existing opportunities");
        Ok(existing)
    }

    /// Create a new list item with the given flat field mapping. Returns the
    /// store-assigned item identifier.
    #[instrument(skip(self, fields))]
    pub async fn create_list_item(&mut self, fields: &FieldMap) -> Result<String, SharePointError> {
        let site_id = self.site_id().await?;
        let list_id = self.list_id().await?;
        let token = self.graph_token()?.to_string();

        let url = format!("{GRAPH_BASE}/sites/{site_id}/lists/{list_id}/items");
        let payload = serde_json::json!({ "fields": fields });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SharePointError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let item: CreatedItem = resp.json().await?;
        debug!(item_id = %item.id, "created list item");
        Ok(item.id)
    }

    /// Upload an attachment to a list item via the SharePoint REST API.
    ///
    /// Failures are logged and reported as `false` rather than propagated:
    /// the item itself was already created, and a failed attachment must not
    /// undo that.
    #[instrument(skip(self, content))]
    pub async fn add_attachment(&self, item_id: &str, filename: &str, content: Vec<u8>) -> bool {
        let token = match self.rest_token() {
            Ok(t) => t.to_string(),
            Err(e) => {
                warn!(filename, error = %e, "cannot attach without REST token");
                return false;
            }
        };

        let url = format!(
            "https://{}{}/_api/web/lists/getbytitle('{}')/items({})/AttachmentFiles/add(FileName='{}')",
            self.hostname, self.site_relative_url, self.list_name, item_id, filename
        );

        let result = async {
            let resp = self
                .http
                .post(&url)
                .bearer_auth(&token)
                .header("Accept", "application/json;odata=verbose")
                .header("Content-Type", "application/octet-stream")
                .body(content)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await?;
            Ok::<_, reqwest::Error>(resp.status())
        }
        .await;

        match result {
            Ok(status) if status.is_success() => {
                info!(filename, item_id, "attached file");
                true
            }
            Ok(status) => {
                warn!(filename, item_id, %status, "attachment upload rejected");
                false
            }
            Err(e) => {
                warn!(filename, item_id, error = %e, "attachment upload failed");
                false
            }
        }
    }
}

/// Split a site URL like `https://tenant.sharepoint.com/sites/name` into
/// the hostname and the server-relative path.
fn parse_site_url(site_url: &str) -> (String, String) {
    let stripped = site_url
        .strip_prefix("https://")
        .unwrap_or(site_url)
        .trim_end_matches('/');
    match stripped.split_once('/') {
        Some((host, rest)) => (host.to_string(), format!("/{rest}")),
        None => (stripped.to_string(), String::new()),
    }
}

/// Pull each item's `NoticeId` field out of one page of results.
pub(crate) fn collect_notice_ids(page: &ItemsPage, out: &mut HashSet<String>) {
    for item in &page.value {
        if let Some(id) = item.fields.get("NoticeId").and_then(|v| v.as_str()) {
            out.insert(id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_site_url() {
        let (host, rel) = parse_site_url("https://acme.sharepoint.com/sites/contracts");
        assert_eq!(host, "acme.sharepoint.com");
        assert_eq!(rel, "/sites/contracts");
    }

    #[test]
    fn test_parse_site_url_root_site() {
        let (host, rel) = parse_site_url("https://acme.sharepoint.com");
        assert_eq!(host, "acme.sharepoint.com");
        assert_eq!(rel, "");
    }

    #[test]
    fn test_parse_site_url_nested_path() {
        let (host, rel) = parse_site_url("https://acme.sharepoint.com/sites/contracts/sub/");
        assert_eq!(host, "acme.sharepoint.com");
        assert_eq!(rel, "/sites/contracts/sub");
    }

    #[test]
    fn test_collect_notice_ids() {
        let json = r#"{
            "value": [
                {"fields": {"NoticeId": "a1", "Title": "First"}},
                {"fields": {"Title": "No notice id"}},
                {"fields": {"NoticeId": "b2"}}
            ],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/next"
        }"#;
        let page: ItemsPage = serde_json::from_str(json).unwrap();
        assert_eq!(
            page.next_link.as_deref(),
            Some("https://graph.microsoft.com/v1.0/next")
        );

        let mut ids = HashSet::new();
        collect_notice_ids(&page, &mut ids);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a1"));
        assert!(ids.contains("b2"));
    }

    #[test]
    fn test_items_page_last_page_has_no_next_link() {
        let page: ItemsPage = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert!(page.next_link.is_none());
        assert!(page.value.is_empty());
    }
}
