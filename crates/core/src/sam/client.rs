//! Asynchronous SAM.gov opportunities API client.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::SamConfig;
use crate::errors::SamError;
use crate::sam::models::{Opportunity, SearchPage};

/// Page size used by the window fetch loop.
const PAGE_SIZE: u32 = 10;

/// Defensive bound on the number of pages fetched in one run. SAM.gov
/// re-reports `totalRecords` on every page; if the total keeps growing the
/// convergence check would never trip, so the loop is cut off here.
const MAX_PAGES: u32 = 1000;

/// Request timeout for search calls.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Request timeout for resource downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// One page-issuing backend for the window fetch loop.
///
/// [`SamClient`] is the production implementation; tests drive
/// [`collect_window`] with an in-memory pager instead.
pub(crate) trait SearchPager {
    async fn search_page(
        &self,
        posted_from: &str,
        posted_to: &str,
        limit: u32,
        offset: u32,
    ) -> Result<SearchPage, SamError>;
}

/// Asynchronous SAM.gov API client.
#[derive(Clone)]
pub struct SamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limit_delay: Duration,
}

impl SamClient {
    pub fn new(config: &SamConfig) -> Self {
        let api_key = config.api_key.clone().unwrap_or_default();
        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build reqwest client");
        info!(base_url = %config.base_url, "created SamClient");
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            rate_limit_delay: Duration::from_millis(config.rate_limit_delay_ms),
        }
    }

    /// Fetch every opportunity posted in the last `days_back` days.
    ///
    /// Pages through the search endpoint with a fixed page size until the
    /// accumulated count reaches the reported total (at least one call is
    /// always issued; the total is only known after the first page). Any
    /// page failure is propagated, not retried.
    #[instrument(skip(self))]
    pub async fn fetch_all_opportunities(
        &self,
        days_back: i64,
    ) -> Result<Vec<Opportunity>, SamError> {
        let now = Utc::now();
        let posted_to = now.format("%m/%d/%Y").to_string();
        let posted_from = (now - chrono::Duration::days(days_back))
            .format("%m/%d/%Y")
            .to_string();

        info!(%posted_from, %posted_to, "fetching opportunities for window");
        collect_window(self, &posted_from, &posted_to, PAGE_SIZE, MAX_PAGES).await
    }

    /// Download one resource link, returning `None` on any failure.
    ///
    /// Attachment downloads are non-fatal by design: the caller logs and
    /// moves on to the next resource.
    #[instrument(skip(self))]
    pub async fn download_resource(&self, url: &str, filename: &str) -> Option<Vec<u8>> {
        let url_with_key = format!("{}?api_key={}", url, self.api_key);

        let result = async {
            let resp = self
                .http
                .get(&url_with_key)
                .timeout(DOWNLOAD_TIMEOUT)
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(SamError::ApiError {
                    status: status.as_u16(),
                    body: format!("HTTP {}", status),
                });
            }
            let bytes = resp.bytes().await?;
            Ok::<_, SamError>(bytes.to_vec())
        }
        .await;

        match result {
            Ok(bytes) => {
                debug!(filename, size = bytes.len(), "downloaded resource");
                tokio::time::sleep(self.rate_limit_delay).await;
                Some(bytes)
            }
            Err(e) => {
                warn!(filename, error = %e, "resource download failed");
                None
            }
        }
    }
}

impl SearchPager for SamClient {
    /// Issue one bounded search query. Dates are `MM/DD/YYYY`.
    ///
    /// Sleeps for the configured rate-limit delay after every successful
    /// call; SAM.gov caps clients at 10 requests per second.
    async fn search_page(
        &self,
        posted_from: &str,
        posted_to: &str,
        limit: u32,
        offset: u32,
    ) -> Result<SearchPage, SamError> {
        debug!(offset, limit, "fetching opportunities page");

        let limit_param = limit.to_string();
        let offset_param = offset.to_string();
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("postedFrom", posted_from),
                ("postedTo", posted_to),
                ("limit", limit_param.as_str()),
                ("offset", offset_param.as_str()),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SamError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        // The call itself succeeded, so the delay applies even if the body
        // turns out to be undecodable.
        tokio::time::sleep(self.rate_limit_delay).await;

        let page: SearchPage = resp.json().await?;
        Ok(page)
    }
}

/// Accumulate pages until the record count reaches the reported total.
///
/// Terminates once accumulated >= total (a reported total of 0 terminates
/// after the mandatory first page), or fails with
/// [`SamError::PaginationDiverged`] after `max_pages` pages.
pub(crate) async fn collect_window<P: SearchPager>(
    pager: &P,
    posted_from: &str,
    posted_to: &str,
    page_size: u32,
    max_pages: u32,
) -> Result<Vec<Opportunity>, SamError> {
    let mut all = Vec::new();
    let mut offset = 0u32;
    let mut pages = 0u32;
    let mut total = 0u64;

    loop {
        let page = pager
            .search_page(posted_from, posted_to, page_size, offset)
            .await?;
        pages += 1;
        total = page.total_records;
        all.extend(page.opportunities);

        info!(fetched = all.len(), total, "fetched opportunities page");

        if all.len() as u64 >= total {
            break;
        }
        if pages >= max_pages {
            return Err(SamError::PaginationDiverged { pages, total });
        }
        offset += page_size;
    }

    info!(count = all.len(), "window fetch complete");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fake pager serving `total` records out of a fixed pool.
    struct FixedPager {
        total: u64,
        calls: AtomicU32,
    }

    impl FixedPager {
        fn new(total: u64) -> Self {
            Self {
                total,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SearchPager for FixedPager {
        async fn search_page(
            &self,
            _posted_from: &str,
            _posted_to: &str,
            limit: u32,
            offset: u32,
        ) -> Result<SearchPage, SamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let start = offset as u64;
            let end = (start + limit as u64).min(self.total);
            let opportunities = (start..end)
                .map(|i| Opportunity {
                    notice_id: Some(format!("notice-{i}")),
                    ..Default::default()
                })
                .collect();
            Ok(SearchPage {
                opportunities,
                total_records: self.total,
            })
        }
    }

    /// Pager whose reported total grows by one on every call.
    struct GrowingPager {
        calls: AtomicU32,
    }

    impl SearchPager for GrowingPager {
        async fn search_page(
            &self,
            _posted_from: &str,
            _posted_to: &str,
            _limit: u32,
            _offset: u32,
        ) -> Result<SearchPage, SamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            Ok(SearchPage {
                opportunities: vec![Opportunity::default()],
                total_records: n + 2,
            })
        }
    }

    #[tokio::test]
    async fn test_collect_window_exact_multiple() {
        let pager = FixedPager::new(30);
        let records = collect_window(&pager, "01/01/2026", "01/31/2026", 10, 1000)
            .await
            .unwrap();
        assert_eq!(records.len(), 30);
        assert_eq!(pager.calls(), 3);
    }

    #[tokio::test]
    async fn test_collect_window_partial_last_page() {
        let pager = FixedPager::new(25);
        let records = collect_window(&pager, "01/01/2026", "01/31/2026", 10, 1000)
            .await
            .unwrap();
        assert_eq!(records.len(), 25);
        // ceil(25 / 10) = 3 page calls.
        assert_eq!(pager.calls(), 3);
        assert_eq!(records[0].notice_id.as_deref(), Some("notice-0"));
        assert_eq!(records[24].notice_id.as_deref(), Some("notice-24"));
    }

    #[tokio::test]
    async fn test_collect_window_empty() {
        let pager = FixedPager::new(0);
        let records = collect_window(&pager, "01/01/2026", "01/31/2026", 10, 1000)
            .await
            .unwrap();
        assert!(records.is_empty());
        // The total is only known after the first page.
        assert_eq!(pager.calls(), 1);
    }

    #[tokio::test]
    async fn test_collect_window_diverging_total_hits_page_bound() {
        let pager = GrowingPager {
            calls: AtomicU32::new(0),
        };
        let result = collect_window(&pager, "01/01/2026", "01/31/2026", 1, 50).await;
        assert!(matches!(
            result,
            Err(SamError::PaginationDiverged { pages: 50, .. })
        ));
    }

    #[tokio::test]
    async fn test_collect_window_propagates_page_error() {
        struct FailingPager;
        impl SearchPager for FailingPager {
            async fn search_page(
                &self,
                _f: &str,
                _t: &str,
                _l: u32,
                _o: u32,
            ) -> Result<SearchPage, SamError> {
                Err(SamError::ApiError {
                    status: 503,
                    body: "down".into(),
                })
            }
        }
        let result = collect_window(&FailingPager, "01/01/2026", "01/31/2026", 10, 1000).await;
        assert!(matches!(result, Err(SamError::ApiError { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_search_page_rate_limits_even_when_body_is_not_json() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // A 200 response whose body is not JSON: the call succeeded, so the
        // rate-limit delay must still be observed before the decode error
        // surfaces.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = sock.read(&mut buf).await;
            let body = "<html>maintenance</html>";
            let resp = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = sock.write_all(resp.as_bytes()).await;
        });

        let config = SamConfig {
            api_key_env: "SAM_API_KEY".into(),
            base_url: format!("http://{addr}"),
            days_to_sync: 30,
            rate_limit_delay_ms: 150,
            download_attachments: true,
            api_key: Some("test-key".into()),
        };
        let client = SamClient::new(&config);

        let start = std::time::Instant::now();
        let result = client.search_page("01/01/2026", "01/31/2026", 10, 0).await;

        assert!(matches!(result, Err(SamError::HttpError(_))));
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
