// Record API client over reqwest. Pages through `/api/collections/<name>/records`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::SourceError;
use crate::fetch::{RecordQuery, StatsSource};
use crate::models::{RawEntityRecord, RawHostRecord, RecordPage, SystemRef};
use crate::version;

const HOST_COLLECTION: &str = "system_stats";
const ENTITY_COLLECTION: &str = "container_stats";
const SYSTEMS_COLLECTION: &str = "systems";
const PER_PAGE: u32 = 500;
/// Hard stop for runaway paging.
const MAX_PAGES: u32 = 200;

pub struct HttpStatsSource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStatsSource {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(version::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{}/records", self.base_url, collection)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Option<&str>,
        sort: &str,
        page: u32,
    ) -> Result<RecordPage<T>, SourceError> {
        let page_str = page.to_string();
        let per_page = PER_PAGE.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("page", page_str.as_str()),
            ("perPage", per_page.as_str()),
            ("sort", sort),
        ];
        if let Some(f) = filter {
            params.push(("filter", f));
        }

        let mut req = self.client.get(self.records_url(collection)).query(&params);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::Auth(status.as_u16()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode(e.to_string()))
    }

    /// Fetch every page matching `filter`.
    async fn get_all<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Option<&str>,
        sort: &str,
    ) -> Result<Vec<T>, SourceError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch: RecordPage<T> = self.get_page(collection, filter, sort, page).await?;
            // totalPages is absent (0) or -1 when the server skips counting.
            let last = batch.items.len() < batch.per_page.max(1) as usize
                || (batch.total_pages > 0 && i64::from(batch.page) >= batch.total_pages);
            items.extend(batch.items);
            if last {
                break;
            }
            if page >= MAX_PAGES {
                warn!(
                    collection,
                    pages = page,
                    items = items.len(),
                    total_pages = batch.total_pages,
                    "page limit reached; result truncated"
                );
                break;
            }
            page += 1;
        }
        debug!(collection, pages = page, items = items.len(), "records fetched");
        Ok(items)
    }

    /// List systems registered on the instance.
    #[instrument(skip(self), fields(operation = "list_systems"))]
    pub async fn list_systems(&self) -> Result<Vec<SystemRef>, SourceError> {
        self.get_all(SYSTEMS_COLLECTION, None, "name").await
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    #[instrument(skip(self, query), fields(system_id = %system.id, operation = "fetch_host_records"))]
    async fn fetch_host_records(
        &self,
        system: &SystemRef,
        query: &RecordQuery,
    ) -> Result<Vec<RawHostRecord>, SourceError> {
        self.get_all(HOST_COLLECTION, Some(&query.filter), "created").await
    }

    #[instrument(skip(self, query), fields(system_id = %system.id, operation = "fetch_entity_records"))]
    async fn fetch_entity_records(
        &self,
        system: &SystemRef,
        query: &RecordQuery,
    ) -> Result<Vec<RawEntityRecord>, SourceError> {
        self.get_all(ENTITY_COLLECTION, Some(&query.filter), "created").await
    }
}
