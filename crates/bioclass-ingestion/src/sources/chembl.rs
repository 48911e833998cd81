//! ChEMBL API client.
//!
//! ChEMBL is a database of bioactive molecules with drug-like properties.
//! Only two resources are used here:
//!   - `target/search.json` — free-text target search
//!   - `activity.json` — bioactivities filtered by target and standard type
//!
//! API docs: https://chembl.gitbook.io/chembl-interface-documentation/web-resources/chembl-api
//! Endpoint: https://www.ebi.ac.uk/chembl/api/data
//!
//! Both resources are paginated; `page_meta.next` is followed until it is
//! null. A failure on any page fails the whole call, and so does a `next`
//! link pointing back at a page already fetched.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use bioclass_common::{BioclassError, ChemblConfig, Result, ScopedClient};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use super::BioactivityService;
use crate::models::{AssayRecord, TargetRecord};

/// Pagination block present on every list response.
#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    total_count: Option<u64>,
}

/// ChEMBL client for target search and activity retrieval.
pub struct ChemblClient {
    client: ScopedClient,
    base_url: Url,
    page_size: usize,
}

impl ChemblClient {
    pub fn new() -> Result<Self> {
        Self::from_config(&ChemblConfig::default())
    }

    pub fn from_config(config: &ChemblConfig) -> Result<Self> {
        let client = ScopedClient::for_base_url(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        // Trailing slash so relative joins keep the full API path.
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|e| BioclassError::Config(format!("Invalid base URL '{}': {}", base, e)))?;

        Ok(Self {
            client,
            base_url,
            page_size: config.page_size,
        })
    }

    fn endpoint(&self, resource: &str) -> Result<Url> {
        self.base_url
            .join(resource)
            .map_err(|e| BioclassError::Config(format!("Bad resource path '{}': {}", resource, e)))
    }

    /// Fetch every page of a list resource and collect the items under `key`.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        first: Url,
        key: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut visited: HashSet<Url> = HashSet::new();
        let mut next = Some(first);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(BioclassError::UpstreamUnavailable(format!(
                    "ChEMBL pagination loops back to {}",
                    url
                )));
            }
            let (page, meta) = self.fetch_page::<T>(&url, key).await?;
            pages += 1;
            items.extend(page);

            debug!(
                page = pages,
                collected = items.len(),
                total = meta.total_count,
                "Fetched ChEMBL page"
            );

            next = match meta.next {
                Some(path) if !path.is_empty() => Some(resolve_next(&self.base_url, &path)?),
                _ => None,
            };
        }

        Ok(items)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &Url,
        key: &str,
    ) -> Result<(Vec<T>, PageMeta)> {
        let resp = self.client.get(url.as_str())?.send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BioclassError::UpstreamUnavailable(format!(
                "ChEMBL returned HTTP {} for {}",
                status, url
            )));
        }

        let body: Value = resp.json().await?;
        parse_page(body, key)
    }
}

#[async_trait]
impl BioactivityService for ChemblClient {
    #[instrument(skip(self))]
    async fn search_targets(&self, query: &str) -> Result<Vec<TargetRecord>> {
        let mut url = self.endpoint("target/search.json")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &self.page_size.to_string());

        let targets: Vec<TargetRecord> = self.fetch_all(url, "targets").await?;
        info!(query = query, n_targets = targets.len(), "ChEMBL target search complete");
        Ok(targets)
    }

    #[instrument(skip(self))]
    async fn filter_assays(&self, target_id: &str, standard_type: &str) -> Result<Vec<AssayRecord>> {
        let mut url = self.endpoint("activity.json")?;
        url.query_pairs_mut()
            .append_pair("target_chembl_id", target_id)
            .append_pair("standard_type", standard_type)
            .append_pair("limit", &self.page_size.to_string());

        let activities: Vec<AssayRecord> = self.fetch_all(url, "activities").await?;
        info!(
            target = target_id,
            standard_type = standard_type,
            n_activities = activities.len(),
            "ChEMBL activity fetch complete"
        );
        Ok(activities)
    }
}

/// Split a list response into its items and pagination block.
///
/// A body without an array under `key` is malformed and fails the call.
fn parse_page<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<(Vec<T>, PageMeta)> {
    let items = match body.get_mut(key).map(Value::take) {
        Some(v @ Value::Array(_)) => serde_json::from_value::<Vec<T>>(v).map_err(|e| {
            BioclassError::UpstreamUnavailable(format!("Malformed '{}' in ChEMBL response: {}", key, e))
        })?,
        _ => {
            return Err(BioclassError::UpstreamUnavailable(format!(
                "ChEMBL response has no '{}' array",
                key
            )))
        }
    };

    let meta = match body.get_mut("page_meta").map(Value::take) {
        Some(v) if !v.is_null() => serde_json::from_value(v).map_err(|e| {
            BioclassError::UpstreamUnavailable(format!("Malformed page_meta in ChEMBL response: {}", e))
        })?,
        _ => PageMeta::default(),
    };

    Ok((items, meta))
}

/// `page_meta.next` is host-relative (`/chembl/api/data/...`) on the public
/// service; absolute URLs are accepted as-is.
fn resolve_next(base: &Url, next: &str) -> Result<Url> {
    base.join(next)
        .map_err(|e| BioclassError::UpstreamUnavailable(format!("Bad next page link '{}': {}", next, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chembl_client_new() {
        let client = ChemblClient::new().unwrap();
        assert_eq!(client.base_url.as_str(), "https://www.ebi.ac.uk/chembl/api/data/");
        assert_eq!(
            client.endpoint("activity.json").unwrap().as_str(),
            "https://www.ebi.ac.uk/chembl/api/data/activity.json"
        );
    }

    #[test]
    fn test_parse_target_page() {
        let body = json!({
            "page_meta": {"limit": 2, "next": "/chembl/api/data/target/search.json?limit=2&offset=2&q=coronavirus", "offset": 0, "total_count": 3},
            "targets": [
                {"target_chembl_id": "CHEMBL612575", "pref_name": "SARS coronavirus", "organism": "SARS coronavirus", "target_type": "ORGANISM"},
                {"target_chembl_id": "CHEMBL3927", "pref_name": "Replicase polyprotein 1ab", "organism": "SARS coronavirus", "target_type": "SINGLE PROTEIN"}
            ]
        });
        let (targets, meta): (Vec<TargetRecord>, PageMeta) = parse_page(body, "targets").unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].target_chembl_id, "CHEMBL3927");
        assert_eq!(meta.total_count, Some(3));
        assert!(meta.next.is_some());
    }

    #[test]
    fn test_parse_page_without_meta() {
        let body = json!({"activities": []});
        let (items, meta): (Vec<AssayRecord>, PageMeta) = parse_page(body, "activities").unwrap();
        assert!(items.is_empty());
        assert!(meta.next.is_none());
    }

    #[test]
    fn test_missing_array_is_upstream_error() {
        let body = json!({"error_message": "Internal error"});
        let err = parse_page::<AssayRecord>(body, "activities").unwrap_err();
        assert!(matches!(err, BioclassError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_malformed_items_is_upstream_error() {
        let body = json!({"targets": [{"pref_name": "no id"}]});
        let err = parse_page::<TargetRecord>(body, "targets").unwrap_err();
        assert!(matches!(err, BioclassError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_resolve_next_relative_and_absolute() {
        let base = Url::parse("https://www.ebi.ac.uk/chembl/api/data/").unwrap();
        let rel = resolve_next(&base, "/chembl/api/data/activity.json?limit=1000&offset=1000").unwrap();
        assert_eq!(rel.as_str(), "https://www.ebi.ac.uk/chembl/api/data/activity.json?limit=1000&offset=1000");

        let abs = resolve_next(&base, "http://127.0.0.1:9000/activity.json?offset=2").unwrap();
        assert_eq!(abs.host_str(), Some("127.0.0.1"));
    }

    // ── Pagination against a local server ───────────────────────────────────

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one response per connection; `route` maps the request target
    /// (path and query) to a status code and JSON body.
    async fn serve<F>(route: F) -> String
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&buf);
                let target = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, body) = route(&target);
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    fn local_client(base_url: String) -> ChemblClient {
        ChemblClient::from_config(&ChemblConfig {
            base_url,
            page_size: 1,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn activity(id: &str, value: &str) -> String {
        json!({"molecule_chembl_id": id, "standard_type": "IC50", "standard_value": value}).to_string()
    }

    #[tokio::test]
    async fn test_pages_are_concatenated_in_order() {
        let base = serve(|target| {
            if target.contains("page=2") {
                (200, format!(r#"{{"activities":[{}],"page_meta":{{"next":null,"total_count":3}}}}"#, activity("M3", "30")))
            } else {
                assert!(target.starts_with("/activity.json?target_chembl_id=CHEMBL3927&standard_type=IC50"));
                (
                    200,
                    format!(
                        r#"{{"activities":[{},{}],"page_meta":{{"next":"/activity.json?page=2","total_count":3}}}}"#,
                        activity("M1", "10"),
                        activity("M2", "20")
                    ),
                )
            }
        })
        .await;

        let records = local_client(base).filter_assays("CHEMBL3927", "IC50").await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.molecule_chembl_id.as_str()).collect();
        assert_eq!(ids, vec!["M1", "M2", "M3"]);
    }

    #[tokio::test]
    async fn test_failed_later_page_fails_whole_call() {
        let base = serve(|target| {
            if target.contains("page=2") {
                (503, r#"{"error":"unavailable"}"#.to_string())
            } else {
                (
                    200,
                    format!(
                        r#"{{"activities":[{}],"page_meta":{{"next":"/activity.json?page=2"}}}}"#,
                        activity("M1", "10")
                    ),
                )
            }
        })
        .await;

        let result = local_client(base).filter_assays("CHEMBL3927", "IC50").await;
        assert!(matches!(result, Err(BioclassError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_self_referencing_next_link_is_rejected() {
        let base = serve(|_| {
            (
                200,
                format!(
                    r#"{{"activities":[{}],"page_meta":{{"next":"/activity.json?page=2"}}}}"#,
                    activity("M1", "10")
                ),
            )
        })
        .await;

        let err = local_client(base).filter_assays("CHEMBL3927", "IC50").await.unwrap_err();
        assert!(matches!(err, BioclassError::UpstreamUnavailable(ref m) if m.contains("loops back")));
    }

    #[tokio::test]
    async fn test_empty_target_search_page() {
        let base = serve(|_| (200, r#"{"targets":[],"page_meta":{"next":null}}"#.to_string())).await;
        let targets = local_client(base).search_targets("unobtainium").await.unwrap();
        assert!(targets.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_coronavirus_search() {
        let client = ChemblClient::new().unwrap();
        let targets = client.search_targets("coronavirus").await.expect("ChEMBL search failed");
        assert!(!targets.is_empty());
    }
}
