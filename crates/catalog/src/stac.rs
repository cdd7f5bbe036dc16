//! STAC API client for NASA CMR-STAC.
//!
//! Searches are issued as `POST {root}/search` and every page is followed
//! through its `rel="next"` link until the result set is exhausted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cube_common::SessionConfig;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{CatalogError, Result};
use crate::item::{CatalogClient, SceneItem, SearchRequest};

/// CMR-STAC base URL.
pub const DEFAULT_STAC_URL: &str = "https://cmr.earthdata.nasa.gov/stac/";

/// LP DAAC cloud catalog holding the HLS collections.
pub const DEFAULT_CATALOG: &str = "LPCLOUD";

/// Upper bound on followed pages; guards against servers that loop.
const MAX_PAGES: usize = 10_000;

#[derive(Debug, Deserialize)]
struct CatalogLanding {
    id: String,
    #[serde(rename = "type", default)]
    type_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StacItem {
    id: String,
    collection: Option<String>,
    #[serde(default)]
    properties: StacProperties,
    #[serde(default)]
    assets: BTreeMap<String, StacAsset>,
}

#[derive(Debug, Default, Deserialize)]
struct StacProperties {
    datetime: Option<DateTime<Utc>>,
    start_datetime: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct StacAsset {
    href: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StacLink {
    rel: String,
    href: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    body: Option<serde_json::Value>,
    #[serde(default)]
    merge: bool,
}

#[derive(Debug, Deserialize)]
struct StacItemCollection {
    #[serde(default)]
    features: Vec<StacItem>,
    #[serde(default)]
    links: Vec<StacLink>,
}

/// How to fetch the page after the current one.
#[derive(Debug, Clone, PartialEq)]
pub enum NextPage {
    Get(String),
    Post { href: String, body: serde_json::Value },
}

/// One decoded page of search results.
#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<SceneItem>,
    pub next: Option<NextPage>,
}

impl ItemPage {
    /// Decode a STAC ItemCollection page.
    ///
    /// `request_body` is the body that produced this page; a `next` link
    /// with `merge: true` only carries the fields that change.
    pub fn from_json(text: &str, request_body: &serde_json::Value) -> Result<Self> {
        let collection: StacItemCollection = serde_json::from_str(text)?;

        let items = collection
            .features
            .into_iter()
            .map(scene_item)
            .collect::<Result<Vec<_>>>()?;

        let next = collection
            .links
            .into_iter()
            .find(|l| l.rel == "next")
            .map(|link| next_page(link, request_body));

        Ok(Self { items, next })
    }
}

fn scene_item(item: StacItem) -> Result<SceneItem> {
    let satellite_id = item
        .collection
        .ok_or_else(|| CatalogError::invalid_item(&item.id, "missing collection"))?;

    let datetime = item
        .properties
        .datetime
        .or(item.properties.start_datetime)
        .ok_or_else(|| CatalogError::invalid_item(&item.id, "missing datetime"))?;

    Ok(SceneItem {
        id: item.id,
        satellite_id,
        date: datetime.date_naive(),
        assets: item
            .assets
            .into_iter()
            .map(|(name, asset)| (name, asset.href))
            .collect(),
    })
}

fn next_page(link: StacLink, request_body: &serde_json::Value) -> NextPage {
    let is_post = link
        .method
        .as_deref()
        .map(|m| m.eq_ignore_ascii_case("POST"))
        .unwrap_or(false);

    if !is_post {
        return NextPage::Get(link.href);
    }

    let body = match (link.body, link.merge) {
        (Some(serde_json::Value::Object(patch)), true) => {
            let mut merged = request_body.clone();
            if let serde_json::Value::Object(map) = &mut merged {
                map.extend(patch);
            }
            merged
        }
        (Some(body), _) => body,
        (None, _) => request_body.clone(),
    };

    NextPage::Post {
        href: link.href,
        body,
    }
}

/// Client for one STAC catalog, e.g. `https://cmr.earthdata.nasa.gov/stac/LPCLOUD`.
pub struct StacClient {
    client: Client,
    root: String,
    id: String,
}

impl StacClient {
    /// Connect to `{url}/{catalog}` and confirm it serves a STAC catalog.
    #[instrument(skip(session))]
    pub async fn open(url: &str, catalog: &str, session: &SessionConfig) -> Result<Self> {
        let client = session
            .build_client()
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let root = format!("{}/{}", url.trim_end_matches('/'), catalog);

        let response = client.get(&root).send().await?;
        if !response.status().is_success() {
            warn!(url = %root, status = %response.status(), "STAC endpoint not found");
            return Err(CatalogError::Unavailable(root));
        }

        let landing: CatalogLanding = response
            .json()
            .await
            .map_err(|_| CatalogError::Unavailable(root.clone()))?;

        if let Some(t) = &landing.type_ {
            if t != "Catalog" && t != "Collection" {
                return Err(CatalogError::Unavailable(format!("{} (type {})", root, t)));
            }
        }

        info!(catalog = %landing.id, url = %root, "Opened STAC catalog");
        Ok(Self {
            client,
            root,
            id: landing.id,
        })
    }

    /// Catalog identifier reported by the endpoint.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    async fn fetch_page(&self, page: &NextPage) -> Result<(String, serde_json::Value)> {
        let (response, body) = match page {
            NextPage::Get(href) => (self.client.get(href).send().await?, serde_json::Value::Null),
            NextPage::Post { href, body } => {
                (self.client.post(href).json(body).send().await?, body.clone())
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        Ok((response.text().await?, body))
    }
}

#[async_trait]
impl CatalogClient for StacClient {
    #[instrument(skip(self, request), fields(catalog = %self.id, collections = ?request.collections))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SceneItem>> {
        let mut page = NextPage::Post {
            href: format!("{}/search", self.root),
            body: request.to_body(),
        };
        let mut items = Vec::new();

        for page_number in 1..=MAX_PAGES {
            let (text, body) = self.fetch_page(&page).await?;
            let decoded = ItemPage::from_json(&text, &body)?;
            debug!(page = page_number, items = decoded.items.len(), "Fetched search page");

            items.extend(decoded.items);
            match decoded.next {
                Some(next) if next != page => page = next,
                _ => break,
            }
        }

        info!(items = items.len(), "Catalog search complete");
        Ok(items)
    }
}
