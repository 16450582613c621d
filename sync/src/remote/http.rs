//! HTTP implementation of the remote favorites store.

use super::RemoteFavorites;
use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use favorites_engine::{
    BusinessSnapshot, Category, CouponSnapshot, RemoteRow, Snapshot, Timestamp,
};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use tracing::debug;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// A favorited business as returned by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BusinessRow {
    business_id: String,
    favorited_at: DateTime<Utc>,
    business_name: Option<String>,
    business_type: Option<String>,
    address: Option<String>,
    rating: Option<f64>,
    image_url: Option<String>,
}

impl From<BusinessRow> for RemoteRow {
    fn from(row: BusinessRow) -> Self {
        let snapshot = row.business_name.map(|name| {
            Snapshot::Business(BusinessSnapshot {
                name,
                business_type: row.business_type,
                address: row.address,
                rating: row.rating,
                image_url: row.image_url,
            })
        });
        RemoteRow {
            entity_id: row.business_id,
            favorited_at: millis(row.favorited_at),
            snapshot,
        }
    }
}

/// A favorited coupon as returned by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CouponRow {
    coupon_id: String,
    favorited_at: DateTime<Utc>,
    title: Option<String>,
    business_name: Option<String>,
    discount: Option<String>,
    valid_until: Option<DateTime<Utc>>,
}

impl From<CouponRow> for RemoteRow {
    fn from(row: CouponRow) -> Self {
        let snapshot = row.title.map(|title| {
            Snapshot::Coupon(CouponSnapshot {
                title,
                business_name: row.business_name,
                discount: row.discount,
                valid_until: row.valid_until.map(millis),
            })
        });
        RemoteRow {
            entity_id: row.coupon_id,
            favorited_at: millis(row.favorited_at),
            snapshot,
        }
    }
}

fn millis(at: DateTime<Utc>) -> Timestamp {
    at.timestamp_millis().max(0) as Timestamp
}

/// Talks to `{base}/users/{identity}/favorites/{category}[/{entityId}]`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base: Url,
}

impl HttpRemote {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base })
    }

    /// Build an endpoint URL; path segments are percent-encoded.
    fn endpoint(&self, identity: &str, category: Category, entity_id: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::InvalidUrl(self.base.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["users", identity, "favorites", category.as_str()]);
            if let Some(entity_id) = entity_id {
                segments.push(entity_id);
            }
        }
        Ok(url)
    }

    async fn send_write(&self, method: Method, url: Url, idempotency_key: &str) -> Result<()> {
        debug!(%method, %url, "Sending favorites write");
        self.client
            .request(method, url)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch(&self, identity: &str, category: Category) -> Result<Vec<RemoteRow>> {
        let url = self.endpoint(identity, category, None)?;
        debug!(%url, "Fetching favorites");
        let response = self.client.get(url).send().await?.error_for_status()?;

        let rows = match category {
            Category::Business => response
                .json::<Vec<BusinessRow>>()
                .await?
                .into_iter()
                .map(RemoteRow::from)
                .collect(),
            Category::Coupon => response
                .json::<Vec<CouponRow>>()
                .await?
                .into_iter()
                .map(RemoteRow::from)
                .collect(),
        };
        Ok(rows)
    }
}

impl RemoteFavorites for HttpRemote {
    fn list<'a>(
        &'a self,
        identity: &'a str,
        category: Category,
    ) -> BoxFuture<'a, Result<Vec<RemoteRow>>> {
        self.fetch(identity, category).boxed()
    }

    fn set_favorite<'a>(
        &'a self,
        identity: &'a str,
        category: Category,
        entity_id: &'a str,
        favorited: bool,
        idempotency_key: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let url = self.endpoint(identity, category, Some(entity_id))?;
            let method = if favorited { Method::PUT } else { Method::DELETE };
            self.send_write(method, url, idempotency_key).await
        }
        .boxed()
    }

    fn clear<'a>(
        &'a self,
        identity: &'a str,
        category: Category,
        idempotency_key: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let url = self.endpoint(identity, category, None)?;
            self.send_write(Method::DELETE, url, idempotency_key).await
        }
        .boxed()
    }
}
