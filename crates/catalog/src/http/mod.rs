//! Audiobookshelf HTTP client.
//!
//! Talks to the server's REST API with a pre-issued API token. Every request
//! is wrapped in the configured [`RetryPolicy`]; streamed downloads are only
//! retried until the response headers arrive.

mod wire;

use self::wire::{ItemsResponse, LibrariesResponse, WireItem};
use crate::client::{CatalogClient, ContentStream, DetailOptions};
use crate::error::{Error, ErrorKind, Result};
use crate::models::{Library, RemoteItem};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use exn::ResultExt;
use futures::TryStreamExt;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

const USER_AGENT: &str = concat!("shelfsync/", env!("CARGO_PKG_VERSION"));

/// [`CatalogClient`] backed by an Audiobookshelf server.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    base: Url,
    token: String,
    timeout: Duration,
    retry: RetryPolicy,
}
impl HttpCatalog {
    /// Create a client for the server at `server` (e.g. `https://abs.example.com`).
    ///
    /// `timeout` bounds connecting and every JSON request; content downloads
    /// are only bounded by the connect timeout, since ebooks can be large and
    /// slow links are not an error.
    pub fn new(server: &str, token: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let base = Url::parse(server).or_raise(|| ErrorKind::InvalidUrl(server.to_string()))?;
        if base.cannot_be_a_base() {
            exn::bail!(ErrorKind::InvalidUrl(server.to_string()));
        }
        let client = Client::builder()
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .or_raise(|| ErrorKind::Network("could not build HTTP client".to_string()))?;
        Ok(Self {
            client,
            base,
            token: token.into(),
            timeout,
            retry,
        })
    }

    /// Build an endpoint URL from path segments (each one percent-encoded)
    /// and query pairs.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ErrorKind::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => exn::bail!(ErrorKind::Unauthorized),
            StatusCode::NOT_FOUND => exn::bail!(ErrorKind::NotFound(response.url().path().to_string())),
            other => exn::bail!(ErrorKind::Status(other.as_u16())),
        }
    }

    /// One attempt at a GET request, returning the response once headers
    /// arrive with a success status.
    async fn send(&self, url: &Url, bounded: bool) -> Result<Response> {
        let mut request = self.client.get(url.clone()).bearer_auth(&self.token);
        if bounded {
            request = request.timeout(self.timeout);
        }
        let response = request.send().await.map_err(|e| ErrorKind::Network(e.to_string()))?;
        Self::check_status(response)
    }

    /// GET and decode JSON, retrying according to the policy.
    async fn get_json<T: DeserializeOwned>(&self, what: &str, url: Url) -> Result<T> {
        let body = self
            .retry
            .run(what, || async {
                let response = self.send(&url, true).await?;
                let body = response.bytes().await.map_err(|e| ErrorKind::Network(e.to_string()))?;
                Ok::<_, Error>(body)
            })
            .await?;
        serde_json::from_slice(&body).or_raise(|| ErrorKind::Decode)
    }
}

/// Query pairs for `GET /api/items/{id}`.
fn detail_query(options: DetailOptions) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if options.expanded {
        query.push(("expanded", "1".to_string()));
    }
    let include: Vec<&str> = [(options.include_progress, "progress"), (options.include_authors, "authors")]
        .into_iter()
        .filter_map(|(wanted, name)| wanted.then_some(name))
        .collect();
    if !include.is_empty() {
        query.push(("include", include.join(",")));
    }
    query
}

#[async_trait]
impl CatalogClient for HttpCatalog {
    #[instrument(level = "debug", skip(self))]
    async fn list_libraries(&self) -> Result<Vec<Library>> {
        let url = self.endpoint(&["api", "libraries"], &[])?;
        let response: LibrariesResponse = self.get_json("list libraries", url).await?;
        Ok(response.libraries.into_iter().map(Library::from).collect())
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_items(&self, library_id: &str) -> Result<Vec<RemoteItem>> {
        // `limit=0` disables pagination; `minified=0` keeps series and author objects.
        let url = self.endpoint(&["api", "libraries", library_id, "items"], &[("limit", "0"), ("minified", "0")])?;
        let response: ItemsResponse = self.get_json("list items", url).await?;
        if let Some(total) = response.total
            && total != response.results.len() as u64
        {
            tracing::warn!(library = library_id, total, received = response.results.len(), "catalog returned a partial listing");
        }
        Ok(response.results.into_iter().map(RemoteItem::from).collect())
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_item_detail(&self, item_id: &str, options: DetailOptions) -> Result<RemoteItem> {
        let query = detail_query(options);
        let query: Vec<(&str, &str)> = query.iter().map(|(key, value)| (*key, value.as_str())).collect();
        let url = self.endpoint(&["api", "items", item_id], &query)?;
        let item: WireItem = self.get_json("fetch item", url).await?;
        Ok(RemoteItem::from(item))
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_content(&self, item_id: &str, ino: &str) -> Result<ContentStream> {
        let url = self.endpoint(&["api", "items", item_id, "file", ino, "download"], &[])?;
        let response = self.retry.run("download content", || self.send(&url, false)).await?;
        let stream = response
            .bytes_stream()
            .map_err(|e| exn::Exn::from(ErrorKind::Network(e.to_string())));
        Ok(Box::pin(stream))
    }
}
