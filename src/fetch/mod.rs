//! Authenticated retrieval and decode of the realtime feed.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Url;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::gtfs_rt::FeedMessage;
use crate::parser::parse_feed;

const SLOW_FETCH: Duration = Duration::from_secs(15);

/// Builds the client for `config`: a timed [`BasicClient`], wrapped with Basic
/// credentials and an API key header when configured.
pub fn build_client(config: &FetchConfig) -> Result<Box<dyn HttpClient>, FetchError> {
    let mut client: Box<dyn HttpClient> = Box::new(BasicClient::with_timeout(config.timeout)?);

    if let Some(credentials) = &config.credentials {
        client = Box::new(auth::BasicAuth::new(
            client,
            &credentials.username,
            &credentials.password,
        )?);
    }
    if let Some(api_key) = &config.api_key {
        client = Box::new(auth::ApiKey::new(client, &api_key.header_name, &api_key.key)?);
    }

    Ok(client)
}

/// Issues a single GET and returns the body of a successful response.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &Url,
) -> Result<Vec<u8>, FetchError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Protocol { status });
    }

    Ok(resp.bytes().await?.to_vec())
}

/// Fetches and decodes the feed. A feed without entities is an error.
#[tracing::instrument(skip_all, fields(url = %url))]
pub async fn fetch_feed<C: HttpClient + ?Sized>(
    client: &C,
    url: &Url,
) -> Result<FeedMessage, FetchError> {
    let start = Instant::now();
    let bytes = fetch_bytes(client, url).await?;

    let elapsed = start.elapsed();
    if elapsed > SLOW_FETCH {
        warn!(elapsed_secs = elapsed.as_secs(), "Feed fetch was slow");
    }
    debug!(bytes = bytes.len(), "Feed bytes received, parsing");

    let feed = parse_feed(&bytes)?;
    if feed.entity.is_empty() {
        return Err(FetchError::EmptyResult);
    }

    debug!(entity_count = feed.entity.len(), "Feed parsed successfully");
    Ok(feed)
}

/// Like [`fetch_feed`], but gives up with [`FetchError::Cancelled`] as soon as
/// `cancel` completes.
pub async fn fetch_feed_cancellable<C, F>(
    client: &C,
    url: &Url,
    cancel: F,
) -> Result<FeedMessage, FetchError>
where
    C: HttpClient + ?Sized,
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = cancel => Err(FetchError::Cancelled),
        result = fetch_feed(client, url) => result,
    }
}
