mod request;

pub use request::HttpFetcher;

use crate::error::FetchError;
use async_trait::async_trait;

/// Retrieves the raw body of a page.
///
/// Implementations perform exactly one request per call and do not retry;
/// retrying is left to the batch runner.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
