use crate::error::{FetchError, ProcessError};
use crate::extractors::RecipeExtractor;
use crate::fetchers::Fetcher;
use crate::model::Recipe;
use log::{debug, warn};
use std::time::Duration;
use tokio::time::sleep;

/// How often a failed fetch is repeated before the URL is given up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub attempts: u32,
    /// Base delay; attempt `n` waits `delay * n`
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Process a URL to extract its recipe
///
/// This pipeline:
/// 1. Fetches the page, retrying transient failures per `retry`
/// 2. Hands the body to the extractor
///
/// Extraction failures are never retried: the same markup would fail the
/// same way.
pub async fn process(
    fetcher: &dyn Fetcher,
    extractor: &RecipeExtractor,
    retry: RetryPolicy,
    url: &str,
) -> Result<Recipe, ProcessError> {
    let body = fetch_with_retry(fetcher, retry, url).await?;
    let recipe = extractor.extract(url, &body)?;
    Ok(recipe)
}

async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    retry: RetryPolicy,
    url: &str,
) -> Result<String, FetchError> {
    let total = retry.attempts + 1;
    let mut attempt = 1;

    loop {
        debug!("Fetching {} (attempt {}/{})", url, attempt, total);
        match fetcher.fetch(url).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_retryable() && attempt < total => {
                warn!(
                    "Fetching {} failed (attempt {}/{}): {}",
                    url, attempt, total, e
                );
                let delay = retry.delay * attempt;
                debug!("Waiting {:?} before retry", delay);
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    const PAGE: &str = r#"
        <html><body>
            <h1 class="mainTitle">Toast</h1>
            <ul class="ingredients"><li>1 slice bread</li></ul>
            <ol class="instructions"><li>Toast it.</li></ol>
        </body></html>
    "#;

    /// Fails with the given status until `failures` calls have been made
    struct FlakyFetcher {
        failures: u32,
        status: StatusCode,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(FetchError::Status(self.status))
            } else {
                Ok(PAGE.to_string())
            }
        }
    }

    fn flaky(failures: u32, status: StatusCode) -> FlakyFetcher {
        FlakyFetcher {
            failures,
            status,
            calls: AtomicU32::new(0),
        }
    }

    fn retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let fetcher = flaky(2, StatusCode::SERVICE_UNAVAILABLE);
        let recipe = process(&fetcher, &RecipeExtractor::default(), retry(2), "https://x")
            .await
            .unwrap();
        assert_eq!(recipe.title(), "Toast");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_last_attempt() {
        let fetcher = flaky(5, StatusCode::BAD_GATEWAY);
        let err = process(&fetcher, &RecipeExtractor::default(), retry(1), "https://x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Fetch(FetchError::Status(StatusCode::BAD_GATEWAY))
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let fetcher = flaky(1, StatusCode::NOT_FOUND);
        let err = process(&fetcher, &RecipeExtractor::default(), retry(3), "https://x")
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Fetch(FetchError::Status(_))));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
