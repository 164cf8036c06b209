use crate::builder::BatchRunnerBuilder;
use crate::error::ProcessError;
use crate::extractors::RecipeExtractor;
use crate::fetchers::Fetcher;
use crate::model::{BatchResult, Recipe};
use crate::pipelines::url::{process, RetryPolicy};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Fetches and extracts an ordered list of URLs.
///
/// Pages are fetched concurrently, but every outcome lands in the slot of
/// its URL, so the result is in input order whatever order the fetches
/// finish in. A failing URL only ever affects its own slot.
pub struct BatchRunner {
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) extractor: Arc<RecipeExtractor>,
    pub(crate) concurrency: usize,
    pub(crate) retry: RetryPolicy,
    pub(crate) run_timeout: Option<Duration>,
}

impl BatchRunner {
    pub fn builder() -> BatchRunnerBuilder {
        BatchRunnerBuilder::default()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn extractor(&self) -> &RecipeExtractor {
        &self.extractor
    }

    pub async fn run(&self, urls: &[String]) -> BatchResult {
        info!(
            "Processing {} URLs ({} at a time)",
            urls.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (position, url) in urls.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let extractor = Arc::clone(&self.extractor);
            let semaphore = Arc::clone(&semaphore);
            let retry = self.retry;
            let url = url.clone();

            tasks.spawn(async move {
                // The semaphore is never closed, so the permit is always granted
                let _permit = semaphore.acquire_owned().await;
                let outcome = process(fetcher.as_ref(), &extractor, retry, &url).await;
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<Result<Recipe, ProcessError>>> =
            (0..urls.len()).map(|_| None).collect();

        let collect = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((position, outcome)) => {
                        match &outcome {
                            Ok(recipe) => info!(
                                "[{}/{}] {} -> {}",
                                position + 1,
                                urls.len(),
                                urls[position],
                                recipe.title()
                            ),
                            Err(e) => warn!(
                                "[{}/{}] {} failed: {}",
                                position + 1,
                                urls.len(),
                                urls[position],
                                e
                            ),
                        }
                        slots[position] = Some(outcome);
                    }
                    Err(e) => warn!("A batch worker died: {}", e),
                }
            }
        };

        let timed_out = match self.run_timeout {
            Some(limit) => timeout(limit, collect).await.is_err(),
            None => {
                collect.await;
                false
            }
        };

        if timed_out {
            warn!("Batch run timed out, abandoning unfinished URLs");
            tasks.abort_all();
        }

        let outcomes = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(if timed_out {
                        ProcessError::RunTimedOut
                    } else {
                        ProcessError::Aborted
                    })
                })
            })
            .collect();

        let result = BatchResult::from_outcomes(urls, outcomes);
        info!(
            "Batch finished: {} recipes, {} failures",
            result.recipes().len(),
            result.failures().len()
        );
        result
    }
}
