use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, FetchConfig};
use crate::extractors::RecipeExtractor;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::pipelines::{BatchRunner, RetryPolicy};
use crate::MealprintError;

/// Builder for configuring a [`BatchRunner`]
#[derive(Default)]
pub struct BatchRunnerBuilder {
    fetcher: Option<Arc<dyn Fetcher>>,
    extractor: Option<RecipeExtractor>,
    strategies: Option<Vec<String>>,
    fetch_config: FetchConfig,
    timeout: Option<Duration>,
    concurrency: Option<usize>,
    retry: Option<RetryPolicy>,
    run_timeout: Option<Duration>,
}

impl BatchRunnerBuilder {
    /// Seed every setting from loaded configuration
    ///
    /// Settings made afterwards on the builder take precedence.
    ///
    /// # Example
    /// ```
    /// use mealprint::{AppConfig, BatchRunner};
    ///
    /// let runner = BatchRunner::builder()
    ///     .config(&AppConfig::default())
    ///     .concurrency(1)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(runner.concurrency(), 1);
    /// ```
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.fetch_config = config.fetch.clone();
        self.strategies = Some(config.extractors.order.clone());
        self.concurrency = Some(config.batch.concurrency);
        self.retry = Some(RetryPolicy {
            attempts: config.fetch.retry_attempts,
            delay: Duration::from_millis(config.fetch.retry_delay_ms),
        });
        self.run_timeout = config.batch.run_timeout.map(Duration::from_secs);
        self
    }

    /// Use a custom page fetcher instead of plain HTTP
    pub fn fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Use a prepared extractor instead of one built from strategy names
    pub fn extractor(mut self, extractor: RecipeExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Names of the layout strategies to try, in order
    ///
    /// # Example
    /// ```
    /// use mealprint::BatchRunner;
    ///
    /// let runner = BatchRunner::builder()
    ///     .strategies(["json_ld", "microdata"])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(runner.extractor().strategy_names(), vec!["json_ld", "microdata"]);
    /// ```
    pub fn strategies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategies = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set a timeout for each HTTP request of the default fetcher
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Maximum number of URLs processed at the same time
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Deadline for the whole batch; unfinished URLs are reported as failures
    pub fn run_timeout(mut self, duration: Duration) -> Self {
        self.run_timeout = Some(duration);
        self
    }

    /// Build the runner
    ///
    /// # Errors
    /// Returns `MealprintError` if:
    /// - concurrency is zero
    /// - a strategy name is unknown, or the strategy list is empty
    /// - the HTTP client cannot be created
    pub fn build(self) -> Result<BatchRunner, MealprintError> {
        let concurrency = self.concurrency.unwrap_or(4);
        if concurrency == 0 {
            return Err(MealprintError::Builder(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let extractor = match (self.extractor, self.strategies) {
            (Some(extractor), _) => extractor,
            (None, Some(names)) => RecipeExtractor::from_names(names.as_slice())?,
            (None, None) => RecipeExtractor::default(),
        };

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let http = match self.timeout {
                    Some(timeout) => HttpFetcher::build_with(timeout, &self.fetch_config)?,
                    None => HttpFetcher::new(&self.fetch_config)?,
                };
                Arc::new(http)
            }
        };

        Ok(BatchRunner {
            fetcher,
            extractor: Arc::new(extractor),
            concurrency,
            retry: self.retry.unwrap_or_default(),
            run_timeout: self.run_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;

    #[test]
    fn test_defaults() {
        let runner = BatchRunner::builder().build().unwrap();
        assert_eq!(runner.concurrency, 4);
        assert_eq!(runner.retry, RetryPolicy::none());
        assert_eq!(runner.run_timeout, None);
        assert_eq!(
            runner.extractor.strategy_names(),
            vec!["emeals", "json_ld", "microdata", "html_class"]
        );
    }

    #[test]
    fn test_config_then_overrides() {
        let mut config = AppConfig::default();
        config.fetch.retry_attempts = 2;
        config.fetch.retry_delay_ms = 250;
        config.batch = BatchConfig {
            concurrency: 8,
            run_timeout: Some(60),
        };
        config.extractors.order = vec!["json_ld".to_string()];

        let runner = BatchRunner::builder()
            .config(&config)
            .concurrency(2)
            .build()
            .unwrap();

        assert_eq!(runner.concurrency, 2);
        assert_eq!(
            runner.retry,
            RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(250),
            }
        );
        assert_eq!(runner.run_timeout, Some(Duration::from_secs(60)));
        assert_eq!(runner.extractor.strategy_names(), vec!["json_ld"]);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let result = BatchRunner::builder().concurrency(0).build();
        assert!(matches!(result, Err(MealprintError::Builder(_))));
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let result = BatchRunner::builder().strategies(["emeals", "ocr"]).build();
        assert!(matches!(result, Err(MealprintError::Extract(_))));
    }
}
