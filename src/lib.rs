//! Turn a list of recipe page URLs into a printable LaTeX cookbook and a
//! plain grocery list.
//!
//! Each URL is fetched, its recipe regions (title, ingredients, steps and
//! the optional metadata) are located by the first layout strategy that
//! recognizes the page, and the surviving recipes are rendered in input
//! order. A URL that cannot be fetched or understood becomes a reported
//! [`Failure`] and never stops the batch.
//!
//! # Example
//! ```no_run
//! use mealprint::{process_urls, render_document, render_ingredient_list, AppConfig};
//!
//! # async fn run() -> Result<(), mealprint::MealprintError> {
//! let config = AppConfig::default();
//! let urls = vec!["https://example.com/tacos".to_string()];
//!
//! let batch = process_urls(&urls, &config).await?;
//! for failure in batch.failures() {
//!     eprintln!("FAILED {failure}");
//! }
//! let document = render_document(batch.recipes(), &config.document);
//! let groceries = render_ingredient_list(batch.recipes());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod input;
pub mod model;
pub mod pipelines;
pub mod render;

pub use builder::BatchRunnerBuilder;
pub use config::{load_config, AppConfig, DocumentConfig, PageBreak};
pub use error::{ExtractError, FetchError, MealprintError, ProcessError};
pub use extractors::{LayoutStrategy, Lookup, ParsingContext, RecipeExtractor, Region};
pub use fetchers::{Fetcher, HttpFetcher};
pub use input::parse_url_list;
pub use model::{BatchResult, Failure, Outcome, Recipe};
pub use pipelines::{BatchRunner, RetryPolicy};
pub use render::{escape_latex, image_file_name, render_ingredient_list, unescape_latex, LatexRenderer};

/// Fetch a single page and extract its recipe with the default settings
pub async fn fetch_recipe(url: &str) -> Result<Recipe, ProcessError> {
    let fetcher = HttpFetcher::new(&config::FetchConfig::default())?;
    let extractor = RecipeExtractor::default();
    pipelines::url::process(&fetcher, &extractor, RetryPolicy::none(), url).await
}

/// Process a whole batch with a runner configured from `config`
pub async fn process_urls(
    urls: &[String],
    config: &AppConfig,
) -> Result<BatchResult, MealprintError> {
    let runner = BatchRunner::builder().config(config).build()?;
    Ok(runner.run(urls).await)
}

/// Render recipes into one LaTeX document
pub fn render_document(recipes: &[Recipe], options: &DocumentConfig) -> String {
    LatexRenderer::new(options.clone()).render(recipes)
}
