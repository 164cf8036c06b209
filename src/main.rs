use chrono::Local;
use clap::Parser;
use log::{info, warn};
use mealprint::config::FetchConfig;
use mealprint::{
    image_file_name, load_config, parse_url_list, render_ingredient_list, BatchRunner,
    HttpFetcher, LatexRenderer, Recipe,
};
use std::fmt::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mealprint", version)]
#[command(about = "Turn a list of recipe links into a printable LaTeX document and a grocery list")]
struct Args {
    /// File with one recipe URL per line
    urls_file: PathBuf,

    /// Directory in which the dated output directory is created
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Configuration file (default: mealprint.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of pages fetched at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not download recipe photos or reference them in the document
    #[arg(long)]
    no_images: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(concurrency) = args.concurrency {
        config.batch.concurrency = concurrency;
    }
    if let Some(timeout) = args.timeout {
        config.fetch.timeout = timeout;
    }
    if args.no_images {
        config.document.include_images = false;
    }

    let contents = tokio::fs::read_to_string(&args.urls_file)
        .await
        .map_err(|e| format!("cannot read {}: {}", args.urls_file.display(), e))?;
    let urls = parse_url_list(&contents);
    if urls.is_empty() {
        warn!("{} contains no URLs", args.urls_file.display());
    }

    let runner = BatchRunner::builder().config(&config).build()?;
    let batch = runner.run(&urls).await;

    let out_dir = args.output_dir.join(dated_dir_name(&config.output.dir_format)?);
    tokio::fs::create_dir_all(&out_dir).await?;

    if config.document.include_images {
        download_images(batch.recipes(), &out_dir, &config.fetch).await;
    }

    let document = LatexRenderer::new(config.document.clone()).render(batch.recipes());
    let recipes_path = out_dir.join(&config.output.recipes_file);
    tokio::fs::write(&recipes_path, document).await?;

    let ingredients_path = out_dir.join(&config.output.ingredients_file);
    tokio::fs::write(&ingredients_path, render_ingredient_list(batch.recipes())).await?;

    info!(
        "Wrote {} recipes to {} and {}",
        batch.recipes().len(),
        recipes_path.display(),
        ingredients_path.display()
    );

    for failure in batch.failures() {
        eprintln!("FAILED {failure}");
    }
    if !batch.failures().is_empty() {
        eprintln!("{} of {} URLs failed", batch.failures().len(), batch.len());
    }

    Ok(())
}

fn dated_dir_name(format: &str) -> Result<String, String> {
    let mut name = String::new();
    write!(name, "{}", Local::now().format(format))
        .map_err(|_| format!("invalid output.dir_format '{format}'"))?;
    Ok(name)
}

/// Saves recipe photos next to the document under the names it references.
///
/// A failed download only costs the picture: the document checks for the
/// file before including it.
async fn download_images(recipes: &[Recipe], dir: &Path, config: &FetchConfig) {
    let fetcher = match HttpFetcher::new(config) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            warn!("Skipping image downloads: {}", e);
            return;
        }
    };

    for (index, recipe) in recipes.iter().enumerate() {
        let Some(url) = recipe.image_url() else {
            continue;
        };
        let Some(file_name) = image_file_name(index, url) else {
            continue;
        };
        let path = dir.join(&file_name);

        let bytes = match fetcher.fetch_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Image {} not downloaded: {}", url, e);
                continue;
            }
        };
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            warn!("Cannot save {}: {}", path.display(), e);
        }
    }
}
