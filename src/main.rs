mod analysis;
mod config;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::scraper::chrome::ChromeSession;
use crate::scraper::pacing::PacingPolicy;
use crate::scraper::SiteScraper;

#[derive(Parser)]
#[command(name = "pattern-learn", about = "Category spec-table pattern learner", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl a category listing and learn which spec labels are checkmarks
    Learn {
        /// Category URL (list view)
        #[arg(long, env = "LEARNER_CATEGORY_URL")]
        category_url: String,

        /// Max listing pages to scan
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        pages: Option<u32>,

        /// Max items per page (0 for all)
        #[arg(long)]
        items_per_page: Option<usize>,

        /// Stop after N items (0 = unlimited)
        #[arg(long)]
        max_total_items: Option<usize>,

        /// Run the browser headless
        #[arg(long)]
        headless: bool,

        /// Base human-like delay in ms
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Output JSON file for the learned mapping (stdout if omitted)
        #[arg(long)]
        mapping_output: Option<PathBuf>,

        /// Output JSON file for the checkmark key list
        #[arg(long)]
        keys_output: Option<PathBuf>,
    },

    /// Mine the spec tables of a saved detail page
    Extract {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the product links of a saved listing page
    Links {
        #[arg(short, long)]
        file: PathBuf,

        /// Stop after N links (0 for all)
        #[arg(long)]
        cap: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "spec_pattern_learner=info,warn",
        1 => "spec_pattern_learner=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Learn {
            category_url,
            pages,
            items_per_page,
            max_total_items,
            headless,
            delay_ms,
            mapping_output,
            keys_output,
        } => {
            if let Some(pages) = pages {
                config.crawl.max_pages = pages;
            }
            if let Some(n) = items_per_page {
                config.crawl.max_items_per_page = n;
            }
            if let Some(n) = max_total_items {
                config.crawl.max_total_items = n;
            }
            if let Some(ms) = delay_ms {
                config.pacing.delay_ms = ms;
            }
            config.browser.headless |= headless;

            let report = {
                let _t = utils::Timer::start("Checkmark pattern pass");
                let pacing = PacingPolicy::from_config(&config.pacing);
                let session = ChromeSession::launch(&config.browser)
                    .await
                    .context("Failed to launch browser")?;
                Pipeline::new(config, pacing)?.run(&session, &category_url).await?
            };
            info!(
                "{} items scanned, {} skipped, {} pages visited",
                report.items_scanned, report.items_skipped, report.pages_visited
            );

            let mapping = analysis::aggregate(&report.checkmark_keys);
            if let Some(path) = &keys_output {
                storage::save_keys(&report.checkmark_keys, path)?;
            }
            storage::save_mapping(&mapping, mapping_output.as_deref())?;
        }

        Command::Extract { file } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let scraper = SiteScraper::new(&config)?;
            let detail = scraper
                .extractor()
                .extract_detail(&::scraper::Html::parse_document(&html));

            let specs: BTreeMap<_, _> = detail.specs.iter().collect();
            println!("{}", storage::to_pretty_json(&specs)?);
            let markers = detail.checkmark_labels(crate::scraper::cleaner::is_checkmark);
            println!("{} labels, {} checkmark labels: {}", specs.len(), markers.len(), markers.join(", "));
        }

        Command::Links { file, cap } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let scraper = SiteScraper::new(&config)?;
            let batch = scraper
                .link_collector()
                .collect(&::scraper::Html::parse_document(&html), cap.and_then(utils::limit));

            match batch.strategy {
                Some(strategy) => println!("{} links via `{}`:", batch.links.len(), strategy),
                None => println!("No link selector matched."),
            }
            for link in &batch.links {
                println!("  {}", link);
            }
        }
    }

    Ok(())
}
