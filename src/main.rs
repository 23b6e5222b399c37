mod db;
mod error;
mod fetcher;
mod index;
mod model;
mod output;
mod parser;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use parser::DigestParser;
use settings::Settings;

#[derive(Parser)]
#[command(name = "weekly_scraper", about = "Weekly digest pages to structured JSON")]
struct Cli {
    /// Settings file (default: ./weekly.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the weekly index and populate the page queue
    Init,
    /// Fetch unvisited issue pages
    Scrape {
        /// Max pages to fetch (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse fetched pages into JSON records
    Process {
        /// Max pages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape + process in one pipeline
    Run {
        /// Max pages to scrape+process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse a single file or URL and print the record
    Parse {
        /// Local HTML file or http(s) URL
        target: String,
    },
    /// Show queue statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    // Fail on a bad selector before touching the network.
    let digest_parser = DigestParser::new(&settings)?;

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let client = fetcher::build_client(&settings.fetch)?;
            let links = index::fetch_issue_links(&client, &settings).await?;
            let inserted = db::insert_pages(&conn, &links)?;
            println!("Inserted {} new issue URLs ({} total found)", inserted, links.len());
            Ok(())
        }
        Commands::Scrape { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first or all pages are fetched.");
                return Ok(());
            }
            println!("Fetching {} pages...", pages.len());
            let client = fetcher::build_client(&settings.fetch)?;
            let stats = fetcher::scrape_pages(&conn, &client, pages, &settings.fetch).await?;
            println!(
                "Done: {} fetched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'scrape' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &digest_parser, &pages, &settings.output_dir)?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first.");
                return Ok(());
            }

            // Phase 1: fetch
            let t_scrape = Instant::now();
            println!("Pipeline: fetching {} pages...", pages.len());
            let client = fetcher::build_client(&settings.fetch)?;
            let stats = fetcher::scrape_pages(&conn, &client, pages, &settings.fetch).await?;
            println!(
                "Fetched {} pages ({} ok, {} errors) in {:.1}s",
                stats.total,
                stats.ok,
                stats.errors,
                t_scrape.elapsed().as_secs_f64()
            );

            // Phase 2: process
            let t_process = Instant::now();
            let unprocessed = db::fetch_unprocessed(&conn, None)?;
            if unprocessed.is_empty() {
                println!("Nothing to process (all fetched pages had errors).");
                return Ok(());
            }
            println!("Processing {} pages...", unprocessed.len());
            let counts = process_pages(&conn, &digest_parser, &unprocessed, &settings.output_dir)?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            counts.print();
            Ok(())
        }
        Commands::Parse { target } => {
            let html = if target.starts_with("http://") || target.starts_with("https://") {
                let client = fetcher::build_client(&settings.fetch)?;
                fetcher::fetch_with_retry(&client, &target, &settings.fetch).await?
            } else {
                std::fs::read_to_string(&target)
                    .with_context(|| format!("Failed to read {}", target))?
            };
            let record = digest_parser.parse_html(&html);
            info!(
                sections = ?record.sections.headings().collect::<Vec<_>>(),
                items = record.item_count(),
                "Parsed {:?}",
                record.title
            );
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            println!("Visited:   {}", s.visited);
            println!("Unvisited: {}", s.unvisited);
            println!("Fetched:   {}", s.fetched);
            println!("Errors:    {}", s.errors);
            println!("Processed: {}", s.processed);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessCounts {
    issues: usize,
    sections: usize,
    items: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} issues, {} sections, {} items.",
            self.issues, self.sections, self.items,
        );
    }
}

fn process_pages(
    conn: &rusqlite::Connection,
    digest_parser: &DigestParser,
    pages: &[db::ScrapedPage],
    output_dir: &Path,
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        issues: 0,
        sections: 0,
        items: 0,
    };

    for chunk in pages.chunks(200) {
        let records: Vec<_> = chunk
            .par_iter()
            .map(|page| digest_parser.process_page(page))
            .collect();

        let mut rows = Vec::with_capacity(chunk.len());
        for (page, record) in chunk.iter().zip(records) {
            let path = output::write_record(output_dir, &record, &page.slug)?;
            counts.issues += 1;
            counts.sections += record.sections.len();
            counts.items += record.item_count();
            rows.push(db::IssueRow {
                slug: page.slug.clone(),
                page_data_id: page.page_data_id,
                url: page.url.clone(),
                section_count: record.sections.len(),
                item_count: record.item_count(),
                record_json: serde_json::to_string(&record)?,
                output_path: path.display().to_string(),
                title: record.title,
                date: record.date,
                cover: record.cover,
            });
        }

        db::save_issues(conn, &rows)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!(
        "Processed {} issues into {:?}",
        counts.issues, output_dir
    );
    Ok(counts)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
