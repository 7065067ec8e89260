use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use news_radar::storage::export_csv;
use news_radar::utils::text::truncate_text;
use news_radar::{JsonStorage, NewsRadar, RadarConfig};

const DEFAULT_STORE: &str = "articles.json";

#[derive(Parser)]
#[command(name = "radar", about = "AI news aggregator", version)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all sources, filter, and write the results.
    Fetch {
        /// Output file.
        #[arg(default_value = DEFAULT_STORE)]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Override the time window, in hours.
        #[arg(long)]
        since: Option<i64>,

        /// Override the per-source article cap.
        #[arg(long)]
        max_per_source: Option<usize>,

        /// Only keep articles not already in the output store.
        #[arg(long)]
        incremental: bool,

        /// State file used by incremental mode.
        #[arg(long)]
        state_file: Option<PathBuf>,

        /// List the configured sources without fetching anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored articles.
    List {
        /// Article store to read.
        #[arg(default_value = DEFAULT_STORE)]
        file: PathBuf,

        /// Only articles from this source.
        #[arg(long)]
        source: Option<String>,

        /// Only articles matching any of these keywords.
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, value_enum, default_value = "short")]
        format: ListFormat,
    },

    /// Delete the article store.
    Clear {
        #[arg(default_value = DEFAULT_STORE)]
        file: PathBuf,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Back up the article store.
    Backup {
        #[arg(default_value = DEFAULT_STORE)]
        file: PathBuf,

        /// Destination path; a timestamped sibling of FILE otherwise.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show store metadata and per-source statistics.
    Info {
        #[arg(default_value = DEFAULT_STORE)]
        file: PathBuf,

        #[arg(long)]
        state_file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListFormat {
    Short,
    Full,
    Count,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => RadarConfig::from_yaml(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RadarConfig::default(),
    };

    match cli.command {
        Command::Fetch {
            output,
            format,
            since,
            max_per_source,
            incremental,
            state_file,
            dry_run,
        } => {
            let mut config = config;
            if let Some(hours) = since {
                config.update_interval_hours = hours;
            }
            if let Some(cap) = max_per_source {
                config.max_articles_per_source = cap;
            }
            if let Some(path) = state_file {
                config.state_file = Some(path);
            }

            if dry_run {
                let sources = config.load_sources()?;
                println!("{} configured sources:", sources.len());
                for source in &sources {
                    println!("  {:?}  {}  {}", source.kind, source.name, source.url);
                }
                return Ok(());
            }

            let radar = NewsRadar::new(config)?;
            let outcome = if incremental {
                let storage = JsonStorage::new(&output);
                radar.aggregate_incremental_with_stats(&storage).await?
            } else {
                radar.aggregate_with_stats().await?
            };

            let stats = &outcome.stats;
            println!(
                "fetched {} articles, kept {} ({} sources ok, {} failed)",
                stats.total_fetched,
                stats.total_kept,
                stats.sources_processed,
                stats.sources_failed
            );
            if let Some(new) = stats.new_articles {
                println!("{} new since last run", new);
            }

            // Incremental mode already appended to the store.
            if !incremental {
                match format {
                    OutputFormat::Json => radar.save_to_json(&outcome.articles, &output)?,
                    OutputFormat::Csv => radar.save_to_csv(&outcome.articles, &output)?,
                }
            } else if matches!(format, OutputFormat::Csv) {
                let csv_path = output.with_extension("csv");
                export_csv(&outcome.articles, &csv_path)?;
            }
        }

        Command::List {
            file,
            source,
            keywords,
            limit,
            format,
        } => {
            let storage = JsonStorage::new(&file);
            let articles = if let Some(source) = &source {
                storage.get_by_source(source)?
            } else if !keywords.is_empty() {
                storage.get_by_keywords(&keywords, &[], false)?
            } else {
                storage.get_latest(limit)?
            };
            let articles: Vec<_> = articles.into_iter().take(limit).collect();

            match format {
                ListFormat::Count => println!("{}", articles.len()),
                ListFormat::Short => {
                    for article in &articles {
                        let date = article
                            .date
                            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "          ".to_string());
                        println!(
                            "{}  [{}] {}",
                            date,
                            article.source,
                            truncate_text(&article.title, 100)
                        );
                    }
                }
                ListFormat::Full => {
                    println!("{}", serde_json::to_string_pretty(&articles)?);
                }
            }
        }

        Command::Clear { file, yes } => {
            if !yes {
                bail!("refusing to delete {} without --yes", file.display());
            }
            JsonStorage::new(&file).clear()?;
            println!("cleared {}", file.display());
        }

        Command::Backup { file, output } => {
            let storage = JsonStorage::new(&file);
            match output {
                Some(dest) => {
                    storage.backup_to(&dest)?;
                    println!("backed up to {}", dest.display());
                }
                None => {
                    let backup = storage.backup()?;
                    println!("backed up to {}", backup.display());
                }
            }
        }

        Command::Info { file, state_file } => {
            let storage = JsonStorage::new(&file);
            match storage.load_metadata()? {
                Some(meta) => {
                    println!("store:        {}", file.display());
                    println!("version:      {}", meta.version);
                    println!("generated at: {}", meta.generated_at.to_rfc3339());
                    println!("articles:     {}", meta.count);
                    let sources = storage.get_sources()?;
                    println!("sources:      {}", sources.join(", "));
                }
                None => println!("no article store at {}", file.display()),
            }

            if let Some(path) = state_file {
                let state = news_radar::state::StateStore::new(path);
                if let Some(last) = state.get_last_fetch_time() {
                    println!("last fetch:   {}", last.to_rfc3339());
                }
                let mut stats: Vec<_> = state.all_source_stats().into_iter().collect();
                stats.sort_by(|a, b| a.0.cmp(&b.0));
                for (name, s) in stats {
                    println!(
                        "  {}: {} articles over {} fetches",
                        name, s.total_articles, s.fetch_count
                    );
                }
            }
        }
    }

    Ok(())
}
