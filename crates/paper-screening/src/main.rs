//! Paper Screening - Entry Point
//!
//! Command-line front end over the screening pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use paper_screening::config::Config;
use paper_screening::export::ExportFormat;
use paper_screening::models::{AnalysisVariant, SearchQuery, SortBy, SortOrder, SourceId};
use paper_screening::providers::{ProviderConfig, ProviderKind};
use paper_screening::sources::{ArxivAdapter, SemanticScholarAdapter};
use paper_screening::{AnalyzeOptions, HttpClient, Pipeline, ScreeningRequest};

#[derive(Parser, Debug)]
#[command(name = "paper-screening")]
#[command(about = "Search academic sources and screen papers with AI analysis")]
#[command(version)]
struct Cli {
    /// Directory for persisted history and status (in-memory when unset)
    #[arg(long, global = true, env = "PAPER_SCREENING_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// AI provider used for analysis
    #[arg(long, global = true, env = "AI_PROVIDER", ignore_case = true)]
    provider: Option<ProviderKind>,

    /// AI provider API key
    #[arg(long, global = true, env = "AI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name (provider default when unset)
    #[arg(long, global = true, env = "AI_MODEL")]
    model: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Search keywords
    keywords: String,

    /// Maximum number of papers
    #[arg(long, default_value = "10")]
    max: usize,

    /// Sources to query, in order (repeatable)
    #[arg(long = "source", value_parser = parse_source)]
    sources: Vec<SourceId>,

    /// Sort criterion
    #[arg(long, value_enum)]
    sort_by: Option<SortBy>,

    /// Sort direction
    #[arg(long, value_enum)]
    sort_order: Option<SortOrder>,
}

impl SearchArgs {
    fn query(&self) -> SearchQuery {
        let mut query = SearchQuery::new(self.keywords.clone(), self.max);
        query.sort_by = self.sort_by;
        query.sort_order = self.sort_order;
        query
    }

    fn sources(&self) -> Vec<SourceId> {
        if self.sources.is_empty() {
            SourceId::searchable().to_vec()
        } else {
            self.sources.clone()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the enabled sources and print the records
    Search(SearchArgs),

    /// Search, analyze every hit and save the results
    Screen {
        #[command(flatten)]
        search: SearchArgs,

        /// Read source content before analysis
        #[arg(long)]
        enrich: bool,

        /// Request the extended analysis fields
        #[arg(long)]
        extended: bool,
    },

    /// Resolve a single paper by arXiv id, Semantic Scholar id or URL
    Lookup {
        /// Identifier or landing page URL
        id: String,
    },

    /// Search arXiv by title, most relevant first
    Title {
        /// Title words
        title: String,

        /// Maximum number of papers
        #[arg(long, default_value = "10")]
        max: usize,
    },

    /// List papers citing a Semantic Scholar paper, one page at a time
    Citations {
        /// Semantic Scholar paper id, or a `DOI:` / `ARXIV:` prefixed id
        id: String,

        /// List the paper's references instead
        #[arg(long)]
        references: bool,

        /// Page size
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Offset of the first paper
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Search Semantic Scholar papers by author name
    ByAuthor {
        /// Author name
        name: String,

        /// Page size
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Offset of the first paper
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show a Semantic Scholar author profile
    Author {
        /// Semantic Scholar author id
        id: String,
    },

    /// Print the stored analysis history
    History,

    /// Export the stored history
    Export {
        /// Output format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Delete one stored result
    Delete {
        /// Result id
        id: uuid::Uuid,
    },

    /// Show provider, cache and history state
    Status,
}

fn parse_source(value: &str) -> Result<SourceId, String> {
    value.parse::<SourceId>().map_err(|e| e.to_string())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(kind) = cli.provider {
        let mut provider = ProviderConfig::new(kind, cli.api_key.clone());
        if let Some(model) = &cli.model {
            provider = provider.with_model(model.clone());
        }
        config = config.with_provider(provider);
    }
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir.clone());
    }
    Ok(config)
}

fn semantic_scholar(config: &Config) -> anyhow::Result<SemanticScholarAdapter> {
    Ok(SemanticScholarAdapter::new(HttpClient::new(config)?, config))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?cli.command,
        "Starting paper screening"
    );

    let config = build_config(&cli)?;
    let pipeline = Pipeline::new(&config)?;

    match &cli.command {
        Command::Search(args) => {
            let outcome = pipeline.aggregate_search(&args.query(), &args.sources()).await;
            print_json(&outcome)?;
        }
        Command::Screen {
            search,
            enrich,
            extended,
        } => {
            let variant = if *extended {
                AnalysisVariant::Extended
            } else {
                AnalysisVariant::Standard
            };
            let request = ScreeningRequest {
                query: search.query(),
                sources: search.sources(),
                options: AnalyzeOptions {
                    enrich: *enrich,
                    variant,
                },
            };
            let report = pipeline.screen(&request).await?;
            if let Some(failure) = &report.failure {
                tracing::warn!(kind = ?failure.kind, "{}", failure.message);
            }
            tracing::info!(
                analyzed = report.results.len(),
                duplicates = report.duplicates_skipped,
                stored = report.stored,
                "screening complete"
            );
            print_json(&report)?;
        }
        Command::Lookup { id } => match pipeline.lookup(id).await? {
            Some(paper) => print_json(&paper)?,
            None => anyhow::bail!("no source recognizes '{id}'"),
        },
        Command::Title { title, max } => {
            let adapter = ArxivAdapter::new(HttpClient::new(&config)?, &config);
            print_json(&adapter.search_by_title(title, *max).await?)?;
        }
        Command::Citations {
            id,
            references,
            limit,
            offset,
        } => {
            let adapter = semantic_scholar(&config)?;
            let page = if *references {
                adapter.references(id, *limit, *offset).await?
            } else {
                adapter.citations(id, *limit, *offset).await?
            };
            print_json(&page)?;
        }
        Command::ByAuthor {
            name,
            limit,
            offset,
        } => {
            let adapter = semantic_scholar(&config)?;
            print_json(&adapter.search_by_author(name, *limit, *offset).await?)?;
        }
        Command::Author { id } => match semantic_scholar(&config)?.get_author(id).await? {
            Some(profile) => print_json(&profile)?,
            None => anyhow::bail!("no Semantic Scholar author with id '{id}'"),
        },
        Command::History => print_json(&pipeline.get_history()?)?,
        Command::Export { format, output } => {
            let rendered = pipeline.export_history(*format)?;
            match output {
                Some(path) => {
                    std::fs::write(path, rendered)?;
                    tracing::info!(path = %path.display(), %format, "history exported");
                }
                None => println!("{rendered}"),
            }
        }
        Command::Delete { id } => {
            if !pipeline.delete_result(*id)? {
                anyhow::bail!("no stored result with id {id}");
            }
        }
        Command::Status => print_json(&pipeline.status()?)?,
    }

    Ok(())
}
