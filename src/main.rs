use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use logmill::core::config::Config;
use logmill::core::normalizer::{self, LogFormat};
use logmill::core::search::SearchRequest;
use logmill::core::TimeRange;
use logmill::feeds::{FileFeed, LineFeed, StdinFeed};
use logmill::Session;

#[derive(Parser)]
#[command(name = "logmill", about = "logmill — parse logs, discover their schema, summarise them")]
struct Cli {
    /// Write debug logs to /tmp/logmill-debug.log (tail -f to inspect).
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse each line and print the structured result as JSON lines.
    Parse(Sources),
    /// Field paths seen in the logs, with the number of logs carrying each.
    Schema {
        #[command(flatten)]
        sources: Sources,
        #[command(flatten)]
        window: Window,
        /// Restrict to these sources (repeatable).
        #[arg(long = "app")]
        apps: Vec<String>,
    },
    /// Totals by level, by source and by month.
    Dashboard {
        #[command(flatten)]
        sources: Sources,
        #[command(flatten)]
        window: Window,
    },
    /// Search logs by text, level and time.
    Search {
        #[command(flatten)]
        sources: Sources,
        #[command(flatten)]
        window: Window,
        /// Case-insensitive substring of the raw line.
        #[arg(long)]
        term: Option<String>,
        #[arg(long)]
        level: Option<String>,
        /// Restrict to one source.
        #[arg(long)]
        app: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Page size; 0 returns every match.
        #[arg(long, default_value_t = 50)]
        limit: u64,
        /// `asc` or `desc` on ingest time.
        #[arg(long, default_value = "desc")]
        sort: String,
    },
}

#[derive(Args)]
struct Sources {
    /// Input format. Defaults to `ingest.default_format` from config.
    #[arg(short, long)]
    format: Option<String>,
    /// Files to read; `-` or nothing reads stdin.
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct Window {
    /// Inclusive lower bound on ingest time (RFC 3339).
    #[arg(long)]
    from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on ingest time (RFC 3339).
    #[arg(long)]
    to: Option<DateTime<Utc>>,
}

impl Window {
    fn range(&self) -> Option<TimeRange> {
        TimeRange::from_bounds(self.from, self.to)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(cli.debug, &config)?;

    let cancel = CancellationToken::new();
    let deadline = cancel.clone();
    let timeout = config.query.timeout();
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        tracing::warn!(?timeout, "deadline reached, cancelling");
        deadline.cancel();
    });

    let output = match cli.command {
        Command::Parse(sources) => {
            let format = resolve_format(&sources, &config);
            for mut feed in open_feeds(&sources.files).await? {
                for line in feed.read_all().await? {
                    let data = normalizer::parse(&line, format).ok();
                    let level = data.as_ref().map(normalizer::derive_level).unwrap_or_default();
                    let record = serde_json::json!({ "raw": line, "data": data, "level": level });
                    println!("{record}");
                }
            }
            return Ok(());
        }
        Command::Schema { sources, window, apps } => {
            let session = load(&sources, &config, &cancel).await?;
            serde_json::to_value(session.schema(&apps, window.range(), &cancel).await?)?
        }
        Command::Dashboard { sources, window } => {
            let session = load(&sources, &config, &cancel).await?;
            serde_json::to_value(session.dashboard(window.range(), &cancel).await?)?
        }
        Command::Search {
            sources,
            window,
            term,
            level,
            app,
            page,
            limit,
            sort,
        } => {
            let session = load(&sources, &config, &cancel).await?;
            let request = SearchRequest {
                page,
                limit,
                sort_order: sort,
                search_term: term.unwrap_or_default(),
                log_level: level.unwrap_or_default(),
                from: window.from,
                to: window.to,
                app_id: app.unwrap_or_default(),
                ..Default::default()
            };
            serde_json::to_value(session.search(request, &cancel).await?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(debug: bool, config: &Config) -> anyhow::Result<()> {
    if debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/logmill-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("logmill debug log started — tail -f /tmp/logmill-debug.log");
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
            )
            .init();
    }
    Ok(())
}

fn resolve_format(sources: &Sources, config: &Config) -> LogFormat {
    match &sources.format {
        Some(tag) => LogFormat::from_tag(Some(tag.as_str())),
        None => config.ingest.default_format,
    }
}

async fn open_feeds(files: &[PathBuf]) -> anyhow::Result<Vec<Box<dyn LineFeed>>> {
    if files.is_empty() {
        return Ok(vec![Box::new(StdinFeed::new())]);
    }
    let mut feeds: Vec<Box<dyn LineFeed>> = Vec::with_capacity(files.len());
    for path in files {
        if path.as_os_str() == "-" {
            feeds.push(Box::new(StdinFeed::new()));
        } else {
            feeds.push(Box::new(FileFeed::open(path).await?));
        }
    }
    Ok(feeds)
}

async fn load(sources: &Sources, config: &Config, cancel: &CancellationToken) -> anyhow::Result<Session> {
    let format = resolve_format(sources, config);
    let mut session = Session::new(config);
    for mut feed in open_feeds(&sources.files).await? {
        session.load(feed.as_mut(), Some(format), cancel).await?;
    }
    Ok(session)
}
