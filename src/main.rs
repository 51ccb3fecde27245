//! CLI entry point for the GTFS-RT departures tool.
//!
//! Provides subcommands for listing upcoming departures at one or more stops,
//! dumping a decoded feed, and listing the configured feed groups.

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use gtfs_rt_departures::{
    config::{DEFAULT_GROUP, FeedEndpoints, group_for_route},
    departures::{QueryOptions, query_departures},
    error::ConfigError,
    fetch::{BasicClient, FeedFetcher, SourceFetcher, auth::ApiKey},
    merge::{FailurePolicy, MergeOptions},
    output::{OutputFormat, write_departures, write_feed_json},
    parser::parse_feed,
    query::{DepartureQuery, FilterOptions},
    stops::StopNames,
};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Per-request limit; `--timeout` bounds the whole query.
const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Parser)]
#[command(name = "gtfs_rt_departures")]
#[command(about = "Upcoming departures from GTFS-RT subway feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List upcoming departures at one or more stops
    Departures {
        /// API key sent as x-api-key. Get your own at https://api.mta.info/
        #[arg(short = 'k', long, env = "MTA_API_KEY", hide_env_values = true)]
        api_key: String,

        /// One or more stop ids, matched exactly (e.g. R09S)
        #[arg(short = 's', long = "stop-ids", num_args = 1.., required = true)]
        stop_ids: Vec<String>,

        /// Only trips heading this way, N or S
        #[arg(short, long)]
        direction: Option<String>,

        /// Only this route, i.e. N, Q, R, W
        #[arg(short, long)]
        route: Option<String>,

        /// Feed groups, URLs or file paths to query (default: the route's group, else nqrw)
        #[arg(short = 'f', long = "feed")]
        feeds: Vec<String>,

        /// JSON file mapping feed groups to endpoints
        #[arg(long)]
        feeds_config: Option<String>,

        /// GTFS stops.txt used to name stops
        #[arg(long)]
        stops: Option<String>,

        /// Time zone departures are shown in
        #[arg(long, default_value = "America/New_York")]
        tz: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Skip feeds that fail instead of failing the query
        #[arg(long, default_value_t = false)]
        partial: bool,

        /// Give up if the feeds have not all arrived after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep feed order instead of sorting by departure time
        #[arg(long, default_value_t = false)]
        unsorted: bool,

        /// Match both platforms of stop ids given without N/S suffix
        #[arg(long, default_value_t = false)]
        expand_directions: bool,
    },
    /// Fetch one feed and print it as JSON
    Dump {
        /// Feed group, URL or file path
        #[arg(value_name = "FEED")]
        source: String,

        #[arg(short = 'k', long, env = "MTA_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[arg(long)]
        feeds_config: Option<String>,
    },
    /// List the configured feed groups
    Feeds {
        #[arg(long)]
        feeds_config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gtfs_rt_departures.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_departures.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Departures {
            api_key,
            stop_ids,
            direction,
            route,
            feeds,
            feeds_config,
            stops,
            tz,
            format,
            partial,
            timeout,
            unsorted,
            expand_directions,
        } => {
            let endpoints = load_endpoints(feeds_config.as_deref())?;
            let selected = select_endpoints(&endpoints, &feeds, route.as_deref())?;

            let mut query = DepartureQuery::new(stop_ids);
            query.direction = direction;
            query.route = route;
            if expand_directions {
                query = query.with_platforms();
            }

            let mut labels = StopNames::builtin();
            if let Some(path) = stops {
                labels.extend(
                    StopNames::load(&path).with_context(|| format!("loading stops from {path}"))?,
                );
            }

            let options = QueryOptions {
                merge: MergeOptions {
                    policy: if partial {
                        FailurePolicy::Partial
                    } else {
                        FailurePolicy::FailFast
                    },
                    deadline: timeout.map(Duration::from_secs),
                },
                filter: FilterOptions {
                    zone: parse_zone(&tz)?,
                    sort: !unsorted,
                },
            };

            info!(
                endpoints = ?selected,
                stops = ?query.stop_ids,
                direction = query.direction.as_deref(),
                route = query.route.as_deref(),
                "Querying departures"
            );

            let fetcher = SourceFetcher::new(ApiKey::mta(http_client()?, &api_key)?);
            let departures = query_departures(
                &fetcher,
                &selected,
                &query,
                Utc::now(),
                &options,
                &labels,
            )
            .await?;

            for failure in &departures.failures {
                eprintln!("warning: {failure} (skipped)");
            }
            info!(
                departures = departures.records.len(),
                skipped = departures.failures.len(),
                "Query finished"
            );
            write_departures(std::io::stdout().lock(), &departures.records, format)?;
        }
        Commands::Dump {
            source,
            api_key,
            feeds_config,
        } => {
            let endpoints = load_endpoints(feeds_config.as_deref())?;
            let endpoint = endpoints.resolve(&source)?;

            let bytes = match api_key {
                Some(key) => {
                    SourceFetcher::new(ApiKey::mta(http_client()?, &key)?)
                        .fetch(&endpoint)
                        .await
                }
                None => SourceFetcher::new(http_client()?).fetch(&endpoint).await,
            }
            .with_context(|| format!("fetching {endpoint}"))?;

            let feed = parse_feed(&bytes).with_context(|| format!("decoding {endpoint}"))?;
            debug!(entity_count = feed.entity.len(), "Feed parsed successfully");
            write_feed_json(std::io::stdout().lock(), &feed)?;
        }
        Commands::Feeds { feeds_config } => {
            let endpoints = load_endpoints(feeds_config.as_deref())?;
            for (group, endpoint) in endpoints.iter() {
                println!("{group:<8} {endpoint}");
            }
        }
    }

    Ok(())
}

fn http_client() -> Result<BasicClient> {
    Ok(BasicClient::with_timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))?)
}

/// The built-in NYCT groups, overridden by `path` if given.
fn load_endpoints(path: Option<&str>) -> Result<FeedEndpoints> {
    let mut endpoints = FeedEndpoints::default();
    if let Some(path) = path {
        endpoints.merge(
            FeedEndpoints::load(path).with_context(|| format!("loading feed config {path}"))?,
        );
    }
    Ok(endpoints)
}

/// Explicit feeds win; otherwise the route's group, otherwise the default group.
fn select_endpoints(
    endpoints: &FeedEndpoints,
    feeds: &[String],
    route: Option<&str>,
) -> Result<Vec<String>> {
    if !feeds.is_empty() {
        return feeds
            .iter()
            .map(|feed| Ok(endpoints.resolve(feed)?))
            .collect();
    }
    let group = route.and_then(group_for_route).unwrap_or(DEFAULT_GROUP);
    Ok(vec![endpoints.resolve(group)?])
}

fn parse_zone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimeZone(name.to_string()))
}
