use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hnlive::config::{API_BASE, ITEM_PAGE_URL, STREAM_URL};
use hnlive::{
    Endpoints, Feed, FeedConfig, HttpClient, Renderer, RetryPolicy, Shutdown, SseClient,
};

// How often the render loop wakes to check for Ctrl-C while the feed is busy.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// hnlive - print new Hacker News stories as they are submitted
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Event stream of new story ids
    #[arg(long, default_value = STREAM_URL)]
    stream_url: String,

    /// Base URL of the JSON item API
    #[arg(long, default_value = API_BASE)]
    api_base: String,

    /// Item page scraped when the API has nothing
    #[arg(long, default_value = ITEM_PAGE_URL)]
    item_page_url: String,

    /// Attempts per source before giving up on an item
    #[arg(long, default_value_t = 3)]
    fetch_attempts: u32,

    /// Seconds between attempts on the same source
    #[arg(long, default_value_t = 5)]
    fetch_retry_delay_secs: u64,

    /// Seconds of stream silence before reconnecting (0 waits forever)
    #[arg(long, default_value_t = 35)]
    read_timeout_secs: u64,

    /// Seconds to wait before reconnecting a dropped stream
    #[arg(long, default_value_t = 35)]
    reconnect_backoff_secs: u64,

    /// Connect timeout in seconds for all requests
    #[arg(long, default_value_t = 10)]
    connect_timeout_secs: u64,

    /// Total timeout in seconds for item and page requests
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// Number of recently seen ids remembered
    #[arg(long, default_value_t = 1024)]
    cache_capacity: usize,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

impl Args {
    fn feed_config(&self) -> Result<FeedConfig> {
        let endpoints = Endpoints::new(&self.stream_url, &self.api_base, &self.item_page_url)
            .context("invalid endpoint url")?;
        Ok(FeedConfig {
            endpoints,
            retry: RetryPolicy {
                attempts: self.fetch_attempts,
                delay: Duration::from_secs(self.fetch_retry_delay_secs),
            },
            read_timeout: match self.read_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            reconnect_backoff: Duration::from_secs(self.reconnect_backoff_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            cache_capacity: self.cache_capacity,
        })
    }
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,hnlive=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.feed_config()?;

    let shutdown = Shutdown::new();
    let handler = shutdown.clone();
    ctrlc::set_handler(move || handler.trigger()).context("failed to install Ctrl-C handler")?;

    let http = HttpClient::new(config.connect_timeout, config.request_timeout)
        .context("failed to build HTTP client")?;
    let source = SseClient::new(
        config.endpoints.stream.as_str(),
        config.connect_timeout,
        config.read_timeout,
    )
    .context("failed to build event stream client")?;

    info!(stream = %config.endpoints.stream, "watching for new stories");

    // The feed blocks in network calls, so it runs on its own thread and the
    // main thread stays free to notice Ctrl-C.
    let (tx, rx) = mpsc::channel();
    let feed = Feed::new(source, http, config, shutdown.clone());
    thread::Builder::new()
        .name("feed".into())
        .spawn(move || {
            for event in feed {
                if tx.send(event).is_err() {
                    break;
                }
            }
        })
        .context("failed to start feed thread")?;

    let mut renderer = Renderer::stdout(!args.no_color);
    loop {
        if shutdown.is_triggered() {
            break;
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                if shutdown.is_triggered() {
                    break;
                }
                renderer.render(&event).context("failed to write to stdout")?;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("stopped");
    Ok(())
}
