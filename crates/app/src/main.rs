use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use flight_search_core::{
    render_results, Checkout, FlightError, HttpBackend, Navigator, PollerConfig, ResultsView,
    SearchController, SearchId, SearchPhase, SearchQuery,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command as Process;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "flight-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Flight search backend base URL
    #[arg(long, env = "FLIGHT_SEARCH_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Seconds between result polls
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_secs: u64,

    /// Give up after this many result polls
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..))]
    max_polls: u32,

    /// Open purchase links in the system browser instead of printing them
    #[arg(long, default_value_t = false)]
    open: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a round-trip search and wait for proposals.
    Search {
        /// Origin airport or city code, e.g. TAS
        #[arg(long)]
        origin: String,
        /// Destination airport or city code, e.g. DXB
        #[arg(long)]
        destination: String,
        /// Outbound date (YYYY-MM-DD)
        #[arg(long)]
        depart_date: NaiveDate,
        /// Return date (YYYY-MM-DD)
        #[arg(long)]
        return_date: NaiveDate,
        /// Buy the proposal with this number once results are shown.
        #[arg(long)]
        buy: Option<usize>,
    },
    /// Wait for the results of a search submitted earlier.
    Results {
        #[arg(long)]
        search_id: String,
        /// Buy the proposal with this number once results are shown.
        #[arg(long)]
        buy: Option<usize>,
    },
    /// Request the purchase link for one set of terms.
    Redirect {
        #[arg(long)]
        search_id: String,
        #[arg(long)]
        terms_url: String,
    },
}

/// Prints purchase links, or hands them to the platform opener.
struct TerminalNavigator {
    launch: bool,
}

#[async_trait]
impl Navigator for TerminalNavigator {
    async fn open_external(&self, url: &str) -> Result<(), FlightError> {
        println!("purchase link: {url}");
        if !self.launch {
            return Ok(());
        }

        let status = Process::new(opener()).arg(url).status().await?;
        if !status.success() {
            warn!(%status, url, "browser launcher exited with an error");
        }
        Ok(())
    }

    fn alert(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

fn opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let backend = Arc::new(HttpBackend::new(&cli.api_url)?);
    let config = PollerConfig::default()
        .with_interval(Duration::from_secs(cli.poll_interval_secs))
        .with_max_attempts(Some(cli.max_polls));
    let checkout = Checkout::new(Arc::clone(&backend), TerminalNavigator { launch: cli.open });

    info!(
        version = app_version,
        api_url = %backend.base_url(),
        started_at = %Utc::now().to_rfc3339(),
        "flight-search boot"
    );

    match cli.command {
        Command::Search {
            origin,
            destination,
            depart_date,
            return_date,
            buy,
        } => {
            let query = SearchQuery::new(origin, destination, depart_date, return_date)?;
            let controller = SearchController::new(Arc::clone(&backend), config);
            let search_id = controller.submit(&query).await?;
            println!("search id: {search_id}");

            let view = follow(&controller).await?;
            print_and_buy(&checkout, &view, buy).await?;
        }
        Command::Results { search_id, buy } => {
            let controller = SearchController::new(Arc::clone(&backend), config);
            controller.poll_existing(SearchId::from(search_id));

            let view = follow(&controller).await?;
            print_and_buy(&checkout, &view, buy).await?;
        }
        Command::Redirect {
            search_id,
            terms_url,
        } => {
            checkout.buy(&SearchId::from(search_id), &terms_url).await?;
        }
    }

    Ok(())
}

/// Reports polling progress until the search settles.
async fn follow(
    controller: &SearchController<HttpBackend>,
) -> anyhow::Result<ResultsView> {
    let mut updates = controller.subscribe();

    loop {
        let phase = updates.borrow_and_update().phase.clone();
        match phase {
            SearchPhase::Polling {
                search_id,
                attempts,
            } if attempts > 0 => {
                info!(%search_id, attempts, "results not ready yet");
            }
            SearchPhase::Ready { search_id, bundle } => {
                return Ok(render_results(&bundle, &search_id));
            }
            SearchPhase::Failed { message, .. } => {
                anyhow::bail!(message);
            }
            SearchPhase::Idle => anyhow::bail!("search was cancelled"),
            SearchPhase::Submitting | SearchPhase::Polling { .. } => {}
        }

        if updates.changed().await.is_err() {
            anyhow::bail!("search controller stopped");
        }
    }
}

async fn print_and_buy(
    checkout: &Checkout<HttpBackend, TerminalNavigator>,
    view: &ResultsView,
    buy: Option<usize>,
) -> anyhow::Result<()> {
    println!("{view}");

    let Some(number) = buy else {
        return Ok(());
    };
    let card = view
        .card(number)
        .ok_or_else(|| anyhow::anyhow!("no proposal numbered {number}"))?;
    println!("buying [{number}] {} via {}", card.carrier, card.gate_name);

    checkout.buy_card(&view.search_id, card).await?;
    Ok(())
}
