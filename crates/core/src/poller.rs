use crate::config::PollerConfig;
use crate::task::ScheduledTask;
use crate::traits::FlightBackend;
use crate::{FlightError, ResultBundle, SearchId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub enum PollEvent {
    /// A fetch came back without proposals.
    Pending { attempts: u32 },
    Ready(ResultBundle),
    Failed(FlightError),
}

/// Fetches the results of one search on a fixed interval until they are
/// ready, a fetch fails, or the attempt budget runs out.
pub struct ResultsPoller<B> {
    backend: Arc<B>,
    config: PollerConfig,
}

impl<B> ResultsPoller<B>
where
    B: FlightBackend + 'static,
{
    pub fn new(backend: Arc<B>, config: PollerConfig) -> Self {
        Self { backend, config }
    }

    /// Runs [`ResultsPoller::run`] in the background.
    pub fn spawn<F>(&self, search_id: SearchId, on_event: F) -> ScheduledTask
    where
        F: FnMut(PollEvent) -> bool + Send + 'static,
    {
        let poller = Self {
            backend: Arc::clone(&self.backend),
            config: self.config,
        };
        ScheduledTask::spawn(async move { poller.run(&search_id, on_event).await })
    }

    /// Polls until a terminal event. The first fetch is immediate.
    ///
    /// `on_event` returns whether the poll is still wanted; `false` after a
    /// `Pending` event stops the loop before the next fetch.
    pub async fn run<F>(&self, search_id: &SearchId, mut on_event: F)
    where
        F: FnMut(PollEvent) -> bool,
    {
        let mut ticker = time::interval(self.config.interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts = 0u32;

        loop {
            if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(%search_id, attempts, "giving up on search results");
                on_event(PollEvent::Failed(FlightError::PollTimeout { attempts }));
                return;
            }

            ticker.tick().await;
            attempts += 1;
            debug!(%search_id, attempt = attempts, "fetching search results");

            match self.backend.fetch_results(search_id).await {
                Ok(bundle) if bundle.is_ready() => {
                    info!(
                        %search_id,
                        attempts,
                        proposals = bundle.proposals.len(),
                        "search results ready"
                    );
                    on_event(PollEvent::Ready(bundle));
                    return;
                }
                Ok(_) => {
                    if !on_event(PollEvent::Pending { attempts }) {
                        debug!(%search_id, "poll no longer current");
                        return;
                    }
                }
                Err(error) => {
                    warn!(%search_id, attempts, error = %error, "polling failed");
                    on_event(PollEvent::Failed(error));
                    return;
                }
            }
        }
    }
}
