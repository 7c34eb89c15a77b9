use crate::config::PollerConfig;
use crate::poller::{PollEvent, ResultsPoller};
use crate::task::ScheduledTask;
use crate::traits::FlightBackend;
use crate::{FlightError, ResultBundle, SearchId, SearchQuery};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Submitting,
    Polling {
        search_id: SearchId,
        attempts: u32,
    },
    Ready {
        search_id: SearchId,
        bundle: Arc<ResultBundle>,
    },
    Failed {
        search_id: Option<SearchId>,
        message: String,
    },
}

impl SearchPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Submitting | Self::Polling { .. })
    }

    pub fn is_settled(&self) -> bool {
        !self.is_loading()
    }

    pub fn search_id(&self) -> Option<&SearchId> {
        match self {
            Self::Polling { search_id, .. } | Self::Ready { search_id, .. } => Some(search_id),
            Self::Failed { search_id, .. } => search_id.as_ref(),
            Self::Idle | Self::Submitting => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn bundle(&self) -> Option<&Arc<ResultBundle>> {
        match self {
            Self::Ready { bundle, .. } => Some(bundle),
            _ => None,
        }
    }
}

/// The phase plus the submission it belongs to. Updates tagged with an older
/// generation are dropped.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub generation: u64,
    pub phase: SearchPhase,
}

/// Drives one search at a time: submit, poll, publish.
///
/// Every submission cancels the previous poll. Dropping the controller
/// cancels the active poll as well.
pub struct SearchController<B> {
    backend: Arc<B>,
    poller: ResultsPoller<B>,
    state: Arc<watch::Sender<SearchState>>,
    /// Held while the generation is bumped and while a poll is installed, so
    /// the two never interleave.
    active_poll: Mutex<Option<ActivePoll>>,
}

struct ActivePoll {
    generation: u64,
    task: ScheduledTask,
}

impl<B> SearchController<B>
where
    B: FlightBackend + 'static,
{
    pub fn new(backend: Arc<B>, config: PollerConfig) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            poller: ResultsPoller::new(Arc::clone(&backend), config),
            backend,
            state: Arc::new(state),
            active_poll: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn phase(&self) -> SearchPhase {
        self.state.borrow().phase.clone()
    }

    pub async fn submit(&self, query: &SearchQuery) -> Result<SearchId, FlightError> {
        let generation = self.begin(SearchPhase::Submitting);
        info!(
            origin = %query.origin,
            destination = %query.destination,
            depart_date = %query.depart_date,
            return_date = %query.return_date,
            "submitting flight search"
        );

        let search_id = match self.backend.submit_search(query).await {
            Ok(search_id) => search_id,
            Err(error) => {
                warn!(error = %error, "search submission failed");
                let failed = SearchPhase::Failed {
                    search_id: None,
                    message: error.user_message(),
                };
                if !publish(&self.state, generation, failed) {
                    return Err(FlightError::Superseded);
                }
                return Err(error);
            }
        };

        if !self.start_polling(generation, search_id.clone()) {
            return Err(FlightError::Superseded);
        }
        Ok(search_id)
    }

    /// Polls a search id obtained outside this controller.
    pub fn poll_existing(&self, search_id: SearchId) {
        let generation = self.begin(SearchPhase::Polling {
            search_id: search_id.clone(),
            attempts: 0,
        });
        self.start_polling(generation, search_id);
    }

    /// Stops the active poll and returns to `Idle`.
    pub fn cancel(&self) {
        self.begin(SearchPhase::Idle);
    }

    /// Resolves once the current search is ready, failed or cancelled.
    pub async fn wait_until_settled(&self) -> SearchPhase {
        let mut updates = self.state.subscribe();
        let settled = updates
            .wait_for(|state| state.phase.is_settled())
            .await
            .map(|state| state.phase.clone());
        settled.unwrap_or_else(|_| self.phase())
    }

    fn begin(&self, phase: SearchPhase) -> u64 {
        let mut active = self.lock_active_poll();
        if let Some(previous) = active.take() {
            previous.task.cancel();
        }
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            state.phase = phase;
            generation = state.generation;
        });
        generation
    }

    fn start_polling(&self, generation: u64, search_id: SearchId) -> bool {
        let mut active = self.lock_active_poll();
        let polling = SearchPhase::Polling {
            search_id: search_id.clone(),
            attempts: 0,
        };
        if !publish(&self.state, generation, polling) {
            info!(%search_id, "search superseded before polling started");
            return false;
        }

        let state = Arc::clone(&self.state);
        let polled_id = search_id.clone();
        let task = self.poller.spawn(search_id, move |event| {
            let phase = match event {
                PollEvent::Pending { attempts } => SearchPhase::Polling {
                    search_id: polled_id.clone(),
                    attempts,
                },
                PollEvent::Ready(bundle) => SearchPhase::Ready {
                    search_id: polled_id.clone(),
                    bundle: Arc::new(bundle),
                },
                PollEvent::Failed(error) => SearchPhase::Failed {
                    search_id: Some(polled_id.clone()),
                    message: error.user_message(),
                },
            };
            publish(&state, generation, phase)
        });

        // The publish above succeeded under the lock, so anything still
        // installed belongs to an older generation.
        if let Some(previous) = active.replace(ActivePoll { generation, task }) {
            debug_assert!(previous.generation < generation);
            previous.task.cancel();
        }
        true
    }

    fn lock_active_poll(&self) -> MutexGuard<'_, Option<ActivePoll>> {
        self.active_poll
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Applies `phase` only if `generation` is still the current submission.
fn publish(state: &watch::Sender<SearchState>, generation: u64, phase: SearchPhase) -> bool {
    state.send_if_modified(|current| {
        if current.generation != generation {
            return false;
        }
        current.phase = phase;
        true
    })
}
