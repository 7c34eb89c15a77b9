//! In-memory backend and navigator shared by the unit tests.

use crate::models::{Airline, Gate, Proposal, ResultBundle, Terms};
use crate::traits::{FlightBackend, Navigator};
use crate::{FlightError, RedirectLink, SearchId, SearchQuery};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

#[derive(Default)]
pub struct FakeBackend {
    search: Mutex<VecDeque<Result<String, String>>>,
    results: Mutex<VecDeque<Result<ResultBundle, String>>>,
    redirects: Mutex<HashMap<String, Result<String, String>>>,
    fetched: Mutex<Vec<SearchId>>,
    submissions: AtomicUsize,
    search_gate: Option<Semaphore>,
    redirect_gate: Option<Semaphore>,
}

impl FakeBackend {
    /// Searches and redirect requests wait for [`FakeBackend::release_searches`]
    /// and [`FakeBackend::release_redirects`].
    pub fn gated() -> Self {
        Self {
            search_gate: Some(Semaphore::new(0)),
            redirect_gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn push_search(&self, outcome: Result<&str, &str>) {
        self.search
            .lock()
            .unwrap()
            .push_back(outcome.map(str::to_string).map_err(str::to_string));
    }

    pub fn push_results(&self, outcome: Result<ResultBundle, String>) {
        self.results.lock().unwrap().push_back(outcome);
    }

    pub fn set_redirect(&self, terms_url: &str, outcome: Result<&str, &str>) {
        self.redirects.lock().unwrap().insert(
            terms_url.to_string(),
            outcome.map(str::to_string).map_err(str::to_string),
        );
    }

    pub fn release_searches(&self, count: usize) {
        if let Some(gate) = &self.search_gate {
            gate.add_permits(count);
        }
    }

    pub fn release_redirects(&self, count: usize) {
        if let Some(gate) = &self.redirect_gate {
            gate.add_permits(count);
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    pub fn fetches_for(&self, search_id: &str) -> usize {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == search_id)
            .count()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightBackend for FakeBackend {
    async fn submit_search(&self, _query: &SearchQuery) -> Result<SearchId, FlightError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.search_gate {
            gate.acquire().await.expect("gate open").forget();
        }
        let outcome = self
            .search
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted search".to_string()));
        outcome
            .map(SearchId::from)
            .map_err(|details| FlightError::bad_response("/api/search", details))
    }

    async fn fetch_results(&self, search_id: &SearchId) -> Result<ResultBundle, FlightError> {
        self.fetched.lock().unwrap().push(search_id.clone());
        let outcome = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ResultBundle::default()));
        outcome.map_err(|details| FlightError::bad_response("/api/results", details))
    }

    async fn request_redirect(
        &self,
        _search_id: &SearchId,
        terms_url: &str,
    ) -> Result<RedirectLink, FlightError> {
        if let Some(gate) = &self.redirect_gate {
            gate.acquire().await.expect("gate open").forget();
        }
        let outcome = self
            .redirects
            .lock()
            .unwrap()
            .get(terms_url)
            .cloned()
            .unwrap_or_else(|| Err("unknown terms".to_string()));
        match outcome {
            Ok(url) => Ok(RedirectLink { url, method: None }),
            Err(details) => Err(FlightError::bad_response("/api/redirect", details)),
        }
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub opened: Mutex<Vec<String>>,
    pub alerts: Mutex<Vec<String>>,
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn open_external(&self, url: &str) -> Result<(), FlightError> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

pub fn proposal(sign: &str, carrier: &str, terms: &[(&str, f64, &str)]) -> Proposal {
    let terms = terms
        .iter()
        .map(|(gate, price, url)| {
            let offer = Terms {
                price: *price,
                currency: "uzs".to_string(),
                url: url.to_string(),
            };
            (gate.to_string(), offer)
        })
        .collect();

    Proposal {
        sign: sign.to_string(),
        segments: serde_json::from_value(serde_json::json!([{
            "flight": [{
                "departure": "TAS",
                "arrival": "DXB",
                "departure_date": "2026-11-01",
                "departure_time": "08:40",
                "arrival_date": "2026-11-01",
                "arrival_time": "11:55",
                "marketing_carrier": carrier
            }]
        }]))
        .expect("segments"),
        terms,
    }
}

/// A ready bundle with one proposal priced by `gate_id`.
pub fn ready_bundle(gate_id: &str) -> ResultBundle {
    let mut bundle = ResultBundle {
        proposals: vec![proposal("sign-1", "HY", &[(gate_id, 1_500_000.0, "7001")])],
        ..ResultBundle::default()
    };
    bundle.airlines.insert(
        "HY".to_string(),
        Airline {
            name: Some("Uzbekistan Airways".to_string()),
        },
    );
    bundle.gates_by_id.insert(
        "99".to_string(),
        Gate {
            label: Some("Unrelated".to_string()),
        },
    );
    bundle
}
