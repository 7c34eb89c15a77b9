use crate::render::ProposalCard;
use crate::traits::{FlightBackend, Navigator};
use crate::{FlightError, RedirectLink, SearchId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

pub const BUY_LABEL: &str = "Buy";
pub const REDIRECTING_LABEL: &str = "Redirecting...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyButton {
    pub label: &'static str,
    pub disabled: bool,
}

/// The "buy" action: trades a proposal's terms url for a purchase link.
///
/// In-flight redirects are tracked per terms url, so a pending click only
/// disables the buttons bound to that url.
pub struct Checkout<B, N> {
    backend: Arc<B>,
    navigator: N,
    in_flight: Mutex<HashMap<String, usize>>,
}

impl<B, N> Checkout<B, N>
where
    B: FlightBackend,
    N: Navigator,
{
    pub fn new(backend: Arc<B>, navigator: N) -> Self {
        Self {
            backend,
            navigator,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Requests the redirect and opens it. Failures are alerted through the
    /// navigator and returned.
    pub async fn buy(
        &self,
        search_id: &SearchId,
        terms_url: &str,
    ) -> Result<RedirectLink, FlightError> {
        let _pending = PendingRedirect::enter(&self.in_flight, terms_url);

        let outcome = match self.backend.request_redirect(search_id, terms_url).await {
            Ok(link) => {
                let opened = self.navigator.open_external(&link.url).await;
                opened.map(|_| link)
            }
            Err(error) => Err(error),
        };

        match outcome {
            Ok(link) => {
                info!(%search_id, terms_url, url = %link.url, "opened purchase link");
                Ok(link)
            }
            Err(error) => {
                warn!(%search_id, terms_url, error = %error, "redirect failed");
                self.navigator.alert(&error.user_message());
                Err(error)
            }
        }
    }

    pub async fn buy_card(
        &self,
        search_id: &SearchId,
        card: &ProposalCard,
    ) -> Result<RedirectLink, FlightError> {
        self.buy(search_id, &card.terms_url).await
    }

    pub fn is_redirecting(&self, terms_url: &str) -> bool {
        lock(&self.in_flight).contains_key(terms_url)
    }

    pub fn button(&self, card: &ProposalCard) -> BuyButton {
        let disabled = self.is_redirecting(&card.terms_url);
        BuyButton {
            label: if disabled { REDIRECTING_LABEL } else { BUY_LABEL },
            disabled,
        }
    }
}

fn lock(map: &Mutex<HashMap<String, usize>>) -> MutexGuard<'_, HashMap<String, usize>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a terms url as in flight until dropped.
struct PendingRedirect<'a> {
    in_flight: &'a Mutex<HashMap<String, usize>>,
    terms_url: String,
}

impl<'a> PendingRedirect<'a> {
    fn enter(in_flight: &'a Mutex<HashMap<String, usize>>, terms_url: &str) -> Self {
        *lock(in_flight).entry(terms_url.to_string()).or_insert(0) += 1;
        Self {
            in_flight,
            terms_url: terms_url.to_string(),
        }
    }
}

impl Drop for PendingRedirect<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(self.in_flight);
        if let Some(count) = in_flight.get_mut(&self.terms_url) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(&self.terms_url);
            }
        }
    }
}
