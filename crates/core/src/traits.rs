use crate::{FlightError, RedirectLink, ResultBundle, SearchId, SearchQuery};
use async_trait::async_trait;

#[async_trait]
pub trait FlightBackend: Send + Sync {
    async fn submit_search(&self, query: &SearchQuery) -> Result<SearchId, FlightError>;

    async fn fetch_results(&self, search_id: &SearchId) -> Result<ResultBundle, FlightError>;

    async fn request_redirect(
        &self,
        search_id: &SearchId,
        terms_url: &str,
    ) -> Result<RedirectLink, FlightError>;
}

/// Where purchase links end up and where redirect failures are reported.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn open_external(&self, url: &str) -> Result<(), FlightError>;

    fn alert(&self, message: &str);
}
