use crate::bundle::{error_text, parse_bundle};
use crate::traits::FlightBackend;
use crate::{FlightError, RedirectLink, ResultBundle, SearchId, SearchQuery};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

const SEARCH_ENDPOINT: &str = "/api/search";
const RESULTS_ENDPOINT: &str = "/api/results";
const REDIRECT_ENDPOINT: &str = "/api/redirect";

/// JSON-over-HTTP client for the flight search backend.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, FlightError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, FlightError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(FlightError::InvalidArgument(format!(
                "{base_url} cannot be used as a base url"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base url; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FlightError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FlightError::InvalidArgument(format!(
                    "{} cannot be used as a base url",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl FlightBackend for HttpBackend {
    async fn submit_search(&self, query: &SearchQuery) -> Result<SearchId, FlightError> {
        let url = self.endpoint(&["api", "search"])?;
        debug!(%url, origin = %query.origin, destination = %query.destination, "submitting search");

        let response = self.client.post(url).json(query).send().await?;
        let (status, body) = read_json(SEARCH_ENDPOINT, response).await?;
        if !status.is_success() {
            return Err(failure(SEARCH_ENDPOINT, status, Some(&body)));
        }

        match body.get("search_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(SearchId::new(id.as_str())),
            _ => Err(match error_text(&body) {
                Some(details) => FlightError::bad_response(SEARCH_ENDPOINT, details),
                None => FlightError::missing_field(SEARCH_ENDPOINT, "search_id"),
            }),
        }
    }

    async fn fetch_results(&self, search_id: &SearchId) -> Result<ResultBundle, FlightError> {
        let url = self.endpoint(&["api", "results", search_id.as_str()])?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let value = serde_json::from_slice::<Value>(&body).ok();
            return Err(failure(RESULTS_ENDPOINT, status, value.as_ref()));
        }

        parse_bundle(RESULTS_ENDPOINT, &body)
    }

    async fn request_redirect(
        &self,
        search_id: &SearchId,
        terms_url: &str,
    ) -> Result<RedirectLink, FlightError> {
        let url = self.endpoint(&["api", "redirect"])?;
        debug!(%url, %search_id, terms_url, "requesting redirect");

        let response = self
            .client
            .post(url)
            .json(&json!({
                "search_id": search_id,
                "terms_url": terms_url,
            }))
            .send()
            .await?;
        let (status, body) = read_json(REDIRECT_ENDPOINT, response).await?;
        if !status.is_success() {
            return Err(failure(REDIRECT_ENDPOINT, status, Some(&body)));
        }

        match body.get("url").and_then(Value::as_str) {
            Some(link) if !link.trim().is_empty() => Ok(RedirectLink {
                url: link.to_string(),
                method: body
                    .get("method")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            _ => Err(match error_text(&body) {
                Some(details) => FlightError::bad_response(REDIRECT_ENDPOINT, details),
                None => FlightError::missing_field(REDIRECT_ENDPOINT, "url"),
            }),
        }
    }
}

/// Reads the body as JSON. A body that does not parse is reported with the
/// parse error on success statuses and with the status otherwise.
async fn read_json(endpoint: &str, response: Response) -> Result<(StatusCode, Value), FlightError> {
    let status = response.status();
    let body = response.bytes().await?;

    match serde_json::from_slice(&body) {
        Ok(value) => Ok((status, value)),
        Err(error) if status.is_success() => {
            Err(FlightError::bad_response(endpoint, error.to_string()))
        }
        Err(_) => Err(FlightError::bad_response(endpoint, status.to_string())),
    }
}

fn failure(endpoint: &str, status: StatusCode, body: Option<&Value>) -> FlightError {
    let details = body
        .and_then(error_text)
        .unwrap_or_else(|| status.to_string());
    warn!(endpoint, %status, details = %details, "backend rejected request");
    FlightError::bad_response(endpoint, details)
}
