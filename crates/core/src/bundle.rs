use crate::models::{Airline, Airport, Gate, Proposal, ResultBundle};
use crate::FlightError;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct RawBlock {
    #[serde(default)]
    proposals: Option<Vec<Box<RawValue>>>,
    #[serde(default)]
    airlines: Option<HashMap<String, Airline>>,
    #[serde(default)]
    airports: Option<HashMap<String, Airport>>,
    #[serde(default)]
    gates_info: Option<HashMap<String, Gate>>,
}

/// Parses a results body into a [`ResultBundle`].
///
/// The body is an ordered array of blocks. Proposals come from the first block
/// with a non-empty list; each lookup table from the first block that carries
/// it. An object carrying `error` (or `details`) is reported as a bad response.
///
/// Proposals are decoded one at a time; one that does not match the expected
/// shape is dropped without discarding its neighbours.
pub fn parse_bundle(endpoint: &str, body: &[u8]) -> Result<ResultBundle, FlightError> {
    match serde_json::from_slice::<Vec<RawBlock>>(body) {
        Ok(blocks) => Ok(from_blocks(endpoint, blocks)),
        Err(parse_error) => {
            let value: Value = serde_json::from_slice(body)
                .map_err(|error| FlightError::bad_response(endpoint, error.to_string()))?;
            let details = error_text(&value).unwrap_or_else(|| parse_error.to_string());
            Err(FlightError::bad_response(endpoint, details))
        }
    }
}

fn from_blocks(endpoint: &str, blocks: Vec<RawBlock>) -> ResultBundle {
    let mut bundle = ResultBundle::default();
    let (mut airlines, mut airports, mut gates) = (None, None, None);

    for block in blocks {
        if bundle.proposals.is_empty() {
            if let Some(raw) = block.proposals {
                bundle.proposals = decode_proposals(endpoint, &raw);
            }
        }
        airlines = airlines.or(block.airlines);
        airports = airports.or(block.airports);
        gates = gates.or(block.gates_info);
    }

    bundle.airlines = airlines.unwrap_or_default();
    bundle.airports_by_id = airports.unwrap_or_default();
    bundle.gates_by_id = gates.unwrap_or_default();
    bundle
}

fn decode_proposals(endpoint: &str, raw: &[Box<RawValue>]) -> Vec<Proposal> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, proposal)| {
            match serde_json::from_str::<Proposal>(proposal.get()) {
                Ok(proposal) => Some(proposal),
                Err(error) => {
                    debug!(endpoint, index, error = %error, "skipping malformed proposal");
                    None
                }
            }
        })
        .collect()
}

/// Picks the human-readable message out of an error payload, `details` first.
pub fn error_text(body: &Value) -> Option<String> {
    ["details", "error"].iter().find_map(|key| match body.get(key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(Value::Null) | None => None,
        Some(Value::String(_)) => None,
        Some(other) => Some(other.to_string()),
    })
}
