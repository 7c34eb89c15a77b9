pub mod backends;
pub mod bundle;
pub mod checkout;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod poller;
pub mod render;
pub mod task;
pub mod traits;

#[cfg(test)]
mod testing;

pub use backends::HttpBackend;
pub use bundle::{error_text, parse_bundle};
pub use checkout::{BuyButton, Checkout, BUY_LABEL, REDIRECTING_LABEL};
pub use config::{PollerConfig, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
pub use controller::{SearchController, SearchPhase, SearchState};
pub use error::FlightError;
pub use models::{
    Airline, Airport, FlightLeg, Gate, Proposal, RedirectLink, ResultBundle, SearchId,
    SearchQuery, Segment, Terms, TermsByGate,
};
pub use poller::{PollEvent, ResultsPoller};
pub use render::{
    render_proposal, render_results, LegEndpoint, ProposalCard, ResultsView, UNKNOWN_GATE_PREFIX,
};
pub use task::ScheduledTask;
pub use traits::{FlightBackend, Navigator};
