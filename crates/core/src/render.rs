use crate::models::{FlightLeg, Proposal, ResultBundle};
use crate::SearchId;
use std::fmt;
use tracing::debug;

/// Label prefix for gates missing from the `gates_info` lookup.
///
/// It stands in for the Uzbek agency labels the backend sends, so it stays
/// in Uzbek while the surrounding interface labels are English.
pub const UNKNOWN_GATE_PREFIX: &str = "Agentlik #";

#[derive(Debug, Clone, PartialEq)]
pub struct LegEndpoint {
    pub airport: String,
    pub airport_name: Option<String>,
    pub date: String,
    pub time: String,
}

/// One proposal as shown to the user, priced by its first terms entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalCard {
    pub sign: String,
    pub carrier: String,
    pub price: f64,
    pub currency: String,
    pub gate_id: String,
    pub gate_name: String,
    pub terms_url: String,
    pub departure: LegEndpoint,
    pub arrival: LegEndpoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub search_id: SearchId,
    pub cards: Vec<ProposalCard>,
}

impl ResultsView {
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards are numbered from 1 in the rendered output.
    pub fn card(&self, number: usize) -> Option<&ProposalCard> {
        number.checked_sub(1).and_then(|index| self.cards.get(index))
    }
}

pub fn render_results(bundle: &ResultBundle, search_id: &SearchId) -> ResultsView {
    ResultsView {
        search_id: search_id.clone(),
        cards: bundle
            .proposals
            .iter()
            .filter_map(|proposal| render_proposal(bundle, proposal))
            .collect(),
    }
}

/// Returns `None` for proposals with no flight or no terms to show.
pub fn render_proposal(bundle: &ResultBundle, proposal: &Proposal) -> Option<ProposalCard> {
    let Some(flight) = proposal.first_flight() else {
        debug!(sign = %proposal.sign, "skipping proposal without flights");
        return None;
    };
    let Some((gate_id, terms)) = proposal.terms.first() else {
        debug!(sign = %proposal.sign, "skipping proposal without terms");
        return None;
    };

    let carrier = bundle
        .airlines
        .get(&flight.marketing_carrier)
        .and_then(|airline| airline.name.clone())
        .unwrap_or_else(|| flight.marketing_carrier.clone());
    let gate_name = bundle
        .gates_by_id
        .get(gate_id)
        .and_then(|gate| gate.label.clone())
        .unwrap_or_else(|| format!("{UNKNOWN_GATE_PREFIX}{gate_id}"));

    Some(ProposalCard {
        sign: proposal.sign.clone(),
        carrier,
        price: terms.price,
        currency: terms.currency.to_uppercase(),
        gate_id: gate_id.to_string(),
        gate_name,
        terms_url: terms.url.clone(),
        departure: endpoint(bundle, flight, Side::Departure),
        arrival: endpoint(bundle, flight, Side::Arrival),
    })
}

enum Side {
    Departure,
    Arrival,
}

fn endpoint(bundle: &ResultBundle, flight: &FlightLeg, side: Side) -> LegEndpoint {
    let (airport, date, time) = match side {
        Side::Departure => (
            &flight.departure,
            &flight.departure_date,
            &flight.departure_time,
        ),
        Side::Arrival => (&flight.arrival, &flight.arrival_date, &flight.arrival_time),
    };

    LegEndpoint {
        airport: airport.clone(),
        airport_name: bundle
            .airports_by_id
            .get(airport)
            .and_then(|info| info.name.clone()),
        date: date.clone(),
        time: time.clone(),
    }
}

impl fmt::Display for LegEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.airport_name {
            Some(name) => write!(f, "{} {}", self.airport, name)?,
            None => f.write_str(&self.airport)?,
        }
        write!(f, " ({} {})", self.date, self.time)
    }
}

impl fmt::Display for ProposalCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Airline: {}", self.carrier)?;
        if self.price.fract() == 0.0 {
            writeln!(f, "Price: {:.0} {}", self.price, self.currency)?;
        } else {
            writeln!(f, "Price: {:.2} {}", self.price, self.currency)?;
        }
        writeln!(f, "Agency: {}", self.gate_name)?;
        writeln!(f, "Departure: {}", self.departure)?;
        write!(f, "Arrival: {}", self.arrival)
    }
}

impl fmt::Display for ResultsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cards.is_empty() {
            return f.write_str("No flights found.");
        }

        writeln!(f, "Search results ({})", self.search_id)?;
        for (index, card) in self.cards.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "[{}]", index + 1)?;
            writeln!(f, "{card}")?;
        }
        Ok(())
    }
}
