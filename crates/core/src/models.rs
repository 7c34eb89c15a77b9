use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::FlightError;

/// A round-trip search as entered by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub return_date: NaiveDate,
}

impl SearchQuery {
    /// Builds a query, enforcing only that the airport fields are filled in.
    /// Codes and date ordering are left for the backend to judge.
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        depart_date: NaiveDate,
        return_date: NaiveDate,
    ) -> Result<Self, FlightError> {
        let origin = required("origin", origin.into())?;
        let destination = required("destination", destination.into())?;

        Ok(Self {
            origin,
            destination,
            depart_date,
            return_date,
        })
    }
}

fn required(field: &str, value: String) -> Result<String, FlightError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FlightError::InvalidArgument(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SearchId(String);

impl SearchId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SearchId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SearchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Proposal {
    pub sign: String,
    #[serde(rename = "segment", default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub terms: TermsByGate,
}

impl Proposal {
    pub fn first_flight(&self) -> Option<&FlightLeg> {
        self.segments.first().and_then(|segment| segment.flights.first())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Segment {
    #[serde(rename = "flight", default)]
    pub flights: Vec<FlightLeg>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FlightLeg {
    pub departure: String,
    pub arrival: String,
    #[serde(default)]
    pub departure_date: String,
    #[serde(default)]
    pub departure_time: String,
    #[serde(default)]
    pub arrival_date: String,
    #[serde(default)]
    pub arrival_time: String,
    pub marketing_carrier: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Terms {
    pub price: f64,
    pub currency: String,
    #[serde(deserialize_with = "string_or_number")]
    pub url: String,
}

/// Price offers keyed by gate id, kept in the order the backend sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermsByGate(Vec<(String, Terms)>);

impl TermsByGate {
    pub fn first(&self) -> Option<(&str, &Terms)> {
        self.0.first().map(|(gate, terms)| (gate.as_str(), terms))
    }

    pub fn get(&self, gate_id: &str) -> Option<&Terms> {
        self.0
            .iter()
            .find(|(gate, _)| gate == gate_id)
            .map(|(_, terms)| terms)
    }

    pub fn gate_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(gate, _)| gate.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Terms)> for TermsByGate {
    fn from_iter<I: IntoIterator<Item = (String, Terms)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for TermsByGate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedTerms;

        impl<'de> Visitor<'de> for OrderedTerms {
            type Value = TermsByGate;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of gate id to terms")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(1));
                while let Some((gate, terms)) = map.next_entry::<String, Terms>()? {
                    entries.push((gate, terms));
                }
                Ok(TermsByGate(entries))
            }
        }

        deserializer.deserialize_map(OrderedTerms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Airline {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Airport {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Gate {
    #[serde(default)]
    pub label: Option<String>,
}

/// Everything one results poll produced, with the lookup tables pulled out of
/// the block array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultBundle {
    pub proposals: Vec<Proposal>,
    pub airlines: HashMap<String, Airline>,
    pub airports_by_id: HashMap<String, Airport>,
    pub gates_by_id: HashMap<String, Gate>,
}

impl ResultBundle {
    pub fn is_ready(&self) -> bool {
        !self.proposals.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Text(text) => text,
            StringOrNumber::Number(number) => number.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|value| value.map(String::from))
}
