use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::city::City;
use crate::language::ascii_digit;

/// Ticket identifier, e.g. `SF-TESH-1A2B3C`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Generate a fresh id. Uniqueness against existing tickets is the
    /// store's job; this only makes collisions unlikely.
    pub fn generate(origin: City, destination: City) -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "SF-{}{}-{}",
            city_prefix(origin),
            city_prefix(destination),
            hex[..6].to_uppercase()
        ))
    }

    /// Accept an id as typed by a user or echoed by the model.
    pub fn parse(input: &str) -> Self {
        Self(input.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn city_prefix(city: City) -> String {
    city.english_name()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

/// Iranian national ID (کد ملی): exactly ten digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NationalId(String);

impl NationalId {
    /// Parse a national ID. Persian and Arabic-Indic digits are normalised to
    /// ASCII, and spaces or dashes between digit groups are ignored.
    pub fn parse(input: &str) -> Option<Self> {
        let mut digits = String::with_capacity(10);
        for ch in input.trim().chars() {
            match (ascii_digit(ch), ch) {
                (Some(digit), _) => digits.push(digit),
                (None, ' ' | '-') => continue,
                (None, _) => return None,
            }
        }
        (digits.len() == 10).then_some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last four digits only, for logs and listings.
    pub fn masked(&self) -> String {
        format!("******{}", &self.0[6..])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Booked,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub origin: City,
    pub destination: City,
    pub travel_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub passenger_name: String,
    pub national_id: NationalId,
    pub price_irr: u64,
    pub status: TicketStatus,
    pub booked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn departure(&self) -> NaiveDateTime {
        self.travel_date.and_time(self.departure_time)
    }

    pub fn is_active(&self) -> bool {
        self.status == TicketStatus::Booked
    }
}

/// Refund owed on cancellation. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundQuote {
    pub ticket_id: TicketId,
    pub refund_amount_irr: u64,
    pub penalty_irr: u64,
    pub refund_percent: u8,
    pub hours_before_departure: i64,
    pub basis: String,
}
