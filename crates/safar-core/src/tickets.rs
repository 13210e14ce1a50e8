//! In-memory ticket store plus the booking and cancellation rules.
//!
//! The store is an explicit value shared behind `Arc`; one writer at a time,
//! concurrent readers. Tickets are never removed, only marked cancelled.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use safar_types::city::City;
use safar_types::config::RefundTable;
use safar_types::language::ascii_digit;
use safar_types::ticket::{NationalId, RefundQuote, Ticket, TicketId, TicketStatus};
use safar_types::tool::ToolError;

use crate::refund::quote_refund;

pub const BASE_FARE_IRR: u64 = 1_500_000;
/// Departure slots handed out round-robin.
pub const DEPARTURE_SLOTS: [(u32, u32); 3] = [(8, 0), (14, 30), (20, 0)];

/// Raw booking arguments as the model supplied them.
#[derive(Debug, Clone)]
pub struct BookingRequest<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub travel_date: &'a str,
    pub passenger_name: &'a str,
    pub national_id: &'a str,
}

/// A booking that passed every check and can be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub origin: City,
    pub destination: City,
    pub travel_date: NaiveDate,
    pub passenger_name: String,
    pub national_id: NationalId,
}

impl ValidatedBooking {
    pub fn fare_irr(&self) -> u64 {
        if self.destination.is_island() {
            BASE_FARE_IRR * 3 / 2
        } else {
            BASE_FARE_IRR
        }
    }
}

/// Validate booking arguments against the city set, the calendar and the
/// national-ID format. City checks run first so an unsupported route is
/// always reported as `InvalidCity`.
pub fn validate_booking(req: &BookingRequest<'_>, today: NaiveDate) -> Result<ValidatedBooking, ToolError> {
    let origin = City::parse(req.origin).ok_or_else(|| unsupported_city(req.origin))?;
    let destination = City::parse(req.destination).ok_or_else(|| unsupported_city(req.destination))?;

    if origin == destination {
        return Err(ToolError::invalid_input(format!(
            "Origin and destination are both {}; they must differ.",
            origin.english_name()
        )));
    }

    let travel_date = parse_travel_date(req.travel_date)?;
    if travel_date <= today {
        return Err(ToolError::invalid_input(format!(
            "Travel date {} is not in the future (today is {}).",
            travel_date, today
        )));
    }

    let passenger_name = req.passenger_name.trim();
    if passenger_name.is_empty() {
        return Err(ToolError::invalid_input("Passenger name is required."));
    }

    let national_id = NationalId::parse(req.national_id).ok_or_else(|| {
        ToolError::invalid_input("National ID (کد ملی) must be exactly 10 digits.")
    })?;

    Ok(ValidatedBooking {
        origin,
        destination,
        travel_date,
        passenger_name: passenger_name.to_string(),
        national_id,
    })
}

fn unsupported_city(name: &str) -> ToolError {
    let supported: Vec<&str> = City::ALL.iter().map(|c| c.english_name()).collect();
    ToolError::invalid_city(format!(
        "'{}' is not a supported domestic city. Supported cities: {}.",
        name.trim(),
        supported.join(", ")
    ))
}

/// Gregorian `YYYY-MM-DD` (or `YYYY/MM/DD`), Persian and Arabic-Indic
/// digits allowed.
fn parse_travel_date(input: &str) -> Result<NaiveDate, ToolError> {
    let ascii: String = input
        .trim()
        .chars()
        .map(|c| match (ascii_digit(c), c) {
            (Some(digit), _) => digit,
            (None, '/') => '-',
            (None, other) => other,
        })
        .collect();

    let date = NaiveDate::parse_from_str(&ascii, "%Y-%m-%d").map_err(|_| {
        ToolError::invalid_input(format!(
            "Travel date '{}' is not a Gregorian date in YYYY-MM-DD format.",
            input.trim()
        ))
    })?;

    // Shamsi years (e.g. 1403) parse fine as Gregorian but are centuries off
    if date.year() < 1900 {
        return Err(ToolError::invalid_input(format!(
            "Travel date '{}' looks like a Persian (Shamsi) date; convert it to Gregorian YYYY-MM-DD.",
            input.trim()
        )));
    }
    Ok(date)
}

#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: RwLock<HashMap<TicketId, Ticket>>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TicketId, Ticket>> {
        self.tickets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TicketId, Ticket>> {
        self.tickets.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and store a new ticket with status `Booked`.
    pub fn book(&self, req: &BookingRequest<'_>, today: NaiveDate) -> Result<Ticket, ToolError> {
        let booking = validate_booking(req, today)?;

        let mut tickets = self.write();
        let mut id = TicketId::generate(booking.origin, booking.destination);
        while tickets.contains_key(&id) {
            id = TicketId::generate(booking.origin, booking.destination);
        }

        let (hour, minute) = DEPARTURE_SLOTS[tickets.len() % DEPARTURE_SLOTS.len()];
        let ticket = Ticket {
            id: id.clone(),
            origin: booking.origin,
            destination: booking.destination,
            travel_date: booking.travel_date,
            departure_time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
            price_irr: booking.fare_irr(),
            passenger_name: booking.passenger_name,
            national_id: booking.national_id,
            status: TicketStatus::Booked,
            booked_at: Utc::now(),
            cancelled_at: None,
        };
        tickets.insert(id, ticket.clone());

        log::info!(
            "Ticket booked: {} {} -> {} on {} for {}",
            ticket.id,
            ticket.origin.english_name(),
            ticket.destination.english_name(),
            ticket.travel_date,
            ticket.national_id.masked()
        );
        Ok(ticket)
    }

    /// Cancel an active ticket and quote its refund. Unknown and already
    /// cancelled tickets are both `TicketNotFound`.
    pub fn cancel(
        &self,
        id: &TicketId,
        table: &RefundTable,
        now: NaiveDateTime,
    ) -> Result<(Ticket, RefundQuote), ToolError> {
        let mut tickets = self.write();
        let ticket = tickets
            .get_mut(id)
            .filter(|t| t.is_active())
            .ok_or_else(|| ToolError::ticket_not_found(id.as_str()))?;

        let quote = quote_refund(table, ticket, now);
        ticket.status = TicketStatus::Cancelled;
        ticket.cancelled_at = Some(Utc::now());

        log::info!(
            "Ticket cancelled: {} (refund {} IRR, {}%)",
            id,
            quote.refund_amount_irr,
            quote.refund_percent
        );
        Ok((ticket.clone(), quote))
    }

    pub fn get(&self, id: &TicketId) -> Result<Ticket, ToolError> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| ToolError::ticket_not_found(id.as_str()))
    }

    /// All tickets, oldest booking first.
    pub fn list(&self) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.read().values().cloned().collect();
        tickets.sort_by(|a, b| a.booked_at.cmp(&b.booked_at).then_with(|| a.id.cmp(&b.id)));
        tickets
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
