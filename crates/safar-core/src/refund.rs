//! Refund quotes from the time-to-departure rule table.

use chrono::NaiveDateTime;
use safar_types::config::RefundTable;
use safar_types::ticket::{RefundQuote, Ticket};

/// Quote the refund for cancelling `ticket` at `now`.
///
/// Pure: the result depends only on the table, the fare, the departure
/// instant and `now`.
pub fn quote_refund(table: &RefundTable, ticket: &Ticket, now: NaiveDateTime) -> RefundQuote {
    let remaining = ticket.departure() - now;
    let hours = remaining.num_hours();
    let departed = remaining.num_seconds() < 0;

    let rule = if departed {
        None
    } else {
        table
            .ordered()
            .into_iter()
            .find(|rule| hours >= rule.min_hours_before)
    };

    let percent = rule
        .as_ref()
        .map_or(table.after_departure_percent, |rule| rule.refund_percent)
        .min(100);
    let basis = match rule {
        Some(rule) => format!(
            "Cancelled at least {}h before departure ({}h remaining): {}% of the fare is refunded.",
            rule.min_hours_before, hours, percent
        ),
        None if departed => format!("Cancelled after departure: {}% of the fare is refunded.", percent),
        None => format!(
            "Cancelled {}h before departure, below every refund threshold: {}% of the fare is refunded.",
            hours, percent
        ),
    };

    let refund_amount_irr = ticket.price_irr * u64::from(percent) / 100;
    RefundQuote {
        ticket_id: ticket.id.clone(),
        refund_amount_irr,
        penalty_irr: ticket.price_irr - refund_amount_irr,
        refund_percent: percent,
        hours_before_departure: hours,
        basis,
    }
}
