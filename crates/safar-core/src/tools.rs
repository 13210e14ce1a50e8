//! Tool declarations, typed argument parsing and execution.
//!
//! Tools follow the OpenAI function-calling schema so they work across providers.
//! Arguments arrive as a JSON string from the model and are parsed into a
//! [`ToolCall`] before anything runs; a call that does not parse never
//! reaches a store.

use std::sync::Arc;

use safar_types::config::RefundTable;
use safar_types::ticket::{RefundQuote, Ticket, TicketId};
use safar_types::tool::{ToolDefinition, ToolError, ToolErrorKind, ToolOutput, ToolParameters};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::destinations::{DestinationCatalog, DEFAULT_SHORTLIST};
use crate::policy::{PolicyAnswer, PolicyStore};
use crate::ports::Clock;
use crate::tickets::{BookingRequest, TicketStore};

pub const BOOK_TICKET: &str = "book_ticket";
pub const CANCEL_TICKET: &str = "cancel_ticket";
pub const LOOKUP_TICKET: &str = "lookup_ticket";
pub const SUGGEST_DESTINATION: &str = "suggest_destination";
pub const QUERY_POLICY: &str = "query_policy";

pub const TOOL_NAMES: [&str; 5] = [
    BOOK_TICKET,
    CANCEL_TICKET,
    LOOKUP_TICKET,
    SUGGEST_DESTINATION,
    QUERY_POLICY,
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookTicketArgs {
    pub origin_city: String,
    pub destination_city: String,
    pub travel_date: String,
    pub passenger_name: String,
    pub national_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketRefArgs {
    pub ticket_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestDestinationArgs {
    pub preferences: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryPolicyArgs {
    pub question: String,
}

/// A fully parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    BookTicket(BookTicketArgs),
    CancelTicket(TicketRefArgs),
    LookupTicket(TicketRefArgs),
    SuggestDestination(SuggestDestinationArgs),
    QueryPolicy(QueryPolicyArgs),
}

impl ToolCall {
    /// Parse a model-issued call. Unknown names, invalid JSON, missing or
    /// extra fields and blank strings are all rejected here.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        if !TOOL_NAMES.contains(&name) {
            return Err(ToolError::new(
                ToolErrorKind::UnknownTool,
                format!("Unknown tool '{}'. Available tools: {}.", name, TOOL_NAMES.join(", ")),
            ));
        }

        let args: Value = if arguments.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(arguments).map_err(|e| {
                ToolError::invalid_input(format!("Arguments for '{}' are not valid JSON: {}", name, e))
            })?
        };

        let call: ToolCall = serde_json::from_value(json!({ "name": name, "arguments": args }))
            .map_err(|e| ToolError::invalid_input(format!("Invalid arguments for '{}': {}", name, e)))?;
        call.check_not_blank()?;
        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::BookTicket(_) => BOOK_TICKET,
            ToolCall::CancelTicket(_) => CANCEL_TICKET,
            ToolCall::LookupTicket(_) => LOOKUP_TICKET,
            ToolCall::SuggestDestination(_) => SUGGEST_DESTINATION,
            ToolCall::QueryPolicy(_) => QUERY_POLICY,
        }
    }

    fn check_not_blank(&self) -> Result<(), ToolError> {
        let fields: Vec<(&str, &str)> = match self {
            ToolCall::BookTicket(a) => vec![
                ("origin_city", a.origin_city.as_str()),
                ("destination_city", a.destination_city.as_str()),
                ("travel_date", a.travel_date.as_str()),
                ("passenger_name", a.passenger_name.as_str()),
                ("national_id", a.national_id.as_str()),
            ],
            ToolCall::CancelTicket(a) | ToolCall::LookupTicket(a) => vec![("ticket_id", a.ticket_id.as_str())],
            ToolCall::SuggestDestination(a) => vec![("preferences", a.preferences.as_str())],
            ToolCall::QueryPolicy(a) => vec![("question", a.question.as_str())],
        };

        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ToolError::invalid_input(format!(
                "Argument '{}' for '{}' must not be empty.",
                field,
                self.name()
            ))),
            None => Ok(()),
        }
    }
}

/// Registry of available tools, wired to the stores they act on.
pub struct ToolRegistry {
    tickets: Arc<TicketStore>,
    policy: Arc<PolicyStore>,
    destinations: DestinationCatalog,
    clock: Arc<dyn Clock>,
    refunds: RefundTable,
}

impl ToolRegistry {
    pub fn new(tickets: Arc<TicketStore>, policy: Arc<PolicyStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tickets,
            policy,
            destinations: DestinationCatalog::default(),
            clock,
            refunds: RefundTable::default(),
        }
    }

    pub fn with_refund_table(mut self, refunds: RefundTable) -> Self {
        self.refunds = refunds;
        self
    }

    pub fn with_destinations(mut self, destinations: DestinationCatalog) -> Self {
        self.destinations = destinations;
        self
    }

    pub fn tickets(&self) -> &Arc<TicketStore> {
        &self.tickets
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Declarations sent to the model, in a stable order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            book_ticket_tool(),
            cancel_ticket_tool(),
            lookup_ticket_tool(),
            suggest_destination_tool(),
            query_policy_tool(),
        ]
    }

    pub fn get(&self, name: &str) -> Option<ToolDefinition> {
        self.definitions().into_iter().find(|t| t.name == name)
    }

    /// Parse and run one model-issued call.
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<ToolOutput, ToolError> {
        let call = ToolCall::parse(name, arguments)?;
        self.dispatch(call).await
    }

    pub async fn dispatch(&self, call: ToolCall) -> Result<ToolOutput, ToolError> {
        log::debug!("Dispatching tool {}", call.name());
        match call {
            ToolCall::BookTicket(args) => self.book(&args),
            ToolCall::CancelTicket(args) => self.cancel(&args),
            ToolCall::LookupTicket(args) => self.lookup(&args),
            ToolCall::SuggestDestination(args) => Ok(self.suggest(&args)),
            ToolCall::QueryPolicy(args) => self.query_policy(&args).await,
        }
    }

    fn book(&self, args: &BookTicketArgs) -> Result<ToolOutput, ToolError> {
        let request = BookingRequest {
            origin: &args.origin_city,
            destination: &args.destination_city,
            travel_date: &args.travel_date,
            passenger_name: &args.passenger_name,
            national_id: &args.national_id,
        };
        let ticket = self.tickets.book(&request, self.clock.today())?;

        Ok(ToolOutput::new(
            format!(
                "Ticket booked successfully. Ticket ID: {id}. Status: booked. \
                 بلیط با موفقیت رزرو شد. شماره بلیط: {id}",
                id = ticket.id
            ),
            ticket_view(&ticket),
        ))
    }

    fn cancel(&self, args: &TicketRefArgs) -> Result<ToolOutput, ToolError> {
        let id = TicketId::parse(&args.ticket_id);
        let (ticket, quote) = self.tickets.cancel(&id, &self.refunds, self.clock.now())?;

        Ok(ToolOutput::new(
            format!(
                "Ticket {} cancelled. Refund: {} IRR ({}%), penalty: {} IRR. \
                 بلیط لغو شد. مبلغ بازگشتی: {} ریال",
                ticket.id,
                format_irr(quote.refund_amount_irr),
                quote.refund_percent,
                format_irr(quote.penalty_irr),
                format_irr(quote.refund_amount_irr),
            ),
            json!({
                "ticket": ticket_view(&ticket),
                "refund": refund_view(&quote),
            }),
        ))
    }

    fn lookup(&self, args: &TicketRefArgs) -> Result<ToolOutput, ToolError> {
        let ticket = self.tickets.get(&TicketId::parse(&args.ticket_id))?;
        Ok(ToolOutput::new(
            format!("Ticket {} found.", ticket.id),
            ticket_view(&ticket),
        ))
    }

    fn suggest(&self, args: &SuggestDestinationArgs) -> ToolOutput {
        let picks = self.destinations.suggest(&args.preferences, DEFAULT_SHORTLIST);
        let message = if picks.is_empty() {
            "No catalog destination matched these preferences. Ask the traveller about \
             preferred weather, interests or travel style."
                .to_string()
        } else {
            let names: Vec<String> = picks
                .iter()
                .map(|s| format!("{} ({})", s.city_en, s.city_fa))
                .collect();
            format!("Suggested destinations: {}.", names.join(", "))
        };
        ToolOutput::new(message, json!({ "suggestions": picks }))
    }

    async fn query_policy(&self, args: &QueryPolicyArgs) -> Result<ToolOutput, ToolError> {
        match self.policy.query(&args.question).await {
            PolicyAnswer::Passages(passages) => Ok(ToolOutput::new(
                "Relevant company policy passages. Answer only from these.",
                json!({ "passages": passages }),
            )),
            PolicyAnswer::Unavailable => Err(ToolError::policy_unavailable()),
        }
    }
}

/// Ticket details as the model and the debug listing see them.
pub fn ticket_view(ticket: &Ticket) -> Value {
    let mut view = json!({
        "ticket_id": ticket.id,
        "origin": ticket.origin.to_string(),
        "destination": ticket.destination.to_string(),
        "travel_date": ticket.travel_date.format("%Y-%m-%d").to_string(),
        "departure_time": ticket.departure_time.format("%H:%M").to_string(),
        "passenger_name": ticket.passenger_name,
        "national_id": ticket.national_id.as_str(),
        "price_irr": ticket.price_irr,
        "status": ticket.status,
        "booked_at": ticket.booked_at.to_rfc3339(),
    });
    if let Some(at) = ticket.cancelled_at {
        view["cancelled_at"] = json!(at.to_rfc3339());
    }
    view
}

fn refund_view(quote: &RefundQuote) -> Value {
    json!({
        "refund_amount_irr": quote.refund_amount_irr,
        "penalty_irr": quote.penalty_irr,
        "refund_percent": quote.refund_percent,
        "hours_before_departure": quote.hours_before_departure,
        "basis": quote.basis,
    })
}

/// `1500000` -> `"1,500,000"`
pub fn format_irr(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn tool(name: &str, description: &str, props: &[(&str, &str)]) -> ToolDefinition {
    let mut properties = Map::new();
    for (key, desc) in props {
        properties.insert((*key).to_string(), string_prop(desc));
    }
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters: ToolParameters {
            schema_type: "object".to_string(),
            properties,
            required: props.iter().map(|(key, _)| (*key).to_string()).collect(),
        },
    }
}

fn book_ticket_tool() -> ToolDefinition {
    tool(
        BOOK_TICKET,
        "Book a domestic travel ticket between two Iranian cities. Only call this once \
         every argument has been provided by the user.",
        &[
            ("origin_city", "Departure city in Iran (English or Persian name)"),
            ("destination_city", "Arrival city in Iran (English or Persian name)"),
            ("travel_date", "Gregorian travel date, YYYY-MM-DD, after today"),
            ("passenger_name", "Full name of the passenger"),
            ("national_id", "10-digit Iranian national ID (کد ملی)"),
        ],
    )
}

fn cancel_ticket_tool() -> ToolDefinition {
    tool(
        CANCEL_TICKET,
        "Cancel a booked ticket and compute its refund from the company refund rules.",
        &[("ticket_id", "Ticket ID as issued at booking, e.g. SF-TESH-1A2B3C")],
    )
}

fn lookup_ticket_tool() -> ToolDefinition {
    tool(
        LOOKUP_TICKET,
        "Look up the details and status of a ticket.",
        &[("ticket_id", "Ticket ID as issued at booking")],
    )
}

fn suggest_destination_tool() -> ToolDefinition {
    tool(
        SUGGEST_DESTINATION,
        "Suggest Iranian destinations that match the traveller's preferences \
         (weather, interests, travel style).",
        &[("preferences", "Free-text preferences in the user's words")],
    )
}

fn query_policy_tool() -> ToolDefinition {
    tool(
        QUERY_POLICY,
        "Retrieve passages from the company policy document (refunds, baggage, \
         changes, documents). Use it for every policy question.",
        &[("question", "The policy question to look up")],
    )
}
