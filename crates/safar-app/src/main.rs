use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use safar_app::cli::{Cli, Input};
use safar_app::{config, AppContext};
use safar_core::tools::{format_irr, ticket_view};
use safar_core::ConversationManager;
use safar_types::config::{LogFormat, LoggingConfig};
use safar_types::session::Session;

const HELP: &str = "Commands: /tickets  /reset  /help  /quit";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.load_options()).context("failed to load configuration")?;

    if cli.check {
        println!("configuration is valid");
        return Ok(());
    }

    init_logging(&config.logging);
    log::info!("{} starting with model {}", config.app_name, config.llm.model);

    let ctx = AppContext::bootstrap(config).await.context("failed to start the agent")?;
    run_repl(&ctx, cli.show_tickets).await
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }
}

async fn run_repl(ctx: &AppContext, show_tickets: bool) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session = Session::new();

    let banner = format!(
        "{name}\nسلام! به آژانس مسافرتی {name} خوش اومدین. چطور می‌تونم کمکتون کنم؟\n\
         Hello! Welcome to {name}. How can I help you today?\n{HELP}\n",
        name = ctx.config.app_name
    );
    stdout.write_all(banner.as_bytes()).await?;

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Input::parse(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => write_line(&mut stdout, HELP).await?,
            Input::Reset => {
                session = Session::new();
                write_line(&mut stdout, "Conversation cleared.").await?;
            }
            Input::Tickets => write_line(&mut stdout, &ticket_listing(&ctx.manager)).await?,
            Input::Unknown(cmd) => write_line(&mut stdout, &format!("Unknown command {cmd}. {HELP}")).await?,
            Input::Message(text) => {
                let response = ctx.manager.handle(&mut session, text).await;
                log_events(&ctx.manager);
                log::debug!(
                    "turn ended {:?} after {} round trips, {} tool calls",
                    response.outcome,
                    response.round_trips,
                    response.tool_calls
                );
                write_line(&mut stdout, &response.text).await?;
                if show_tickets {
                    write_line(&mut stdout, &ticket_listing(&ctx.manager)).await?;
                }
            }
        }
    }

    write_line(&mut stdout, "خدانگهدار! Goodbye!").await?;
    Ok(())
}

async fn write_line(stdout: &mut tokio::io::Stdout, text: &str) -> std::io::Result<()> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

fn log_events(manager: &ConversationManager) {
    for event in manager.event_bus().drain() {
        log::debug!("event {:?}", event);
    }
}

fn ticket_listing(manager: &ConversationManager) -> String {
    let tickets = manager.tools().tickets().list();
    if tickets.is_empty() {
        return "No tickets booked yet.".to_string();
    }

    let mut out = format!("Tickets ({}):", tickets.len());
    for ticket in &tickets {
        let view = ticket_view(ticket);
        out.push_str(&format!(
            "\n  {} | {} -> {} | {} {} | {} | {} IRR | {}",
            ticket.id.as_str(),
            view["origin"].as_str().unwrap_or_default(),
            view["destination"].as_str().unwrap_or_default(),
            view["travel_date"].as_str().unwrap_or_default(),
            view["departure_time"].as_str().unwrap_or_default(),
            ticket.passenger_name,
            format_irr(ticket.price_irr),
            view["status"].as_str().unwrap_or_default(),
        ));
    }
    out
}
