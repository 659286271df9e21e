//! Terminal frontend over the integration flows.

mod prompts;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::client::IntegrationClient;
use crate::config::AppConfig;
use crate::flows::connections::{ApproveAll, ConnectionManager, DisconnectGate};
use crate::flows::orders::OrderDraft;
use crate::flows::webhooks::WebhookForm;
use crate::models::{ConnectionStatus, WebhookEvent, WebhookEventKind};
use crate::monitor::{MonitorView, SourceFilter, WebhookFeed, WebhookMonitor};
use crate::session::{NoticeKind, SessionContext};

/// Operations dashboard for the restaurant integration hub.
#[derive(Debug, Parser)]
#[command(name = "pizzaops", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the available system adapters
    Adapters,
    /// List connections and their status
    Connections,
    /// Connect a system, prompting for its credentials
    Connect {
        /// Adapter id; prompted for when omitted
        system: Option<String>,
    },
    /// Disconnect a connection
    Disconnect {
        connection_id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Take an order and submit it through the Square adapter
    Order,
    /// Webhook registration and monitoring
    Webhooks {
        #[command(subcommand)]
        command: WebhookCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum WebhookCommand {
    /// Register a webhook endpoint
    Register {
        /// Path the backend should expose
        path: String,
        #[arg(long)]
        description: Option<String>,
        /// Event kind to subscribe to; repeatable
        #[arg(long = "event", value_name = "KIND")]
        events: Vec<WebhookEventKind>,
    },
    /// Poll for webhook deliveries until interrupted
    Watch {
        /// Only show events from this source
        #[arg(long)]
        source: Option<String>,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let base_url = config.base_url().context("invalid integration base URL")?;
    let client = IntegrationClient::new(base_url, config.api_token.clone());
    let ctx = SessionContext::new(client, config.notice_ttl());

    match cli.command {
        Command::Adapters => list_adapters(ctx).await,
        Command::Connections => list_connections(ctx).await,
        Command::Connect { system } => connect(ctx, system).await,
        Command::Disconnect { connection_id, yes } => disconnect(ctx, &connection_id, yes).await,
        Command::Order => order(ctx).await,
        Command::Webhooks { command } => match command {
            WebhookCommand::Register {
                path,
                description,
                events,
            } => register_webhook(ctx, path, description, events).await,
            WebhookCommand::Watch { source } => watch(ctx, source, config.poll_interval()).await,
        },
    }
}

/// Load the session screen, bailing out with the generic load failure line
/// when either initial fetch failed.
async fn load_manager(ctx: &SessionContext) -> Result<ConnectionManager> {
    let mut manager = ConnectionManager::new(ctx.clone());
    manager.load().await;
    if let Some(load_error) = manager.load_error() {
        return Err(load_error.into());
    }
    Ok(manager)
}

async fn list_adapters(ctx: SessionContext) -> Result<()> {
    let manager = load_manager(&ctx).await?;
    if manager.adapters().is_empty() {
        println!("No adapters available.");
        return Ok(());
    }
    for adapter in manager.adapters() {
        let connected = manager
            .connections()
            .iter()
            .any(|connection| connection.system == adapter.id);
        let marker = if connected {
            style("connected").green()
        } else {
            style("not connected").dim()
        };
        println!("{}  {}  [{}]", style(&adapter.id).bold(), adapter.name, marker);
        if !adapter.required_credentials.is_empty() {
            let fields: Vec<&str> = adapter
                .required_credentials
                .iter()
                .map(|field| field.label.as_str())
                .collect();
            println!("    credentials: {}", style(fields.join(", ")).dim());
        }
    }
    Ok(())
}

async fn list_connections(ctx: SessionContext) -> Result<()> {
    let manager = load_manager(&ctx).await?;
    if manager.connections().is_empty() {
        println!("No connections yet.");
        return Ok(());
    }
    for connection in manager.connections() {
        println!(
            "{}  {} ({})  {}  connected {}",
            style(&connection.id).bold(),
            connection.name,
            connection.system,
            styled_status(connection.status),
            connection.connected_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

async fn connect(ctx: SessionContext, system: Option<String>) -> Result<()> {
    let mut manager = load_manager(&ctx).await?;

    let adapter_id = match system {
        Some(system) => system,
        None => prompts::pick_adapter(manager.adapters())?,
    };
    manager.select_adapter(Some(&adapter_id));
    let adapter = match manager.selected_adapter() {
        Some(adapter) => adapter.clone(),
        None => bail!("unknown system '{}'", adapter_id),
    };

    for field in &adapter.required_credentials {
        let value = prompts::credential_value(field)?;
        manager.set_credential(&field.name, value);
    }

    println!("{}", style(format!("Connecting to {}...", adapter.name)).dim());
    match manager.submit_connect().await {
        Ok(connection) => {
            flush_notices(&ctx);
            println!(
                "{} is now {}",
                style(&connection.name).bold(),
                styled_status(connection.status)
            );
            Ok(())
        }
        Err(error) => {
            flush_notices(&ctx);
            Err(error.into())
        }
    }
}

async fn disconnect(ctx: SessionContext, connection_id: &str, yes: bool) -> Result<()> {
    let mut manager = load_manager(&ctx).await?;
    let result = if yes {
        manager.disconnect(connection_id, &ApproveAll).await
    } else {
        manager.disconnect(connection_id, &ConfirmPrompt).await
    };
    match result {
        Ok(()) => {
            if !flush_notices(&ctx) {
                println!("{}", style("Cancelled.").dim());
            }
            Ok(())
        }
        Err(error) => {
            flush_notices(&ctx);
            Err(error.into())
        }
    }
}

async fn order(ctx: SessionContext) -> Result<()> {
    let mut draft = OrderDraft::new(ctx.clone());
    prompts::fill_order(&mut draft)?;

    println!("{}", style("Submitting order...").dim());
    match draft.submit().await {
        Ok(confirmation) => {
            flush_notices(&ctx);
            if !confirmation.status.is_empty() {
                println!("Status: {}", confirmation.status);
            }
            if let Some(receipt) = &confirmation.receipt_url {
                println!("Receipt: {}", style(receipt).underlined());
            }
            Ok(())
        }
        Err(error) => {
            if !flush_notices(&ctx)
                && let Some(message) = draft.form_error()
            {
                eprintln!("{}", style(message).red());
            }
            Err(error.into())
        }
    }
}

async fn register_webhook(
    ctx: SessionContext,
    path: String,
    description: Option<String>,
    events: Vec<WebhookEventKind>,
) -> Result<()> {
    let mut form = WebhookForm::new(ctx.clone());
    form.set_path(path);
    if let Some(description) = description {
        form.set_description(description);
    }
    form.set_events(events);

    match form.submit().await {
        Ok(receipt) => {
            flush_notices(&ctx);
            println!("Webhook id: {}", style(&receipt.id).bold());
            if let Some(url) = &receipt.url {
                println!("Deliveries arrive at {}", style(url).underlined());
            }
            Ok(())
        }
        Err(error) => {
            if !flush_notices(&ctx)
                && let Some(message) = form.form_error()
            {
                eprintln!("{}", style(message).red());
            }
            Err(error.into())
        }
    }
}

async fn watch(ctx: SessionContext, source: Option<String>, poll_interval: Duration) -> Result<()> {
    let feed: Arc<dyn WebhookFeed> = ctx.client.clone();
    let mut monitor = WebhookMonitor::new(feed, poll_interval);
    if let Some(source) = source {
        monitor.set_filter(SourceFilter::Source(source));
    }
    monitor.start();
    println!(
        "{}",
        style("Watching for webhook deliveries (ctrl-c to stop)").dim()
    );

    let mut seen: HashSet<String> = HashSet::new();
    let mut last_error: Option<String> = None;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => match monitor.view() {
                MonitorView::Events(events) => {
                    if last_error.take().is_some() {
                        println!("{}", style("Feed recovered.").green());
                    }
                    for event in fresh_events(events, &mut seen) {
                        println!(
                            "[{}] {} {} {}",
                            event.local_time(),
                            style(&event.source).cyan(),
                            event.method,
                            event.path,
                        );
                    }
                }
                MonitorView::Failed(message) => {
                    if last_error.as_deref() != Some(message.as_str()) {
                        eprintln!("{}", style(&message).red());
                        last_error = Some(message);
                    }
                }
            },
        }
    }

    monitor.stop().await;
    println!("{}", style("Stopped.").dim());
    Ok(())
}

/// Gate that asks the operator before disconnecting.
struct ConfirmPrompt;

#[async_trait]
impl DisconnectGate for ConfirmPrompt {
    async fn confirm(&self, connection_id: &str) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Disconnect {}?", connection_id))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Events from the snapshot that have not been printed yet. `seen` is
/// replaced with the snapshot's ids, so it never outgrows one snapshot over
/// a long watch session.
fn fresh_events(snapshot: Vec<WebhookEvent>, seen: &mut HashSet<String>) -> Vec<WebhookEvent> {
    let mut fresh = Vec::new();
    let mut current = HashSet::with_capacity(snapshot.len());
    for event in snapshot {
        if current.insert(event.id.clone()) && !seen.contains(&event.id) {
            fresh.push(event);
        }
    }
    *seen = current;
    fresh
}

/// Print the session's current notice, if any. Returns whether one was shown.
fn flush_notices(ctx: &SessionContext) -> bool {
    match ctx.notices.current() {
        Some(notice) => {
            match notice.kind {
                NoticeKind::Success => println!("{}", style(notice.text).green()),
                NoticeKind::Error => eprintln!("{}", style(notice.text).red()),
            }
            true
        }
        None => false,
    }
}

fn styled_status(status: ConnectionStatus) -> console::StyledObject<ConnectionStatus> {
    match status {
        ConnectionStatus::Active => style(status).green(),
        ConnectionStatus::Pending => style(status).yellow(),
        ConnectionStatus::Inactive => style(status).dim(),
    }
}
