mod api;
mod gateway;
mod markers;

use clap::{Parser, Subcommand};
use gateway::{BulkOutcome, BulkRecipient, Gateway, GatewaySettings};
use outreach_channels::BridgeTransport;
use outreach_core::{
    config::{self, Config},
    lead::{Lead, LeadFilter, LeadStatus},
    shellexpand,
    traits::{ContactDirectory, Responder, Transport},
};
use outreach_memory::{read_contact_rows, CsvDirectory, DeliveryLog, Store};
use outreach_providers::OpenAiResponder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(
    name = "outreach",
    version,
    about = "Outreach: conversational sales over a messaging web client"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor the configured contacts and answer them until Ctrl+C.
    Start,
    /// Send a personalized offer to every contact in a CSV file.
    Send {
        /// CSV with a `phone` column and optional `name` and `custom_message` columns.
        #[arg(long)]
        contacts: PathBuf,
        /// Message template file; `{name}`, `{phone}`, and `{custom_message}` are filled per contact.
        #[arg(long)]
        template: PathBuf,
        /// Media file to attach (repeatable).
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
        /// Keep monitoring the contacts after sending, until Ctrl+C.
        #[arg(long)]
        monitor: bool,
    },
    /// Inspect and update captured leads.
    Leads {
        #[command(subcommand)]
        action: LeadsCommand,
    },
    /// Check transport and responder availability and lead counts.
    Status,
}

#[derive(Subcommand)]
enum LeadsCommand {
    /// List leads, oldest first.
    List {
        #[arg(long)]
        status: Option<LeadStatus>,
        #[arg(long)]
        contact: Option<String>,
    },
    /// Set the status of a contact's most recent lead.
    SetStatus { phone: String, status: LeadStatus },
    /// Export leads to a CSV file.
    Export {
        path: PathBuf,
        #[arg(long)]
        status: Option<LeadStatus>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg);

    match cli.command {
        Commands::Start => {
            let gw = build_gateway(&cfg).await?;
            check_collaborators(&gw).await;
            for raw in &cfg.monitor.contacts {
                if let Err(e) = gw.add_contact(raw).await {
                    warn!("skipping monitored contact '{raw}': {e}");
                }
            }
            if cfg.monitor.contacts.is_empty() {
                warn!("monitor.contacts is empty; only contacts sent to from this process will be monitored");
            }
            run_until_shutdown(&gw, &cfg).await?;
        }
        Commands::Send {
            contacts,
            template,
            attachments,
            monitor,
        } => {
            let template = std::fs::read_to_string(&template)
                .map_err(|e| anyhow::anyhow!("failed to read template {}: {e}", template.display()))?;
            if template.trim().is_empty() {
                anyhow::bail!("template is empty");
            }
            if let Some(missing) = attachments.iter().find(|p| !p.exists()) {
                anyhow::bail!("attachment not found: {}", missing.display());
            }
            let recipients = load_recipients(&contacts)?;
            if recipients.is_empty() {
                anyhow::bail!("no contacts with a phone number in {}", contacts.display());
            }

            let gw = build_gateway(&cfg).await?;
            if !gw.transport.is_available().await {
                anyhow::bail!("transport '{}' is not available", gw.transport.name());
            }

            let report = gw.send_bulk(&recipients, template.trim(), &attachments).await;
            for (phone, outcome) in &report.results {
                match outcome {
                    BulkOutcome::Sent => println!("  sent     {phone}"),
                    BulkOutcome::Failed(reason) => println!("  failed   {phone}: {reason}"),
                    BulkOutcome::Skipped(reason) => println!("  skipped  {phone}: {reason}"),
                }
            }
            println!(
                "\nsent: {} | failed: {} | skipped: {}",
                report.sent, report.failed, report.skipped
            );

            if monitor {
                run_until_shutdown(&gw, &cfg).await?;
            }
        }
        Commands::Leads { action } => {
            let gw = build_gateway(&cfg).await?;
            match action {
                LeadsCommand::List { status, contact } => {
                    let contact = contact.map(|raw| gw.normalize(&raw)).transpose()?;
                    let leads = gw.list_leads(&LeadFilter { status, contact }).await?;
                    if leads.is_empty() {
                        println!("no leads");
                    }
                    for lead in &leads {
                        print_lead(lead);
                    }
                }
                LeadsCommand::SetStatus { phone, status } => {
                    let contact = gw.normalize(&phone)?;
                    let lead = gw.update_lead_status(&contact, status).await?;
                    println!("lead #{} ({}) is now {}", lead.id, lead.contact, lead.status);
                }
                LeadsCommand::Export { path, status } => {
                    let filter = LeadFilter {
                        status,
                        contact: None,
                    };
                    let n = gw.export_leads(&path, &filter).await?;
                    println!("exported {n} leads to {}", path.display());
                }
            }
        }
        Commands::Status => {
            println!("Outreach status\n");
            println!("Config: {}", cli.config);

            let transport = BridgeTransport::new(cfg.transport.clone());
            println!(
                "  transport ({}): {}",
                cfg.transport.base_url,
                if transport.is_available().await { "available" } else { "not reachable" }
            );
            let responder = build_responder(&cfg)?;
            println!(
                "  responder ({} / {}): {}",
                cfg.responder.provider,
                cfg.responder.model,
                if responder.is_available().await { "available" } else { "not available" }
            );

            let store = Store::new(&cfg.store).await?;
            println!("\nLeads:");
            for (status, n) in store.count_leads_by_status().await? {
                println!("  {:<10} {n}", status.as_str());
            }
            let [offers, replies] = DeliveryLog::new(store.pool().clone()).totals().await?;
            println!("\nDeliveries:");
            println!("  offers     {} ok, {} failed", offers.0, offers.1);
            println!("  replies    {} ok, {} failed", replies.0, replies.1);
        }
    }

    Ok(())
}

/// Stderr logging plus a daily-rotated file under `{data_dir}/logs`.
fn init_logging(cfg: &Config) -> Option<WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.outreach.log_level));

    let log_dir = PathBuf::from(shellexpand(&cfg.outreach.data_dir)).join("logs");
    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&log_dir, "outreach.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        Err(e) => {
            eprintln!("file logging disabled, cannot create {}: {e}", log_dir.display());
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

/// Build the configured responder.
fn build_responder(cfg: &Config) -> anyhow::Result<Arc<dyn Responder>> {
    match cfg.responder.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiResponder::from_config(&cfg.responder))),
        other => anyhow::bail!("unsupported responder provider: {other}"),
    }
}

/// Wire transport, responder, store, and directory into a gateway.
async fn build_gateway(cfg: &Config) -> anyhow::Result<Arc<Gateway>> {
    let transport: Arc<dyn Transport> = Arc::new(BridgeTransport::new(cfg.transport.clone()));
    let responder = build_responder(cfg)?;
    let store = Store::new(&cfg.store).await?;

    let directory = cfg.directory.contacts_csv.as_ref().and_then(|path| {
        let path = shellexpand(path);
        match CsvDirectory::load(Path::new(&path), &cfg.transport.default_country_code) {
            Ok(dir) => Some(Arc::new(dir) as Arc<dyn ContactDirectory>),
            Err(e) => {
                warn!("contacts directory unavailable, leads will not be enriched: {e}");
                None
            }
        }
    });

    let gw = Arc::new(Gateway::new(
        transport,
        responder,
        store,
        directory,
        GatewaySettings::from_config(cfg),
    ));
    if let Err(e) = gw.restore_quota().await {
        warn!("could not restore today's send count: {e}");
    }
    Ok(gw)
}

/// Warn early about collaborators that are down; the loop copes with both.
async fn check_collaborators(gw: &Gateway) {
    if !gw.transport.is_available().await {
        warn!(
            "transport '{}' is not reachable yet; polls will fail until it is",
            gw.transport.name()
        );
    }
    if !gw.responder.is_available().await {
        warn!(
            "responder '{}' is not available; customers will get the fallback reply",
            gw.responder.name()
        );
    }
}

/// Run the monitoring loop (and the control API, if enabled) until Ctrl+C,
/// then stop it and log final stats.
async fn run_until_shutdown(gw: &Arc<Gateway>, cfg: &Config) -> anyhow::Result<()> {
    gw.start();
    let api_handle = if cfg.api.enabled {
        Some(tokio::spawn(api::serve(cfg.api.clone(), gw.clone())))
    } else {
        None
    };
    println!("Outreach is monitoring, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    if let Some(h) = api_handle {
        h.abort();
    }
    gw.stop().await;
    let stats = gw.stats().await;
    info!("final stats: {}", serde_json::to_string(&stats)?);
    Ok(())
}

/// Read bulk recipients from a contacts CSV.
fn load_recipients(path: &Path) -> anyhow::Result<Vec<BulkRecipient>> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {e}", path.display()))?;
    let recipients = read_contact_rows(file)?
        .into_iter()
        .map(|row| BulkRecipient {
            phone: row.phone,
            name: Some(row.name).filter(|n| !n.is_empty()),
            custom_message: Some(row.custom_message).filter(|m| !m.trim().is_empty()),
        })
        .collect();
    Ok(recipients)
}

fn print_lead(lead: &Lead) {
    println!(
        "#{} {} {} [{}] {}{}{}",
        lead.id,
        lead.timestamp.format("%Y-%m-%d %H:%M"),
        lead.contact,
        lead.status,
        lead.confirmed_product,
        if lead.display_name.is_empty() {
            String::new()
        } else {
            format!(" | {}", lead.display_name)
        },
        if lead.location_hint.is_empty() {
            String::new()
        } else {
            format!(" | {}", lead.location_hint)
        },
    );
}
