use giving_engine::application::campaigns::CampaignService;
use giving_engine::application::donations::DonationService;
use giving_engine::application::notifier::EventNotifier;
use giving_engine::application::payment::ProcessorRegistry;
use giving_engine::config::Settings;
use giving_engine::domain::ports::{ClockRef, StoreRef};
use giving_engine::infrastructure::clock::SystemClock;
use giving_engine::infrastructure::gateway::SimulatedGateway;
use giving_engine::infrastructure::in_memory::{InMemoryDirectory, InMemoryStore};
use giving_engine::infrastructure::mailbox::{Outbox, mailbox};
use giving_engine::interfaces::csv::campaign_writer::CampaignWriter;
use giving_engine::interfaces::csv::command_reader::CommandReader;
use giving_engine::interfaces::replay::Replayer;
use giving_engine::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<&Path>) -> Result<StoreRef> {
    match db_path {
        Some(path) => {
            let store = giving_engine::infrastructure::rocksdb::RocksDBStore::open(path)
                .into_diagnostic()?;
            info!(path = %path.display(), "using RocksDB storage");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<&Path>) -> Result<StoreRef> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryStore::new()))
}

/// Stands in for mail delivery: every queued notification is logged.
async fn deliver(mut outbox: Outbox) {
    while let Some(notification) = outbox.recv().await {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            payload = %notification.payload,
            "notification delivered"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();
    telemetry::init(&settings.log, settings.log_format);

    let store = open_store(settings.db_path.as_deref())?;
    let directory = InMemoryDirectory::new();
    let clock: ClockRef = Arc::new(SystemClock);

    let (dispatcher, outbox) = mailbox();
    let delivery = tokio::spawn(deliver(outbox));

    let notifier = EventNotifier::new(Arc::new(dispatcher), Arc::new(directory.clone()));
    let processors = ProcessorRegistry::new(Arc::new(SimulatedGateway::approving()));
    let donations = DonationService::new(
        store.clone(),
        Arc::new(directory.clone()),
        processors,
        notifier.clone(),
        clock.clone(),
    );
    let campaigns = CampaignService::new(
        store,
        Arc::new(directory.clone()),
        notifier,
        clock.clone(),
    );
    let replayer = Replayer::new(donations, campaigns, directory, clock, settings.campaign_days);

    // Process commands
    let file = File::open(&settings.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = replayer.apply(command).await {
                    eprintln!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    let campaigns = replayer.campaigns().campaigns().await.into_diagnostic()?;

    // Closing the last mailbox sender lets delivery finish.
    drop(replayer);
    delivery.await.into_diagnostic()?;

    // Output final state
    let stdout = io::stdout();
    let mut writer = CampaignWriter::new(stdout.lock());
    writer.write_campaigns(&campaigns).into_diagnostic()?;

    Ok(())
}
