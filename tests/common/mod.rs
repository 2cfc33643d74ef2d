#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use giving_engine::application::campaigns::CampaignService;
use giving_engine::application::donations::DonationService;
use giving_engine::application::notifier::EventNotifier;
use giving_engine::application::payment::ProcessorRegistry;
use giving_engine::domain::campaign::{CampaignDetails, CampaignId, CauseCategory};
use giving_engine::domain::ports::{DispatcherRef, GatewayRef};
use giving_engine::domain::user::{User, UserId};
use giving_engine::infrastructure::clock::FixedClock;
use giving_engine::infrastructure::gateway::SimulatedGateway;
use giving_engine::infrastructure::in_memory::{InMemoryDirectory, InMemoryStore};
use giving_engine::infrastructure::mailbox::{Outbox, mailbox};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const CREATOR: UserId = UserId(1);
pub const APPROVER: UserId = UserId(2);
pub const DONORS: [UserId; 3] = [UserId(3), UserId(4), UserId(5)];

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 29, 9, 0, 0).unwrap()
}

/// Services wired over in-memory adapters with a fixed clock.
pub struct Harness {
    pub store: InMemoryStore,
    pub directory: InMemoryDirectory,
    pub clock: Arc<FixedClock>,
    pub outbox: Option<Outbox>,
    pub donations: Arc<DonationService>,
    pub campaigns: Arc<CampaignService>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_gateway(Arc::new(SimulatedGateway::approving())).await
    }

    pub async fn with_gateway(gateway: GatewayRef) -> Self {
        let (dispatcher, outbox) = mailbox();
        Self::build(gateway, Arc::new(dispatcher), Some(outbox)).await
    }

    /// Every notification fails to dispatch: the queue is already closed.
    pub async fn with_broken_mailbox() -> Self {
        let (dispatcher, outbox) = mailbox();
        drop(outbox);
        Self::build(
            Arc::new(SimulatedGateway::approving()),
            Arc::new(dispatcher),
            None,
        )
        .await
    }

    async fn build(gateway: GatewayRef, dispatcher: DispatcherRef, outbox: Option<Outbox>) -> Self {
        let store = InMemoryStore::new();
        let directory = InMemoryDirectory::new();
        directory
            .register(User::new(CREATOR, "Grace", "grace@corp.example"))
            .await;
        directory
            .register(User::new(APPROVER, "Linus", "linus@corp.example"))
            .await;
        for (i, id) in DONORS.into_iter().enumerate() {
            directory
                .register(User::new(id, format!("Donor {i}"), format!("donor{i}@corp.example")))
                .await;
        }
        let clock = Arc::new(FixedClock::new(start()));

        let notifier = EventNotifier::new(dispatcher, Arc::new(directory.clone()));
        let donations = DonationService::new(
            Arc::new(store.clone()),
            Arc::new(directory.clone()),
            ProcessorRegistry::new(gateway),
            notifier.clone(),
            clock.clone(),
        );
        let campaigns = CampaignService::new(
            Arc::new(store.clone()),
            Arc::new(directory.clone()),
            notifier,
            clock.clone(),
        );
        Self {
            store,
            directory,
            clock,
            outbox,
            donations: Arc::new(donations),
            campaigns: Arc::new(campaigns),
        }
    }

    pub fn details(&self, goal: Decimal) -> CampaignDetails {
        CampaignDetails {
            title: "Food bank matching".to_string(),
            description: "Matched employee giving for the regional food bank and its pantries"
                .to_string(),
            cause_category: CauseCategory::Community,
            goal_amount: goal,
            start_date: start(),
            end_date: start() + Duration::days(30),
        }
    }

    /// Creates and approves a campaign owned by [`CREATOR`].
    pub async fn active_campaign(&self, goal: Decimal) -> CampaignId {
        let campaign = self
            .campaigns
            .create_campaign(CREATOR, self.details(goal))
            .await
            .unwrap();
        self.campaigns
            .approve_campaign(campaign.id, APPROVER)
            .await
            .unwrap();
        campaign.id
    }

    pub fn sent(&mut self) -> Vec<giving_engine::infrastructure::mailbox::Notification> {
        self.outbox.as_mut().map(|o| o.drain()).unwrap_or_default()
    }
}

pub fn write_commands(path: &Path, rows: &[[&str; 7]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["type", "campaign", "user", "donation", "amount", "kind", "text"])?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}
