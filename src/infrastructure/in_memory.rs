use super::unit_of_work::{RowLocks, Sequences, WriteSet};
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::donation::{Donation, DonationId};
use crate::domain::ports::{IdentityProvider, Store, Transaction};
use crate::domain::user::{User, UserId};
use crate::error::{Entity, GivingError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    campaigns: BTreeMap<CampaignId, Campaign>,
    donations: BTreeMap<DonationId, Donation>,
}

/// A thread-safe in-memory store for campaigns and donations.
///
/// Committed rows live behind one `Arc<RwLock<..>>`; transactions buffer their
/// writes and take per-campaign row locks from a shared [`RowLocks`] table.
/// Ideal for testing or single-process deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    locks: RowLocks,
    sequences: Arc<Sequences>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            writes: WriteSet::default(),
        }))
    }

    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let tables = self.tables.read().await;
        Ok(tables.campaigns.get(&id).cloned())
    }

    async fn donation(&self, id: DonationId) -> Result<Option<Donation>> {
        let tables = self.tables.read().await;
        Ok(tables.donations.get(&id).cloned())
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>> {
        let tables = self.tables.read().await;
        Ok(tables.campaigns.values().cloned().collect())
    }

    async fn donations_for_campaign(&self, id: CampaignId) -> Result<Vec<Donation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .donations
            .values()
            .filter(|d| d.campaign_id == id)
            .cloned()
            .collect())
    }
}

pub struct InMemoryTransaction {
    store: InMemoryStore,
    writes: WriteSet,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn lock_campaign(&mut self, id: CampaignId) -> Result<Campaign> {
        if !self.writes.holds(id) {
            let guard = self.store.locks.acquire(id).await;
            self.writes.hold(id, guard);
        }
        if let Some(campaign) = self.writes.campaigns.get(&id) {
            return Ok(campaign.clone());
        }
        let found = self.store.tables.read().await.campaigns.get(&id).cloned();
        match found {
            Some(campaign) => Ok(campaign),
            None => {
                if let Some(guard) = self.writes.release(id) {
                    self.store.locks.release(id, guard).await;
                }
                Err(GivingError::NotFound(Entity::Campaign(id)))
            }
        }
    }

    async fn donation(&mut self, id: DonationId) -> Result<Option<Donation>> {
        if let Some(donation) = self.writes.donations.get(&id) {
            return Ok(Some(donation.clone()));
        }
        let tables = self.store.tables.read().await;
        Ok(tables.donations.get(&id).cloned())
    }

    async fn next_campaign_id(&mut self) -> Result<CampaignId> {
        Ok(self.store.sequences.next_campaign())
    }

    async fn next_donation_id(&mut self) -> Result<DonationId> {
        Ok(self.store.sequences.next_donation())
    }

    fn put_campaign(&mut self, campaign: Campaign) {
        self.writes.put_campaign(campaign);
    }

    fn put_donation(&mut self, donation: Donation) {
        self.writes.put_donation(donation);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { store, writes } = *self;
        let (campaigns, donations, guards) = writes.into_parts();
        let mut tables = store.tables.write().await;
        tables.campaigns.extend(campaigns);
        tables.donations.extend(donations);
        drop(tables);
        drop(guards);
        Ok(())
    }
}

/// A thread-safe in-memory identity provider.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn register(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn user(&self, id: UserId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }
}
