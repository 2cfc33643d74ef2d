//! Building blocks shared by the store adapters: the campaign row-lock table,
//! id sequences and the buffered write set of an open transaction.

use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::donation::{Donation, DonationId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per campaign row.
///
/// Holding the guard is the `SELECT ... FOR UPDATE` of this crate: a second
/// transaction locking the same campaign waits until the first commits or
/// rolls back.
#[derive(Default, Clone)]
pub struct RowLocks {
    rows: Arc<Mutex<HashMap<CampaignId, Arc<Mutex<()>>>>>,
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: CampaignId) -> OwnedMutexGuard<()> {
        let row = {
            let mut rows = self.rows.lock().await;
            rows.entry(id).or_default().clone()
        };
        row.lock_owned().await
    }

    /// Gives back a guard for a row that turned out not to exist. The entry is
    /// pruned unless another transaction holds or waits on it.
    pub async fn release(&self, id: CampaignId, guard: OwnedMutexGuard<()>) {
        let mut rows = self.rows.lock().await;
        drop(guard);
        if rows.get(&id).is_some_and(|row| Arc::strong_count(row) == 1) {
            rows.remove(&id);
        }
    }

    /// Number of rows with a lock entry.
    pub async fn tracked(&self) -> usize {
        self.rows.lock().await.len()
    }
}

/// Monotonic id allocation. Ids burnt by rolled-back transactions are not reused.
#[derive(Default)]
pub struct Sequences {
    campaign: AtomicU64,
    donation: AtomicU64,
}

impl Sequences {
    pub fn starting_after(campaign: u64, donation: u64) -> Self {
        Self {
            campaign: AtomicU64::new(campaign),
            donation: AtomicU64::new(donation),
        }
    }

    pub fn next_campaign(&self) -> CampaignId {
        CampaignId(self.campaign.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn next_donation(&self) -> DonationId {
        DonationId(self.donation.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Row guards taken by a transaction. Dropping releases them.
#[derive(Default)]
pub struct RowGuards(HashMap<CampaignId, OwnedMutexGuard<()>>);

/// Writes buffered by an open transaction, plus the row locks it holds.
#[derive(Default)]
pub struct WriteSet {
    pub campaigns: HashMap<CampaignId, Campaign>,
    pub donations: HashMap<DonationId, Donation>,
    guards: RowGuards,
}

impl WriteSet {
    pub fn holds(&self, id: CampaignId) -> bool {
        self.guards.0.contains_key(&id)
    }

    pub fn hold(&mut self, id: CampaignId, guard: OwnedMutexGuard<()>) {
        self.guards.0.insert(id, guard);
    }

    pub fn release(&mut self, id: CampaignId) -> Option<OwnedMutexGuard<()>> {
        self.guards.0.remove(&id)
    }

    pub fn put_campaign(&mut self, campaign: Campaign) {
        self.campaigns.insert(campaign.id, campaign);
    }

    pub fn put_donation(&mut self, donation: Donation) {
        self.donations.insert(donation.id, donation);
    }

    /// Splits the set for commit. Keep the guards alive until the rows are applied.
    pub fn into_parts(
        self,
    ) -> (
        HashMap<CampaignId, Campaign>,
        HashMap<DonationId, Donation>,
        RowGuards,
    ) {
        (self.campaigns, self.donations, self.guards)
    }
}
