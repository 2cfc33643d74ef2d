use super::unit_of_work::{RowLocks, Sequences, WriteSet};
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::donation::{Donation, DonationId};
use crate::domain::ports::{Store, Transaction};
use crate::error::{Entity, GivingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing campaign rows.
pub const CF_CAMPAIGNS: &str = "campaigns";
/// Column Family for storing donation rows.
pub const CF_DONATIONS: &str = "donations";

/// A persistent store implementation using RocksDB.
///
/// Campaigns and donations live in separate Column Families keyed by
/// big-endian ids, with JSON values. A transaction commits as a single
/// `WriteBatch`, so a donation status change and its campaign ledger update
/// land together or not at all. Row locks are process-local.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    locks: RowLocks,
    sequences: Arc<Sequences>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the id
    /// sequences after the highest stored keys.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_campaigns = ColumnFamilyDescriptor::new(CF_CAMPAIGNS, Options::default());
        let cf_donations = ColumnFamilyDescriptor::new(CF_DONATIONS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_campaigns, cf_donations])?;

        let last_campaign = last_key(&db, CF_CAMPAIGNS)?;
        let last_donation = last_key(&db, CF_DONATIONS)?;

        Ok(Self {
            db: Arc::new(db),
            locks: RowLocks::new(),
            sequences: Arc::new(Sequences::starting_after(last_campaign, last_donation)),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        column_family(&self.db, name)
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: u64) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        GivingError::Storage(Box::new(std::io::Error::other(format!(
            "{name} column family not found"
        ))))
    })
}

fn last_key(db: &DB, name: &str) -> Result<u64> {
    let cf = column_family(db, name)?;
    match db.iterator_cf(cf, IteratorMode::End).next() {
        Some(item) => {
            let (key, _value) = item?;
            let bytes: [u8; 8] = key[..].try_into().map_err(|_| {
                GivingError::Storage(Box::new(std::io::Error::other(format!(
                    "malformed key in {name}"
                ))))
            })?;
            Ok(u64::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

#[async_trait]
impl Store for RocksDBStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(RocksDBTransaction {
            store: self.clone(),
            writes: WriteSet::default(),
        }))
    }

    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        self.read(CF_CAMPAIGNS, id.0)
    }

    async fn donation(&self, id: DonationId) -> Result<Option<Donation>> {
        self.read(CF_DONATIONS, id.0)
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>> {
        self.scan(CF_CAMPAIGNS)
    }

    async fn donations_for_campaign(&self, id: CampaignId) -> Result<Vec<Donation>> {
        let donations: Vec<Donation> = self.scan(CF_DONATIONS)?;
        Ok(donations
            .into_iter()
            .filter(|d| d.campaign_id == id)
            .collect())
    }
}

pub struct RocksDBTransaction {
    store: RocksDBStore,
    writes: WriteSet,
}

#[async_trait]
impl Transaction for RocksDBTransaction {
    async fn lock_campaign(&mut self, id: CampaignId) -> Result<Campaign> {
        if !self.writes.holds(id) {
            let guard = self.store.locks.acquire(id).await;
            self.writes.hold(id, guard);
        }
        if let Some(campaign) = self.writes.campaigns.get(&id) {
            return Ok(campaign.clone());
        }
        match self.store.read(CF_CAMPAIGNS, id.0)? {
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
        self.store.read(CF_DONATIONS, id.0)
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
        let RocksDBTransaction { store, writes } = *self;
        let (campaigns, donations, guards) = writes.into_parts();

        let mut batch = WriteBatch::default();
        let cf_campaigns = store.cf(CF_CAMPAIGNS)?;
        for (id, campaign) in &campaigns {
            batch.put_cf(cf_campaigns, id.0.to_be_bytes(), serde_json::to_vec(campaign)?);
        }
        let cf_donations = store.cf(CF_DONATIONS)?;
        for (id, donation) in &donations {
            batch.put_cf(cf_donations, id.0.to_be_bytes(), serde_json::to_vec(donation)?);
        }
        store.db.write(batch)?;

        drop(guards);
        Ok(())
    }
}
