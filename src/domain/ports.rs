//! Collaborator interfaces consumed by the giving core.

use super::campaign::{Campaign, CampaignId};
use super::donation::{Donation, DonationId};
use super::user::{User, UserId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Transactional persistence for campaigns and donations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a unit of work. Dropping it without [`Transaction::commit`] rolls back.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>>;
    async fn donation(&self, id: DonationId) -> Result<Option<Donation>>;
    async fn campaigns(&self) -> Result<Vec<Campaign>>;
    async fn donations_for_campaign(&self, id: CampaignId) -> Result<Vec<Donation>>;
}

/// A single short-lived unit of work.
///
/// Every change to a donation is made while holding the row lock of the
/// campaign it belongs to, so that lock also serialises donation updates.
#[async_trait]
pub trait Transaction: Send {
    /// Takes the campaign's row lock (held until commit or drop) and returns
    /// the freshest row. Fails with `NotFound` when the campaign does not exist.
    async fn lock_campaign(&mut self, id: CampaignId) -> Result<Campaign>;
    /// Reads a donation, including writes made earlier in this transaction.
    async fn donation(&mut self, id: DonationId) -> Result<Option<Donation>>;
    async fn next_campaign_id(&mut self) -> Result<CampaignId>;
    async fn next_donation_id(&mut self) -> Result<DonationId>;
    fn put_campaign(&mut self, campaign: Campaign);
    fn put_donation(&mut self, donation: Donation);
    /// Applies all buffered writes atomically and releases the row locks.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Resolves user identity for donor and approver attribution.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn user(&self, id: UserId) -> Result<Option<User>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    DonationReceipt,
    CampaignCompleted,
    CampaignApproved,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::DonationReceipt => "donation_receipt",
            Template::CampaignCompleted => "campaign_completed",
            Template::CampaignApproved => "campaign_approved",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queues outbound notifications. Delivery is someone else's problem.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        template: Template,
        recipient: &str,
        payload: serde_json::Value,
    ) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// External charge for card and wallet rails.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns `PaymentGatewayFailure` when the charge is declined.
    async fn charge(&self, donation: &Donation) -> Result<()>;
}

pub type StoreRef = Arc<dyn Store>;
pub type IdentityRef = Arc<dyn IdentityProvider>;
pub type DispatcherRef = Arc<dyn NotificationDispatcher>;
pub type ClockRef = Arc<dyn Clock>;
pub type GatewayRef = Arc<dyn PaymentGateway>;
