//! Payment rails. One [`PaymentProcessor`] per [`PaymentMethod`], looked up
//! through the [`ProcessorRegistry`].

pub mod processors;

use crate::domain::campaign::{Campaign, LedgerOutcome};
use crate::domain::donation::{Donation, PaymentMethod, PaymentStatus};
use crate::domain::ports::GatewayRef;
use crate::error::{GivingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use processors::{
    BankTransferProcessor, CreditCardProcessor, DigitalWalletProcessor, PayrollDeductionProcessor,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Where `process` left a donation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Paid and credited to the campaign ledger.
    Completed(LedgerOutcome),
    /// Reference issued; the ledger waits for a manual approve.
    AwaitingApproval,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn method(&self) -> PaymentMethod;

    fn supports(&self, method: PaymentMethod) -> bool {
        self.method() == method
    }

    /// Drives a `pending` donation off `pending`, crediting `campaign` when it completes.
    ///
    /// On `PaymentGatewayFailure` the donation has already been marked `failed`
    /// and the campaign is untouched; the caller persists it before surfacing the error.
    async fn process(
        &self,
        donation: &mut Donation,
        campaign: &mut Campaign,
        now: DateTime<Utc>,
    ) -> Result<Settlement>;

    /// Rail-side reversal of a completed payment. Status and ledger are the caller's.
    async fn refund(&self, donation: &Donation) -> Result<()>;

    /// Status as reported by the rail. Rails without a lookup report `pending`.
    fn status(&self, _reference: &str) -> PaymentStatus {
        PaymentStatus::Pending
    }
}

/// `<PREFIX>_<YYYYmmddHHMMSS>_<id>`
pub fn reference(prefix: &str, donation: &Donation, now: DateTime<Utc>) -> String {
    format!("{}_{}_{}", prefix, now.format("%Y%m%d%H%M%S"), donation.id)
}

pub(crate) fn ensure_owned_by(donation: &Donation, campaign: &Campaign) -> Result<()> {
    if donation.campaign_id != campaign.id {
        return Err(GivingError::Validation(format!(
            "donation {} belongs to campaign {}, not {}",
            donation.id, donation.campaign_id, campaign.id
        )));
    }
    Ok(())
}

/// Marks the donation completed under `prefix` and credits the ledger.
pub(crate) fn complete_and_credit(
    prefix: &str,
    donation: &mut Donation,
    campaign: &mut Campaign,
    now: DateTime<Utc>,
) -> Result<Settlement> {
    ensure_owned_by(donation, campaign)?;
    let reference = reference(prefix, donation, now);
    donation.mark_completed(reference, now)?;
    let outcome = campaign.increment(donation.amount)?;
    Ok(Settlement::Completed(outcome))
}

/// The fixed set of rails keyed by method.
#[derive(Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<PaymentMethod, Arc<dyn PaymentProcessor>>,
}

impl ProcessorRegistry {
    /// Registers the four rails. Card and wallet charges go through `gateway`.
    pub fn new(gateway: GatewayRef) -> Self {
        let rails: [Arc<dyn PaymentProcessor>; 4] = [
            Arc::new(PayrollDeductionProcessor),
            Arc::new(BankTransferProcessor),
            Arc::new(CreditCardProcessor::new(gateway.clone())),
            Arc::new(DigitalWalletProcessor::new(gateway)),
        ];
        let processors = rails.into_iter().map(|p| (p.method(), p)).collect();
        Self { processors }
    }

    pub fn processor_for(&self, method: PaymentMethod) -> Result<&dyn PaymentProcessor> {
        self.processors
            .get(&method)
            .filter(|p| p.supports(method))
            .map(|p| p.as_ref())
            .ok_or_else(|| GivingError::InvalidPaymentMethod(method.to_string()))
    }

    /// Looks up a rail by its wire name.
    pub fn resolve(&self, method: &str) -> Result<&dyn PaymentProcessor> {
        self.processor_for(method.parse()?)
    }
}
