use super::{PaymentProcessor, Settlement, complete_and_credit, ensure_owned_by, reference};
use crate::domain::campaign::Campaign;
use crate::domain::donation::{Donation, PaymentMethod, PaymentStatus};
use crate::domain::ports::GatewayRef;
use crate::error::{GivingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

fn ensure_pending(donation: &Donation, next: PaymentStatus) -> Result<()> {
    donation.ensure_status(PaymentStatus::Pending, next)
}

fn ensure_refundable(donation: &Donation) -> Result<()> {
    donation.ensure_status(PaymentStatus::Completed, PaymentStatus::Refunded)
}

/// Charges through `gateway`; a decline marks the donation `failed` and
/// leaves the ledger alone.
async fn charge_then_complete(
    prefix: &str,
    gateway: &GatewayRef,
    donation: &mut Donation,
    campaign: &mut Campaign,
    now: DateTime<Utc>,
) -> Result<Settlement> {
    ensure_pending(donation, PaymentStatus::Completed)?;
    ensure_owned_by(donation, campaign)?;
    if let Err(err) = gateway.charge(donation).await {
        let err = match err {
            GivingError::PaymentGatewayFailure(_) => err,
            other => GivingError::PaymentGatewayFailure(other.to_string()),
        };
        donation.mark_failed(reference(prefix, donation, now))?;
        warn!(
            donation_id = %donation.id,
            campaign_id = %campaign.id,
            method = %donation.payment_method,
            error = %err,
            "payment declined"
        );
        return Err(err);
    }
    complete_and_credit(prefix, donation, campaign, now)
}

/// Internal rail: the deduction is booked against payroll, so it completes at once.
pub struct PayrollDeductionProcessor;

#[async_trait]
impl PaymentProcessor for PayrollDeductionProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::PayrollDeduction
    }

    async fn process(
        &self,
        donation: &mut Donation,
        campaign: &mut Campaign,
        now: DateTime<Utc>,
    ) -> Result<Settlement> {
        ensure_pending(donation, PaymentStatus::Completed)?;
        complete_and_credit("PAYROLL", donation, campaign, now)
    }

    async fn refund(&self, donation: &Donation) -> Result<()> {
        ensure_refundable(donation)?;
        info!(donation_id = %donation.id, "payroll deduction reversal requested");
        Ok(())
    }
}

/// Needs a finance team member to confirm the funds arrived.
pub struct BankTransferProcessor;

#[async_trait]
impl PaymentProcessor for BankTransferProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::BankTransfer
    }

    async fn process(
        &self,
        donation: &mut Donation,
        campaign: &mut Campaign,
        now: DateTime<Utc>,
    ) -> Result<Settlement> {
        ensure_pending(donation, PaymentStatus::Processing)?;
        ensure_owned_by(donation, campaign)?;
        donation.mark_processing(reference("BANK", donation, now))?;
        Ok(Settlement::AwaitingApproval)
    }

    async fn refund(&self, donation: &Donation) -> Result<()> {
        ensure_refundable(donation)?;
        info!(donation_id = %donation.id, "bank transfer return requested");
        Ok(())
    }
}

pub struct CreditCardProcessor {
    gateway: GatewayRef,
}

impl CreditCardProcessor {
    pub fn new(gateway: GatewayRef) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl PaymentProcessor for CreditCardProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::CreditCard
    }

    async fn process(
        &self,
        donation: &mut Donation,
        campaign: &mut Campaign,
        now: DateTime<Utc>,
    ) -> Result<Settlement> {
        charge_then_complete("CC", &self.gateway, donation, campaign, now).await
    }

    async fn refund(&self, donation: &Donation) -> Result<()> {
        ensure_refundable(donation)?;
        info!(donation_id = %donation.id, "card refund requested");
        Ok(())
    }
}

pub struct DigitalWalletProcessor {
    gateway: GatewayRef,
}

impl DigitalWalletProcessor {
    pub fn new(gateway: GatewayRef) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl PaymentProcessor for DigitalWalletProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::DigitalWallet
    }

    async fn process(
        &self,
        donation: &mut Donation,
        campaign: &mut Campaign,
        now: DateTime<Utc>,
    ) -> Result<Settlement> {
        charge_then_complete("DW", &self.gateway, donation, campaign, now).await
    }

    async fn refund(&self, donation: &Donation) -> Result<()> {
        ensure_refundable(donation)?;
        info!(donation_id = %donation.id, "wallet refund requested");
        Ok(())
    }
}
