use super::notifier::EventNotifier;
use super::payment::{ProcessorRegistry, Settlement};
use crate::domain::campaign::CampaignId;
use crate::domain::donation::{Donation, DonationId, DonationRequest, MAX_REFUND_REASON_CHARS};
use crate::domain::money::Money;
use crate::domain::ports::{ClockRef, IdentityRef, StoreRef};
use crate::domain::user::UserId;
use crate::error::{Entity, GivingError, Result};
use tracing::info;

/// The donation workflow orchestrator.
///
/// Each operation runs in one store transaction holding the owning
/// campaign's row lock for its whole read-modify-write. Notifications go out
/// only after the commit.
pub struct DonationService {
    store: StoreRef,
    identity: IdentityRef,
    processors: ProcessorRegistry,
    notifier: EventNotifier,
    clock: ClockRef,
}

impl DonationService {
    pub fn new(
        store: StoreRef,
        identity: IdentityRef,
        processors: ProcessorRegistry,
        notifier: EventNotifier,
        clock: ClockRef,
    ) -> Self {
        Self {
            store,
            identity,
            processors,
            notifier,
            clock,
        }
    }

    /// Creates a donation and runs it through its payment rail.
    ///
    /// Every failure rolls back, except a gateway decline: the donation is then
    /// committed as `failed` and the decline is returned.
    pub async fn create_donation(
        &self,
        campaign_id: CampaignId,
        user_id: UserId,
        request: DonationRequest,
    ) -> Result<Donation> {
        let donor = self
            .identity
            .user(user_id)
            .await?
            .ok_or(GivingError::NotFound(Entity::User(user_id)))?;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let mut campaign = tx.lock_campaign(campaign_id).await?;
        if !campaign.is_accepting_donations(now) {
            return Err(GivingError::CampaignNotAcceptingDonations(campaign_id));
        }
        let valid = request.validate()?;
        let processor = self.processors.processor_for(valid.payment_method)?;

        let id = tx.next_donation_id().await?;
        let mut donation = Donation::pending(id, campaign.id, donor.id, valid, now);

        match processor.process(&mut donation, &mut campaign, now).await {
            Ok(settlement) => {
                tx.put_donation(donation.clone());
                tx.put_campaign(campaign.clone());
                tx.commit().await?;

                self.notifier.donation_created(&donor, &donation).await;
                if let Settlement::Completed(outcome) = settlement {
                    self.notifier
                        .donation_completed(&donation, &campaign, outcome)
                        .await;
                }
                Ok(donation)
            }
            Err(err @ GivingError::PaymentGatewayFailure(_)) => {
                tx.put_donation(donation);
                tx.commit().await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Confirms a `processing` donation and credits the campaign.
    pub async fn approve_donation(&self, donation_id: DonationId) -> Result<Donation> {
        let now = self.clock.now();
        let campaign_id = self.owning_campaign(donation_id).await?;

        let mut tx = self.store.begin().await?;
        let mut campaign = tx.lock_campaign(campaign_id).await?;
        let mut donation = tx
            .donation(donation_id)
            .await?
            .ok_or(GivingError::NotFound(Entity::Donation(donation_id)))?;

        donation.approve(now)?;
        let outcome = campaign.increment(donation.amount)?;

        tx.put_donation(donation.clone());
        tx.put_campaign(campaign.clone());
        tx.commit().await?;

        info!(
            donation_id = %donation.id,
            campaign_id = %campaign.id,
            amount = %donation.amount,
            "donation approved"
        );
        self.notifier
            .donation_completed(&donation, &campaign, outcome)
            .await;
        Ok(donation)
    }

    /// Refunds a `completed` donation and debits the campaign.
    ///
    /// The reason is checked before anything is read, so a blank or overlong
    /// reason reports `Validation` even when the donation is not refundable.
    pub async fn refund_donation(&self, donation_id: DonationId, reason: &str) -> Result<Donation> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(GivingError::Validation(
                "a refund reason is required".to_string(),
            ));
        }
        if reason.chars().count() > MAX_REFUND_REASON_CHARS {
            return Err(GivingError::Validation(format!(
                "refund reason cannot exceed {MAX_REFUND_REASON_CHARS} characters"
            )));
        }
        let now = self.clock.now();
        let campaign_id = self.owning_campaign(donation_id).await?;

        let mut tx = self.store.begin().await?;
        let mut campaign = tx.lock_campaign(campaign_id).await?;
        let mut donation = tx
            .donation(donation_id)
            .await?
            .ok_or(GivingError::NotFound(Entity::Donation(donation_id)))?;

        let processor = self.processors.processor_for(donation.payment_method)?;
        processor.refund(&donation).await?;
        donation.refund(reason, now)?;
        campaign.decrement(donation.amount)?;

        tx.put_donation(donation.clone());
        tx.put_campaign(campaign.clone());
        tx.commit().await?;

        info!(
            donation_id = %donation.id,
            campaign_id = %campaign.id,
            amount = %donation.amount,
            reason,
            "donation refunded"
        );
        Ok(donation)
    }

    pub async fn donation(&self, donation_id: DonationId) -> Result<Donation> {
        self.store
            .donation(donation_id)
            .await?
            .ok_or(GivingError::NotFound(Entity::Donation(donation_id)))
    }

    /// What `user_id` has given to `campaign_id` in completed donations.
    pub async fn previous_donation_total(
        &self,
        campaign_id: CampaignId,
        user_id: UserId,
    ) -> Result<Money> {
        let donations = self.store.donations_for_campaign(campaign_id).await?;
        Ok(donations
            .iter()
            .filter(|d| d.user_id == user_id && d.is_completed())
            .map(|d| d.amount)
            .sum())
    }

    async fn owning_campaign(&self, donation_id: DonationId) -> Result<CampaignId> {
        self.store
            .donation(donation_id)
            .await?
            .map(|d| d.campaign_id)
            .ok_or(GivingError::NotFound(Entity::Donation(donation_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::campaign::tests::{details, now};
    use crate::domain::campaign::{Campaign, CampaignStatus};
    use crate::domain::donation::PaymentStatus;
    use crate::domain::ports::{PaymentGateway, Store};
    use crate::domain::user::User;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::gateway::SimulatedGateway;
    use crate::infrastructure::in_memory::{InMemoryDirectory, InMemoryStore};
    use crate::infrastructure::mailbox::mailbox;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const CREATOR: UserId = UserId(1);
    const DONOR: UserId = UserId(3);

    async fn service(gateway: impl PaymentGateway + 'static) -> (DonationService, InMemoryStore) {
        let store = InMemoryStore::new();
        let directory = InMemoryDirectory::new();
        directory
            .register(User::new(CREATOR, "Creator", "creator@corp.example"))
            .await;
        directory
            .register(User::new(DONOR, "Donor", "donor@corp.example"))
            .await;

        let mut campaign = Campaign::new(CampaignId(1), details(dec!(100)), CREATOR, now()).unwrap();
        campaign.approve(UserId(2), now()).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.put_campaign(campaign);
        tx.commit().await.unwrap();

        let (dispatcher, _outbox) = mailbox();
        let notifier = EventNotifier::new(Arc::new(dispatcher), Arc::new(directory.clone()));
        let service = DonationService::new(
            Arc::new(store.clone()),
            Arc::new(directory),
            ProcessorRegistry::new(Arc::new(gateway)),
            notifier,
            Arc::new(FixedClock::new(now())),
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_payroll_donation_credits_ledger() {
        let (service, store) = service(SimulatedGateway::approving()).await;
        let donation = service
            .create_donation(
                CampaignId(1),
                DONOR,
                DonationRequest::new(dec!(25), "payroll_deduction"),
            )
            .await
            .unwrap();

        assert_eq!(donation.payment_status(), PaymentStatus::Completed);
        let campaign = store.campaign(CampaignId(1)).await.unwrap().unwrap();
        assert_eq!(campaign.current_amount(), Money::new(dec!(25)));
        assert_eq!(
            service
                .previous_donation_total(CampaignId(1), DONOR)
                .await
                .unwrap(),
            Money::new(dec!(25))
        );
    }

    #[tokio::test]
    async fn test_invalid_request_leaves_no_record() {
        let (service, store) = service(SimulatedGateway::approving()).await;
        let err = service
            .create_donation(CampaignId(1), DONOR, DonationRequest::new(dec!(0.5), "payroll_deduction"))
            .await
            .unwrap_err();
        assert!(matches!(err, GivingError::InvalidAmount(_)));

        let err = service
            .create_donation(CampaignId(1), DONOR, DonationRequest::new(dec!(10), "cheque"))
            .await
            .unwrap_err();
        assert!(matches!(err, GivingError::InvalidPaymentMethod(_)));

        assert!(store.donations_for_campaign(CampaignId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decline_is_persisted_as_failed() {
        let (service, store) = service(SimulatedGateway::declining("card expired")).await;
        let err = service
            .create_donation(CampaignId(1), DONOR, DonationRequest::new(dec!(40), "credit_card"))
            .await
            .unwrap_err();
        assert!(matches!(err, GivingError::PaymentGatewayFailure(ref r) if r == "card expired"));

        let donations = store.donations_for_campaign(CampaignId(1)).await.unwrap();
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].payment_status(), PaymentStatus::Failed);
        assert!(donations[0].payment_reference().is_some());
        let campaign = store.campaign(CampaignId(1)).await.unwrap().unwrap();
        assert_eq!(campaign.current_amount(), Money::ZERO);
        assert_eq!(campaign.status(), CampaignStatus::Active);
    }

    #[tokio::test]
    async fn test_refund_requires_reason() {
        let (service, _store) = service(SimulatedGateway::approving()).await;
        let donation = service
            .create_donation(CampaignId(1), DONOR, DonationRequest::new(dec!(10), "digital_wallet"))
            .await
            .unwrap();
        let err = service.refund_donation(donation.id, "   ").await.unwrap_err();
        assert!(matches!(err, GivingError::Validation(_)));
        assert!(service.donation(donation.id).await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_refund_reason_length_limit() {
        let (service, store) = service(SimulatedGateway::approving()).await;
        let first = service
            .create_donation(CampaignId(1), DONOR, DonationRequest::new(dec!(10), "payroll_deduction"))
            .await
            .unwrap();
        let second = service
            .create_donation(CampaignId(1), DONOR, DonationRequest::new(dec!(15), "payroll_deduction"))
            .await
            .unwrap();

        let err = service
            .refund_donation(first.id, &"x".repeat(MAX_REFUND_REASON_CHARS + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, GivingError::Validation(_)));
        assert!(service.donation(first.id).await.unwrap().is_completed());

        let refunded = service
            .refund_donation(second.id, &"x".repeat(MAX_REFUND_REASON_CHARS))
            .await
            .unwrap();
        assert_eq!(refunded.payment_status(), PaymentStatus::Refunded);
        let campaign = store.campaign(CampaignId(1)).await.unwrap().unwrap();
        assert_eq!(campaign.current_amount(), Money::new(dec!(10)));
    }

    #[tokio::test]
    async fn test_blank_reason_reported_before_status() {
        let (service, _store) = service(SimulatedGateway::approving()).await;
        let donation = service
            .create_donation(CampaignId(1), DONOR, DonationRequest::new(dec!(10), "bank_transfer"))
            .await
            .unwrap();
        let err = service.refund_donation(donation.id, "").await.unwrap_err();
        assert!(matches!(err, GivingError::Validation(_)));
        let err = service.refund_donation(donation.id, "wrong amount").await.unwrap_err();
        assert!(matches!(err, GivingError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_donor() {
        let (service, _store) = service(SimulatedGateway::approving()).await;
        let err = service
            .create_donation(CampaignId(1), UserId(99), DonationRequest::new(dec!(10), "bank_transfer"))
            .await
            .unwrap_err();
        assert!(matches!(err, GivingError::NotFound(Entity::User(UserId(99)))));
    }
}
