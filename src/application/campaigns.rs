use super::notifier::EventNotifier;
use crate::domain::campaign::{Campaign, CampaignDetails, CampaignId};
use crate::domain::ports::{ClockRef, IdentityRef, StoreRef};
use crate::domain::user::{User, UserId};
use crate::error::{Entity, GivingError, Result};
use tracing::info;

/// Campaign lifecycle outside the ledger: creation, edits, approval, featuring.
pub struct CampaignService {
    store: StoreRef,
    identity: IdentityRef,
    notifier: EventNotifier,
    clock: ClockRef,
}

impl CampaignService {
    pub fn new(
        store: StoreRef,
        identity: IdentityRef,
        notifier: EventNotifier,
        clock: ClockRef,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            clock,
        }
    }

    /// Creates a campaign in `pending`. The start date may not lie before today.
    pub async fn create_campaign(
        &self,
        creator_id: UserId,
        details: CampaignDetails,
    ) -> Result<Campaign> {
        let creator = self.user(creator_id).await?;
        let now = self.clock.now();
        if details.start_date.date_naive() < now.date_naive() {
            return Err(GivingError::Validation(
                "start date cannot be in the past".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let id = tx.next_campaign_id().await?;
        let campaign = Campaign::new(id, details, creator.id, now)?;
        tx.put_campaign(campaign.clone());
        tx.commit().await?;

        info!(
            campaign_id = %campaign.id,
            created_by = %creator.id,
            goal_amount = %campaign.goal_amount,
            "campaign created"
        );
        Ok(campaign)
    }

    /// Edits a campaign. An active campaign goes back to `pending` for re-approval.
    pub async fn update_campaign(
        &self,
        campaign_id: CampaignId,
        details: CampaignDetails,
    ) -> Result<Campaign> {
        let mut tx = self.store.begin().await?;
        let mut campaign = tx.lock_campaign(campaign_id).await?;
        let was = campaign.status();
        campaign.revise(details)?;
        tx.put_campaign(campaign.clone());
        tx.commit().await?;

        info!(
            campaign_id = %campaign.id,
            from = %was,
            to = %campaign.status(),
            "campaign updated"
        );
        Ok(campaign)
    }

    pub async fn approve_campaign(
        &self,
        campaign_id: CampaignId,
        approver_id: UserId,
    ) -> Result<Campaign> {
        let approver = self.user(approver_id).await?;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let mut campaign = tx.lock_campaign(campaign_id).await?;
        campaign.approve(approver.id, now)?;
        tx.put_campaign(campaign.clone());
        tx.commit().await?;

        self.notifier.campaign_approved(&campaign, &approver).await;
        Ok(campaign)
    }

    pub async fn toggle_featured(&self, campaign_id: CampaignId) -> Result<Campaign> {
        let mut tx = self.store.begin().await?;
        let mut campaign = tx.lock_campaign(campaign_id).await?;
        campaign.toggle_featured();
        tx.put_campaign(campaign.clone());
        tx.commit().await?;
        Ok(campaign)
    }

    pub async fn campaign(&self, campaign_id: CampaignId) -> Result<Campaign> {
        self.store
            .campaign(campaign_id)
            .await?
            .ok_or(GivingError::NotFound(Entity::Campaign(campaign_id)))
    }

    pub async fn campaigns(&self) -> Result<Vec<Campaign>> {
        self.store.campaigns().await
    }

    async fn user(&self, id: UserId) -> Result<User> {
        self.identity
            .user(id)
            .await?
            .ok_or(GivingError::NotFound(Entity::User(id)))
    }
}
