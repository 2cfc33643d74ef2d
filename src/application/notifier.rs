use crate::domain::campaign::{Campaign, LedgerOutcome};
use crate::domain::donation::Donation;
use crate::domain::ports::{DispatcherRef, IdentityRef, Template};
use crate::domain::user::User;
use serde_json::json;
use tracing::{info, warn};

/// Post-commit side effects. Best effort: failures are logged and dropped,
/// never returned to the caller.
#[derive(Clone)]
pub struct EventNotifier {
    dispatcher: DispatcherRef,
    identity: IdentityRef,
}

impl EventNotifier {
    pub fn new(dispatcher: DispatcherRef, identity: IdentityRef) -> Self {
        Self {
            dispatcher,
            identity,
        }
    }

    pub async fn donation_created(&self, donor: &User, donation: &Donation) {
        info!(
            donation_id = %donation.id,
            campaign_id = %donation.campaign_id,
            user_id = %donation.user_id,
            amount = %donation.amount,
            payment_method = %donation.payment_method,
            payment_status = %donation.payment_status(),
            payment_reference = donation.payment_reference().unwrap_or_default(),
            "donation created"
        );
        let payload = json!({
            "donation_id": donation.id,
            "campaign_id": donation.campaign_id,
            "amount": donation.formatted_amount(),
            "payment_method": donation.payment_method.label(),
            "payment_status": donation.payment_status(),
            "payment_reference": donation.payment_reference(),
            "is_anonymous": donation.is_anonymous,
        });
        self.dispatch(Template::DonationReceipt, &donor.email, payload)
            .await;
    }

    /// Called once a donation reaches `completed`; reports goal completion
    /// when that increment closed the campaign.
    pub async fn donation_completed(
        &self,
        donation: &Donation,
        campaign: &Campaign,
        outcome: LedgerOutcome,
    ) {
        if outcome != LedgerOutcome::GoalReached {
            return;
        }
        info!(
            campaign_id = %campaign.id,
            campaign_title = %campaign.title,
            goal_amount = %campaign.goal_amount,
            current_amount = %campaign.current_amount(),
            donation_id = %donation.id,
            "campaign completed - goal reached"
        );
        let Some(creator) = self.lookup(campaign).await else {
            return;
        };
        let payload = json!({
            "campaign_id": campaign.id,
            "campaign_title": campaign.title,
            "goal_amount": campaign.goal_amount.to_string(),
            "current_amount": campaign.current_amount().to_string(),
        });
        self.dispatch(Template::CampaignCompleted, &creator.email, payload)
            .await;
    }

    pub async fn campaign_approved(&self, campaign: &Campaign, approver: &User) {
        info!(
            campaign_id = %campaign.id,
            campaign_title = %campaign.title,
            approved_by = %approver.name,
            "campaign approved"
        );
        let Some(creator) = self.lookup(campaign).await else {
            return;
        };
        let payload = json!({
            "campaign_id": campaign.id,
            "campaign_title": campaign.title,
            "approved_by": approver.name,
            "approved_at": campaign.approved_at(),
        });
        self.dispatch(Template::CampaignApproved, &creator.email, payload)
            .await;
    }

    async fn lookup(&self, campaign: &Campaign) -> Option<User> {
        match self.identity.user(campaign.created_by).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                warn!(campaign_id = %campaign.id, user_id = %campaign.created_by, "campaign creator not found");
                None
            }
            Err(err) => {
                warn!(campaign_id = %campaign.id, error = %err, "creator lookup failed");
                None
            }
        }
    }

    async fn dispatch(&self, template: Template, recipient: &str, payload: serde_json::Value) {
        if let Err(err) = self.dispatcher.send(template, recipient, payload).await {
            warn!(%template, recipient, error = %err, "notification dropped");
        }
    }
}
