use super::csv::command_reader::Command;
use crate::application::campaigns::CampaignService;
use crate::application::donations::DonationService;
use crate::domain::campaign::{CampaignDetails, CauseCategory};
use crate::domain::ports::ClockRef;
use crate::domain::user::User;
use crate::error::Result;
use crate::infrastructure::in_memory::InMemoryDirectory;
use chrono::Duration;
use tracing::debug;

/// The command file carries no description, so one is built from the title.
fn describe(title: &str, category: CauseCategory) -> String {
    format!(
        "{}: a {} campaign imported from the giving command file.",
        title.trim(),
        category.label()
    )
}

/// Applies parsed commands to the services, one at a time and in file order.
pub struct Replayer {
    donations: DonationService,
    campaigns: CampaignService,
    directory: InMemoryDirectory,
    clock: ClockRef,
    campaign_days: u32,
}

impl Replayer {
    pub fn new(
        donations: DonationService,
        campaigns: CampaignService,
        directory: InMemoryDirectory,
        clock: ClockRef,
        campaign_days: u32,
    ) -> Self {
        Self {
            donations,
            campaigns,
            directory,
            clock,
            campaign_days,
        }
    }

    pub fn campaigns(&self) -> &CampaignService {
        &self.campaigns
    }

    pub async fn apply(&self, command: Command) -> Result<()> {
        debug!(?command, "applying command");
        match command {
            Command::RegisterUser { user, email } => {
                let name = email.split('@').next().unwrap_or_default().to_string();
                self.directory.register(User::new(user, name, email)).await;
            }
            Command::CreateCampaign {
                creator,
                goal,
                category,
                title,
            } => {
                let cause_category = match category {
                    Some(c) => c.parse()?,
                    None => CauseCategory::Other,
                };
                let start_date = self.clock.now();
                let details = CampaignDetails {
                    description: describe(&title, cause_category),
                    title,
                    cause_category,
                    goal_amount: goal,
                    start_date,
                    end_date: start_date + Duration::days(i64::from(self.campaign_days)),
                };
                self.campaigns.create_campaign(creator, details).await?;
            }
            Command::ApproveCampaign { campaign, approver } => {
                self.campaigns.approve_campaign(campaign, approver).await?;
            }
            Command::Donate {
                campaign,
                donor,
                request,
            } => {
                self.donations
                    .create_donation(campaign, donor, request)
                    .await?;
            }
            Command::ApproveDonation { donation } => {
                self.donations.approve_donation(donation).await?;
            }
            Command::RefundDonation { donation, reason } => {
                self.donations.refund_donation(donation, &reason).await?;
            }
        }
        Ok(())
    }
}
