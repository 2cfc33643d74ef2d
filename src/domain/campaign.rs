use super::money::{Money, bounded};
use super::user::UserId;
use crate::error::{GivingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_GOAL: Decimal = dec!(1);
pub const MAX_GOAL: Decimal = dec!(1000000);
pub const MAX_TITLE_CHARS: usize = 255;
pub const MIN_DESCRIPTION_CHARS: usize = 50;
pub const MAX_DESCRIPTION_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub u64);

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Pending => "pending",
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CauseCategory {
    Education,
    Health,
    Environment,
    Community,
    Emergency,
    Other,
}

impl CauseCategory {
    pub const ALL: [CauseCategory; 6] = [
        CauseCategory::Education,
        CauseCategory::Health,
        CauseCategory::Environment,
        CauseCategory::Community,
        CauseCategory::Emergency,
        CauseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CauseCategory::Education => "education",
            CauseCategory::Health => "health",
            CauseCategory::Environment => "environment",
            CauseCategory::Community => "community",
            CauseCategory::Emergency => "emergency",
            CauseCategory::Other => "other",
        }
    }

    /// Human readable label shown to employees.
    pub fn label(&self) -> &'static str {
        match self {
            CauseCategory::Education => "Education",
            CauseCategory::Health => "Health & Wellness",
            CauseCategory::Environment => "Environment",
            CauseCategory::Community => "Community Development",
            CauseCategory::Emergency => "Emergency Relief",
            CauseCategory::Other => "Other",
        }
    }
}

impl FromStr for CauseCategory {
    type Err = GivingError;

    fn from_str(s: &str) -> Result<Self> {
        CauseCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| GivingError::Validation(format!("unknown cause category '{s}'")))
    }
}

/// The editable part of a campaign, as submitted by its creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDetails {
    pub title: String,
    pub description: String,
    pub cause_category: CauseCategory,
    pub goal_amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl CampaignDetails {
    /// Field rules shared by creation and edits. Returns the goal rounded to cents.
    pub fn validate(&self) -> Result<Money> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(GivingError::Validation(format!(
                "title must be 1 to {MAX_TITLE_CHARS} characters"
            )));
        }
        let description = self.description.trim().chars().count();
        if !(MIN_DESCRIPTION_CHARS..=MAX_DESCRIPTION_CHARS).contains(&description) {
            return Err(GivingError::Validation(format!(
                "description must be {MIN_DESCRIPTION_CHARS} to {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        if self.end_date <= self.start_date {
            return Err(GivingError::Validation(
                "end date must be after the start date".to_string(),
            ));
        }
        bounded(self.goal_amount, MIN_GOAL, MAX_GOAL)
    }
}

/// What a ledger increment did to the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Updated,
    /// The increment met the goal of an active campaign and completed it.
    GoalReached,
}

/// A fundraising campaign and its running ledger.
///
/// `current_amount` is only reachable through [`Campaign::increment`] and
/// [`Campaign::decrement`]; lifecycle fields only through the transition methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub description: String,
    pub cause_category: CauseCategory,
    pub goal_amount: Money,
    current_amount: Money,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    status: CampaignStatus,
    pub created_by: UserId,
    approved_by: Option<UserId>,
    approved_at: Option<DateTime<Utc>>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Builds a new campaign in `pending` with an empty ledger.
    pub fn new(
        id: CampaignId,
        details: CampaignDetails,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let goal_amount = details.validate()?;
        Ok(Self {
            id,
            title: details.title.trim().to_string(),
            description: details.description.trim().to_string(),
            cause_category: details.cause_category,
            goal_amount,
            current_amount: Money::ZERO,
            start_date: details.start_date,
            end_date: details.end_date,
            status: CampaignStatus::Pending,
            created_by,
            approved_by: None,
            approved_at: None,
            is_featured: false,
            created_at: now,
        })
    }

    pub fn current_amount(&self) -> Money {
        self.current_amount
    }

    pub fn status(&self) -> CampaignStatus {
        self.status
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn is_accepting_donations(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active
            && self.end_date > now
            && self.current_amount < self.goal_amount
    }

    /// Percentage of the goal raised, capped at 100.
    pub fn progress_percentage(&self) -> Decimal {
        if self.goal_amount.value() <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let pct = self.current_amount.value() / self.goal_amount.value() * dec!(100);
        pct.min(dec!(100)).round_dp(2)
    }

    /// Credits the ledger. Completes an active campaign whose goal is met.
    ///
    /// Overshooting the goal is allowed; only new donations are refused once
    /// the goal is met.
    pub fn increment(&mut self, amount: Money) -> Result<LedgerOutcome> {
        if !amount.is_positive() {
            return Err(GivingError::InvalidAmount(amount.value()));
        }
        self.current_amount += amount;
        if self.status == CampaignStatus::Active && self.current_amount >= self.goal_amount {
            self.status = CampaignStatus::Completed;
            return Ok(LedgerOutcome::GoalReached);
        }
        Ok(LedgerOutcome::Updated)
    }

    /// Debits the ledger. Not clamped at zero and never reopens a completed campaign.
    pub fn decrement(&mut self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(GivingError::InvalidAmount(amount.value()));
        }
        self.current_amount -= amount;
        Ok(())
    }

    pub fn approve(&mut self, approver: UserId, now: DateTime<Utc>) -> Result<()> {
        if self.status != CampaignStatus::Pending {
            return Err(GivingError::InvalidCampaignTransition {
                from: self.status,
                to: CampaignStatus::Active,
            });
        }
        self.status = CampaignStatus::Active;
        self.approved_by = Some(approver);
        self.approved_at = Some(now);
        Ok(())
    }

    /// Applies an edit. Editing an active campaign revokes its approval.
    pub fn revise(&mut self, details: CampaignDetails) -> Result<()> {
        let goal_amount = details.validate()?;
        self.title = details.title.trim().to_string();
        self.description = details.description.trim().to_string();
        self.cause_category = details.cause_category;
        self.goal_amount = goal_amount;
        self.start_date = details.start_date;
        self.end_date = details.end_date;
        if self.status == CampaignStatus::Active {
            self.status = CampaignStatus::Pending;
            self.approved_by = None;
            self.approved_at = None;
        }
        Ok(())
    }

    pub fn toggle_featured(&mut self) {
        self.is_featured = !self.is_featured;
    }
}
