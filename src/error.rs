use crate::domain::campaign::{CampaignId, CampaignStatus};
use crate::domain::donation::{DonationId, PaymentStatus};
use crate::domain::user::UserId;
use rust_decimal::Decimal;
use thiserror::Error;

/// The referenced record kind for [`GivingError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Campaign(CampaignId),
    Donation(DonationId),
    User(UserId),
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Campaign(id) => write!(f, "campaign {id}"),
            Entity::Donation(id) => write!(f, "donation {id}"),
            Entity::User(id) => write!(f, "user {id}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum GivingError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),
    #[error("Campaign {0} is not accepting donations")]
    CampaignNotAcceptingDonations(CampaignId),
    #[error("Invalid donation state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("Invalid campaign state transition: {from} -> {to}")]
    InvalidCampaignTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },
    #[error("Not found: {0}")]
    NotFound(Entity),
    #[error("Payment gateway failure: {0}")]
    PaymentGatewayFailure(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for GivingError {
    fn from(err: rocksdb::Error) -> Self {
        GivingError::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, GivingError>;
