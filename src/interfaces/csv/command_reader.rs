use crate::domain::campaign::CampaignId;
use crate::domain::donation::{DonationId, DonationRequest};
use crate::domain::user::UserId;
use crate::error::{GivingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    User,
    Campaign,
    ApproveCampaign,
    Donate,
    Approve,
    Refund,
}

/// One CSV row: `type, campaign, user, donation, amount, kind, text[, anonymous]`.
///
/// `kind` is the payment method for `donate` and the cause category for
/// `campaign`; `text` is the email, title, donor message or refund reason.
/// The trailing `anonymous` column only applies to `donate` and may be omitted.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub campaign: Option<u64>,
    pub user: Option<u64>,
    pub donation: Option<u64>,
    pub amount: Option<Decimal>,
    pub kind: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub anonymous: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RegisterUser {
        user: UserId,
        email: String,
    },
    CreateCampaign {
        creator: UserId,
        goal: Decimal,
        category: Option<String>,
        title: String,
    },
    ApproveCampaign {
        campaign: CampaignId,
        approver: UserId,
    },
    Donate {
        campaign: CampaignId,
        donor: UserId,
        request: DonationRequest,
    },
    ApproveDonation {
        donation: DonationId,
    },
    RefundDonation {
        donation: DonationId,
        reason: String,
    },
}

fn required<T>(value: Option<T>, field: &str, kind: CommandType) -> Result<T> {
    value.ok_or_else(|| GivingError::Validation(format!("{kind:?} row is missing '{field}'")))
}

impl TryFrom<CommandRecord> for Command {
    type Error = GivingError;

    fn try_from(row: CommandRecord) -> Result<Self> {
        let kind = row.r#type;
        Ok(match kind {
            CommandType::User => Command::RegisterUser {
                user: UserId(required(row.user, "user", kind)?),
                email: required(row.text, "text", kind)?,
            },
            CommandType::Campaign => Command::CreateCampaign {
                creator: UserId(required(row.user, "user", kind)?),
                goal: required(row.amount, "amount", kind)?,
                category: row.kind,
                title: required(row.text, "text", kind)?,
            },
            CommandType::ApproveCampaign => Command::ApproveCampaign {
                campaign: CampaignId(required(row.campaign, "campaign", kind)?),
                approver: UserId(required(row.user, "user", kind)?),
            },
            CommandType::Donate => Command::Donate {
                campaign: CampaignId(required(row.campaign, "campaign", kind)?),
                donor: UserId(required(row.user, "user", kind)?),
                request: DonationRequest {
                    amount: required(row.amount, "amount", kind)?,
                    payment_method: required(row.kind, "kind", kind)?,
                    is_anonymous: row.anonymous.unwrap_or(false),
                    donor_message: row.text,
                },
            },
            CommandType::Approve => Command::ApproveDonation {
                donation: DonationId(required(row.donation, "donation", kind)?),
            },
            CommandType::Refund => Command::RefundDonation {
                donation: DonationId(required(row.donation, "donation", kind)?),
                reason: required(row.text, "text", kind)?,
            },
        })
    }
}

/// Reads commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Command>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads, deserializes and checks each row.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader.into_deserialize().map(|result| {
            let record: CommandRecord = result.map_err(GivingError::from)?;
            Command::try_from(record)
        })
    }
}
