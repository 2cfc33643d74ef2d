use super::campaign::CampaignId;
use super::money::{Money, bounded};
use super::user::UserId;
use crate::error::{GivingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_DONATION: Decimal = dec!(1);
pub const MAX_DONATION: Decimal = dec!(10000);
pub const MAX_MESSAGE_CHARS: usize = 500;
pub const MAX_REFUND_REASON_CHARS: usize = 500;
pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(pub u64);

impl fmt::Display for DonationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    PayrollDeduction,
    BankTransfer,
    CreditCard,
    DigitalWallet,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::PayrollDeduction,
        PaymentMethod::BankTransfer,
        PaymentMethod::CreditCard,
        PaymentMethod::DigitalWallet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::PayrollDeduction => "payroll_deduction",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DigitalWallet => "digital_wallet",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::PayrollDeduction => "Payroll Deduction",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DigitalWallet => "Digital Wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = GivingError;

    fn from_str(s: &str) -> Result<Self> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| GivingError::InvalidPaymentMethod(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// The payment state machine. Anything not listed here is illegal.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Completed, Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw donation input as it arrives from a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub amount: Decimal,
    pub payment_method: String,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub donor_message: Option<String>,
}

/// A [`DonationRequest`] that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDonation {
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub is_anonymous: bool,
    pub donor_message: Option<String>,
}

impl DonationRequest {
    pub fn new(amount: Decimal, payment_method: impl Into<String>) -> Self {
        Self {
            amount,
            payment_method: payment_method.into(),
            is_anonymous: false,
            donor_message: None,
        }
    }

    pub fn validate(&self) -> Result<ValidDonation> {
        let amount = bounded(self.amount, MIN_DONATION, MAX_DONATION)?;
        let payment_method = self.payment_method.parse()?;
        let donor_message = match self.donor_message.as_deref() {
            None | Some("") => None,
            Some(msg) if msg.chars().count() > MAX_MESSAGE_CHARS => {
                return Err(GivingError::Validation(format!(
                    "donor message cannot exceed {MAX_MESSAGE_CHARS} characters"
                )));
            }
            Some(msg) => Some(msg.to_string()),
        };
        Ok(ValidDonation {
            amount,
            payment_method,
            is_anonymous: self.is_anonymous,
            donor_message,
        })
    }
}

/// A pledged or paid contribution to one campaign by one donor.
///
/// Payment fields change only through the transition methods below, each of
/// which enforces [`PaymentStatus::can_transition_to`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub amount: Money,
    pub currency: String,
    pub payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    payment_reference: Option<String>,
    pub is_anonymous: bool,
    pub donor_message: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    refund_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Donation {
    pub fn pending(
        id: DonationId,
        campaign_id: CampaignId,
        user_id: UserId,
        donation: ValidDonation,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            campaign_id,
            user_id,
            amount: donation.amount,
            currency: DEFAULT_CURRENCY.to_string(),
            payment_method: donation.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            is_anonymous: donation.is_anonymous,
            donor_message: donation.donor_message,
            processed_at: None,
            refunded_at: None,
            refund_reason: None,
            created_at: now,
        }
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    pub fn refund_reason(&self) -> Option<&str> {
        self.refund_reason.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }

    pub fn is_refunded(&self) -> bool {
        self.payment_status == PaymentStatus::Refunded
    }

    /// e.g. `25.00 USD`
    pub fn formatted_amount(&self) -> String {
        format!("{} {}", self.amount, self.currency.to_uppercase())
    }

    pub fn ensure_status(&self, expected: PaymentStatus, next: PaymentStatus) -> Result<()> {
        if self.payment_status != expected || !expected.can_transition_to(next) {
            return Err(GivingError::InvalidStateTransition {
                from: self.payment_status,
                to: next,
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: PaymentStatus) -> Result<()> {
        if !self.payment_status.can_transition_to(next) {
            return Err(GivingError::InvalidStateTransition {
                from: self.payment_status,
                to: next,
            });
        }
        self.payment_status = next;
        Ok(())
    }

    /// Moves the donation off `pending`, assigning its payment reference.
    fn leave_pending(&mut self, next: PaymentStatus, reference: String) -> Result<()> {
        self.ensure_status(PaymentStatus::Pending, next)?;
        self.transition(next)?;
        self.payment_reference = Some(reference);
        Ok(())
    }

    pub fn mark_processing(&mut self, reference: String) -> Result<()> {
        self.leave_pending(PaymentStatus::Processing, reference)
    }

    pub fn mark_completed(&mut self, reference: String, now: DateTime<Utc>) -> Result<()> {
        self.leave_pending(PaymentStatus::Completed, reference)?;
        self.processed_at = Some(now);
        Ok(())
    }

    pub fn mark_failed(&mut self, reference: String) -> Result<()> {
        self.leave_pending(PaymentStatus::Failed, reference)
    }

    /// Manual confirmation of a `processing` donation.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_status(PaymentStatus::Processing, PaymentStatus::Completed)?;
        self.transition(PaymentStatus::Completed)?;
        self.processed_at = Some(now);
        Ok(())
    }

    pub fn refund(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.ensure_status(PaymentStatus::Completed, PaymentStatus::Refunded)?;
        self.transition(PaymentStatus::Refunded)?;
        self.refunded_at = Some(now);
        self.refund_reason = Some(reason.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 29, 12, 0, 0).unwrap()
    }

    fn donation(method: &str) -> Donation {
        let valid = DonationRequest::new(dec!(25.00), method).validate().unwrap();
        Donation::pending(DonationId(7), CampaignId(1), UserId(3), valid, now())
    }

    #[test]
    fn test_request_validation_bounds() {
        assert!(DonationRequest::new(dec!(1), "credit_card").validate().is_ok());
        assert!(
            DonationRequest::new(dec!(10000), "credit_card")
                .validate()
                .is_ok()
        );
        assert!(matches!(
            DonationRequest::new(dec!(0.99), "credit_card").validate(),
            Err(GivingError::InvalidAmount(_))
        ));
        assert!(matches!(
            DonationRequest::new(dec!(10000.50), "credit_card").validate(),
            Err(GivingError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_request_rejects_unknown_method() {
        let err = DonationRequest::new(dec!(10), "crypto")
            .validate()
            .unwrap_err();
        assert!(matches!(err, GivingError::InvalidPaymentMethod(m) if m == "crypto"));
    }

    #[test]
    fn test_request_message_rules() {
        let mut request = DonationRequest::new(dec!(10), "bank_transfer");
        request.donor_message = Some(String::new());
        assert_eq!(request.validate().unwrap().donor_message, None);

        request.donor_message = Some("é".repeat(500));
        assert!(request.validate().is_ok());

        request.donor_message = Some("x".repeat(501));
        assert!(matches!(
            request.validate(),
            Err(GivingError::Validation(_))
        ));
    }

    #[test]
    fn test_state_machine_table() {
        use PaymentStatus::*;
        let all = [Pending, Processing, Completed, Failed, Refunded];
        let legal = [
            (Pending, Processing),
            (Pending, Completed),
            (Pending, Failed),
            (Processing, Completed),
            (Completed, Refunded),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
        assert!(Failed.is_terminal());
        assert!(Refunded.is_terminal());
        assert!(!Completed.is_terminal());
    }

    #[test]
    fn test_reference_assigned_once() {
        let mut d = donation("credit_card");
        assert_eq!(d.payment_reference(), None);
        d.mark_completed("CC_1".to_string(), now()).unwrap();
        assert_eq!(d.payment_reference(), Some("CC_1"));
        assert_eq!(d.processed_at(), Some(now()));

        let err = d.mark_completed("CC_2".to_string(), now()).unwrap_err();
        assert!(matches!(err, GivingError::InvalidStateTransition { .. }));
        assert_eq!(d.payment_reference(), Some("CC_1"));
    }

    #[test]
    fn test_approve_only_from_processing() {
        let mut d = donation("bank_transfer");
        assert!(matches!(
            d.approve(now()),
            Err(GivingError::InvalidStateTransition {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Completed
            })
        ));
        d.mark_processing("BANK_1".to_string()).unwrap();
        d.approve(now()).unwrap();
        assert!(d.is_completed());
        assert!(d.approve(now()).is_err());
    }

    #[test]
    fn test_refund_only_from_completed() {
        let mut d = donation("digital_wallet");
        assert!(d.refund("duplicate", now()).is_err());
        d.mark_completed("DW_1".to_string(), now()).unwrap();
        d.refund("duplicate", now()).unwrap();
        assert!(d.is_refunded());
        assert_eq!(d.refund_reason(), Some("duplicate"));
        assert_eq!(d.refunded_at(), Some(now()));
        assert!(d.refund("again", now()).is_err());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut d = donation("credit_card");
        d.mark_failed("CC_1".to_string()).unwrap();
        assert!(d.approve(now()).is_err());
        assert!(d.refund("n/a", now()).is_err());
        assert_eq!(d.payment_status(), PaymentStatus::Failed);
    }

    #[test]
    fn test_method_labels() {
        assert_eq!(PaymentMethod::PayrollDeduction.label(), "Payroll Deduction");
        assert_eq!(
            "digital_wallet".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::DigitalWallet
        );
        assert_eq!(donation("credit_card").formatted_amount(), "25.00 USD");
    }
}
