use crate::domain::donation::Donation;
use crate::domain::ports::PaymentGateway;
use crate::error::{GivingError, Result};
use async_trait::async_trait;
use tracing::debug;

/// Stand-in for a card or wallet provider. No network calls are made.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    decline: Option<String>,
}

impl SimulatedGateway {
    /// Approves every charge.
    pub fn approving() -> Self {
        Self::default()
    }

    /// Declines every charge with `reason`.
    pub fn declining(reason: impl Into<String>) -> Self {
        Self {
            decline: Some(reason.into()),
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, donation: &Donation) -> Result<()> {
        match &self.decline {
            Some(reason) => Err(GivingError::PaymentGatewayFailure(reason.clone())),
            None => {
                debug!(
                    donation_id = %donation.id,
                    amount = %donation.amount,
                    method = %donation.payment_method,
                    "simulated charge approved"
                );
                Ok(())
            }
        }
    }
}
