//! Application layer containing the core business logic orchestration.
//!
//! [`donations::DonationService`] sequences donation creation, payment
//! processing and ledger updates inside one store transaction per operation;
//! [`campaigns::CampaignService`] owns the campaign lifecycle. Both hand the
//! committed result to the [`notifier::EventNotifier`].

pub mod campaigns;
pub mod donations;
pub mod notifier;
pub mod payment;
