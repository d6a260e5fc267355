//! Campaign record store and publisher balance client.
//!
//! Two independent collaborators for request handlers:
//! - [`campaigns::CampaignStore`]: CRUD over a SQLite `campaign` table
//! - [`balance::BalanceClient`]: token balance checks against the publisher
//!   backend, surfacing offers when the balance falls short

pub mod balance;
pub mod campaigns;
pub mod config;
pub mod logging;

pub use balance::{BalanceCheck, BalanceClient, BalanceConfig, BalanceError, Offer};
pub use campaigns::{
    Campaign, CampaignForm, CampaignStatus, CampaignStore, CampaignUpdateForm, StoreConfig,
    StoreError,
};
pub use config::Config;
