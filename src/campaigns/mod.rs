//! Campaign records.
//!
//! Provides:
//! - `Campaign` rows with owner, lifecycle status and free-form JSON blobs
//! - Create / list / get / partial-update / delete over a SQLite table
//! - Pooled connections, or a caller-supplied connection/transaction
//!
//! ## Design Decisions
//! - Status is a closed enum stored as lowercase text; unknown text in the
//!   table is reported as a storage error instead of being coerced.
//! - Lookups distinguish `NotFound` from storage faults. `find_campaign_by_id`
//!   is the presence-only variant for callers that treat both as absence.

pub mod model;
pub mod store;

pub use model::{Campaign, CampaignForm, CampaignStatus, CampaignUpdateForm, UnknownStatus};
pub use store::{CampaignStore, StoreConfig, StoreError, StoreResult};
