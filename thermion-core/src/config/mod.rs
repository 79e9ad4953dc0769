//! Configuration types
//!
//! Board-agnostic thermal configuration and the persisted gains record.

pub mod stored;
pub mod types;

pub use stored::{StoreError, StoredChannelGains, StoredGains};
pub use types::*;
