//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `SequenceState`: Tracks where a pagination sequence is in its page loop
//! - `DomainState`: Tracks per-domain request pacing
//! - `RecordStore`: Deduplicating store that pagination tasks fold records into

mod domain_state;
mod record_store;
mod sequence_state;

pub use domain_state::DomainState;
pub use record_store::{HarvestSnapshot, HarvestStore, RecordStore};
pub use sequence_state::SequenceState;
