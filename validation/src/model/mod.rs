//! Immutable data model shared by every stage of the engine.

pub mod claim;
pub mod evidence;

pub use claim::{Claim, ClaimRevision};
pub use evidence::{Evidence, EvidenceDomain, SourceMetadata, UpdateFrequency};
