//! Candidate store and the trackers built on top of it: §4.2.
//!
//! A `Candidate` is the bounded, tiered working set the resolver re-evaluates.
//! On top of the store sit a hot-set view, a low-HF tracker, and a read-only
//! watch set union — all derived, not independently maintained, so there is a
//! single place invariants (no borrower in both hot and cold, capacity bounds)
//! can be checked.

mod low_hf;
mod store;
mod watch_set;

pub use low_hf::{LowHfEntry, LowHfMode, LowHfTracker};
pub use store::{Candidate, CandidateOrigin, CandidateStore, CandidateStoreConfig, Tier};
pub use watch_set::WatchSet;
