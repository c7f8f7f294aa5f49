pub use election_core::{Candidate, Election, Phase};
pub use registry::{ElectionRegistry, ElectionStore};
pub use spec::{CandidateSpec, ElectionSpec};
pub use view::ElectionView;

mod election_core;
mod registry;
mod spec;
mod view;
