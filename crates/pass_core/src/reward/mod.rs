pub mod track;
pub mod types;

pub use track::RewardTrack;
pub use types::{ChestItem, PassTier, RewardEntry, RewardKind, RewardState};
