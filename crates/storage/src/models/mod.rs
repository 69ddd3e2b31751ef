mod challenge;
mod effort;
mod opponent;
mod segment;
mod user;

pub use challenge::{Challenge, ChallengeStatus, ChallengeWindow, Side};
pub use effort::EffortSummary;
pub use opponent::Opponent;
pub use segment::Segment;
pub use user::{Friend, User, UserSegment};
