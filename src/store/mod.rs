mod duel;
mod problems;
mod users;

pub use duel::{now_millis, CompleteOutcome, Difficulty, Duel, DuelStatus, DuelStore};
pub use problems::{Problem, ProblemBank};
pub use users::{is_valid_identity, UserDirectory};
