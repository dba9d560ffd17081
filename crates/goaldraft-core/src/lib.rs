// Library root for the goal-draft scheduler: snake-order turns, pick
// validation, the turn clock, autopick, and the stores that hold it all.

pub mod clock;
pub mod db;
pub mod directory;
pub mod draft;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod store;

pub use error::{DraftError, DraftResult};
pub use scheduler::DraftScheduler;
