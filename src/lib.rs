pub mod activity;
pub mod clubs;
pub mod config;
pub mod engdb;
pub mod error;
pub mod events;
pub mod ghapi;
pub mod leaderboard;
pub mod models;
pub mod streak;
pub mod tasks;

pub use activity::record_activity;
pub use clubs::recompute_club_membership;
pub use error::{EngagementError, EngagementResult};
pub use leaderboard::recompute_leaderboard;
pub use streak::submit_check_in;
