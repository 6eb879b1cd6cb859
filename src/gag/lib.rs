mod cancel;
pub mod ids;
pub mod input;
mod leaderboard_row;
mod money;
pub mod pipeline;
mod result;
pub mod schema;
pub mod services;
pub mod store;
mod transaction;

pub use cancel::CancellationFlag;
pub use leaderboard_row::LeaderboardRow;
pub use money::{Money, MoneyError};
pub use pipeline::{Pipeline, PipelineSummary};
pub use result::Result;
pub use transaction::{Transaction, GOLD_CURRENCY_CODE};
