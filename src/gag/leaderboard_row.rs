use crate::services::PeriodLeaderboard;

use serde::{Deserialize, Serialize};

/// One ranked spender as written to the CSV report
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LeaderboardRow {
    pub period: String,
    pub rank: usize,
    pub account: String,
    pub amount_minor: i64,
    pub amount: String,
}

impl LeaderboardRow {
    pub const HEADERS: [&'static str; 5] = ["period", "rank", "account", "amount_minor", "amount"];

    pub fn from_leaderboard(leaderboard: &PeriodLeaderboard) -> Vec<Self> {
        leaderboard
            .spenders
            .iter()
            .enumerate()
            .map(|(idx, spender)| LeaderboardRow {
                period: leaderboard.period.to_string(),
                rank: idx + 1,
                account: spender.account.to_string(),
                amount_minor: spender.amount.minor_units(),
                amount: spender.amount.to_string(),
            })
            .collect()
    }
}
