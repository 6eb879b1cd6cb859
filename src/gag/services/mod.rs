mod balance_aggregator;
mod leaderboard_reporter;

pub use balance_aggregator::{read_balance, AggregationError, AggregationSummary, BalanceAggregator};
pub use leaderboard_reporter::{
    LeaderboardReporter, PeriodLeaderboard, ReportError, ReportSummary, Spender, DEFAULT_TOP_N,
};
