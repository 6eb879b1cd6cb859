/// Convenience type to make error mapping cleaner across the aggregation engine
pub type Result<T = ()> = anyhow::Result<T>;
