pub mod aggregate;
pub mod audit;
pub mod chart;
pub mod config;
pub mod ingest;
pub mod normalize;
pub mod paths;
pub mod row;
pub mod snapshot;
pub mod store;
pub mod summarize;
pub mod velocity;
