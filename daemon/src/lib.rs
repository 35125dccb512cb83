pub mod aggregator;
pub mod allocator;
pub mod api;
pub mod collector;
pub mod config;
pub mod executor;
pub mod groups;
pub mod policy;
pub mod protocol;
pub mod thresholds;
pub mod uptime;
