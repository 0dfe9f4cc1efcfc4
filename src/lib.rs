pub mod config;
pub mod dates;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod flatten;
pub mod listing;
pub mod merge;
pub mod model;
pub mod output;
pub mod partition;
pub mod pipeline;
pub mod stats;
pub mod store;
