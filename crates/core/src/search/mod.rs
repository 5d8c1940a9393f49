//! Search aggregation across a user's configured backend.

mod aggregator;
mod sanitize;

pub use aggregator::{
    partition_by_year, sort_by_seeders, SearchAggregator, SearchOutcome, SearchRequest,
    ALL_INDEXERS,
};
pub use sanitize::sanitize_query;
