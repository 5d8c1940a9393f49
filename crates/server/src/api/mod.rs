pub mod downloads;
pub mod error;
pub mod handlers;
pub mod indexer_configs;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod torrents;

pub use error::ApiError;
pub use routes::create_router;
