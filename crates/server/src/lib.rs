//! HTTP surface for the acquisition service.

pub mod api;
pub mod metrics;
pub mod state;
