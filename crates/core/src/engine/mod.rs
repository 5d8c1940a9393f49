//! Peer-to-peer engine abstraction.
//!
//! The lifecycle manager only talks to [`PeerEngine`] and [`SwarmHandle`];
//! [`LibrqbitEngine`] is the production implementation.

mod librqbit;
mod types;

pub use self::librqbit::LibrqbitEngine;
pub use types::*;
