//! `rdomock` - record-replay mock of the RDO game server
//!
//! Replays captured client-server traffic so a game client can be developed
//! and tested without a live backend. The core is the RDO matching engine
//! ([`matching::RdoMock`]), which picks a recorded exchange for every
//! inbound command through four tiers of decreasing specificity.

pub mod cli;
pub mod config;
pub mod error;
pub mod matching;
pub mod observability;
pub mod protocol;
pub mod scenarios;
pub mod server;
pub mod session;
pub mod store;
pub mod transport;
