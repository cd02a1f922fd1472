//! RDO command representation.
//!
//! The matcher never looks at raw wire bytes. Commands are tokenized into
//! an [`RdoPacket`] first and every matching decision is made on its fields.

pub mod packet;

pub use packet::{RdoPacket, strip_quotes};

/// Token that matches any value in a match key or args pattern.
pub const WILDCARD: &str = "*";

/// Verb used by object-id resolution commands (`idof <name>`).
pub const IDOF_VERB: &str = "idof";
