//! Auth-domain identifiers, connection state, and token models.

pub mod connection;
pub mod id;
pub mod token;

pub use connection::*;
pub use id::*;
pub use token::{record::*, secret::*};
