//! Wire-level pieces used during negotiation (RFC 6455 Section 9.1).

pub mod frame;
pub mod header;
pub mod opcode;

pub use frame::Frame;
pub use header::{HeaderRecord, Offer, ParamValue, is_token, parse_header, serialize_params};
pub use opcode::OpCode;
