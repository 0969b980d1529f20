//! Messages as seen by per-message extensions.
//!
//! A message carries the reserved bits of its first frame alongside the
//! reassembled payload; extensions read and rewrite both.

use bytes::Bytes;

use crate::extensions::RsvBits;
use crate::protocol::OpCode;

/// A complete WebSocket message travelling through the extension pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Reserved bit 1 of the message's first frame.
    pub rsv1: bool,
    /// Reserved bit 2 of the message's first frame.
    pub rsv2: bool,
    /// Reserved bit 3 of the message's first frame.
    pub rsv3: bool,
    /// Message opcode (Text or Binary for data messages).
    pub opcode: OpCode,
    /// Message payload.
    pub data: Bytes,
}

impl Message {
    /// Create a message with all reserved bits clear.
    #[must_use]
    pub fn new(opcode: OpCode, data: impl Into<Bytes>) -> Self {
        Self {
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            data: data.into(),
        }
    }

    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::new(OpCode::Text, s.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(OpCode::Binary, data)
    }

    /// Set the reserved bits.
    #[must_use]
    pub fn with_rsv(mut self, bits: RsvBits) -> Self {
        self.rsv1 = bits.rsv1;
        self.rsv2 = bits.rsv2;
        self.rsv3 = bits.rsv3;
        self
    }

    /// Replace the payload, keeping opcode and reserved bits.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Reserved bits currently set on the message.
    #[must_use]
    pub const fn rsv_bits(&self) -> RsvBits {
        RsvBits {
            rsv1: self.rsv1,
            rsv2: self.rsv2,
            rsv3: self.rsv3,
        }
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.opcode == OpCode::Text
    }

    /// Returns `true` if this is a binary message.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.opcode == OpCode::Binary
    }

    /// Borrow the payload as UTF-8, if it is valid.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_data(self) -> Bytes {
        self.data
    }
}
