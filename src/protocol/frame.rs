//! Raw frame view used for reserved-bit admission checks.
//!
//! Parsing and writing frames belongs to the transport; this crate only
//! needs the header bits a transport hands over before accepting a frame.

use bytes::Bytes;

use crate::extensions::RsvBits;
use crate::protocol::OpCode;

/// A WebSocket frame as delivered by the transport.
///
/// ```text
///  0 1 2 3 4 5 6 7
/// +-+-+-+-+-------+
/// |F|R|R|R| opcode|
/// |I|S|S|S|  (4)  |
/// |N|V|V|V|       |
/// | |1|2|3|       |
/// +-+-+-+-+-------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag.
    pub fin: bool,
    /// Reserved bit 1.
    pub rsv1: bool,
    /// Reserved bit 2.
    pub rsv2: bool,
    /// Reserved bit 3.
    pub rsv3: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    payload: Bytes,
}

impl Frame {
    /// Create a frame with all reserved bits clear.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            payload: payload.into(),
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Text, data)
    }

    /// Create a final binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Binary, data)
    }

    /// Create a continuation frame.
    #[must_use]
    pub fn continuation(fin: bool, data: impl Into<Bytes>) -> Self {
        Self::new(fin, OpCode::Continuation, data)
    }

    /// Set the reserved bits.
    #[must_use]
    pub fn with_rsv(mut self, bits: RsvBits) -> Self {
        self.rsv1 = bits.rsv1;
        self.rsv2 = bits.rsv2;
        self.rsv3 = bits.rsv3;
        self
    }

    /// Reserved bits set on this frame.
    #[inline]
    #[must_use]
    pub const fn rsv_bits(&self) -> RsvBits {
        RsvBits {
            rsv1: self.rsv1,
            rsv2: self.rsv2,
            rsv3: self.rsv3,
        }
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns `true` for the first frame of a message.
    #[inline]
    #[must_use]
    pub fn is_first_fragment(&self) -> bool {
        self.opcode != OpCode::Continuation
    }
}
