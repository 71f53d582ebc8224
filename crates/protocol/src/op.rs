use bytes::{Buf, BufMut};

use crate::error::ProtocolError;
use crate::opcode::OpCode;

/// Fixed wire size of one [`OsdOp`] entry.
pub const WIRE_SIZE: usize = 2 + 8 + 8 + 4 + 4 + 8;

/// A single object operation, either the primary op of a request or one of
/// the auxiliary ops (`STARTSYNC`, `MASKTRUNC`, `SETTRUNC`) appended to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsdOp {
    /// Which operation this is.
    pub op: OpCode,
    /// Byte offset within the object.
    pub offset: u64,
    /// Byte length within the object.
    pub length: u64,
    /// Length of any payload carried alongside this op (writes only).
    pub payload_len: u32,
    /// Truncate-seq echoed for idempotent truncate handling.
    pub truncate_seq: u32,
    /// Truncate boundary, object-relative.
    pub truncate_size: u64,
}

impl OsdOp {
    /// Builds a primary read or write op with no truncate annotation.
    #[must_use]
    pub const fn primary(op: OpCode, offset: u64, length: u64, payload_len: u32) -> Self {
        Self {
            op,
            offset,
            length,
            payload_len,
            truncate_seq: 0,
            truncate_size: 0,
        }
    }

    /// Encodes this op into `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16_le(self.op.wire());
        buf.put_u64_le(self.offset);
        buf.put_u64_le(self.length);
        buf.put_u32_le(self.payload_len);
        buf.put_u32_le(self.truncate_seq);
        buf.put_u64_le(self.truncate_size);
    }

    /// Decodes one op from `buf`, advancing it past the consumed bytes.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < WIRE_SIZE {
            return Err(ProtocolError::Truncated {
                needed: WIRE_SIZE,
                available: buf.remaining(),
            });
        }

        let op = OpCode::from_wire(buf.get_u16_le())?;
        let offset = buf.get_u64_le();
        let length = buf.get_u64_le();
        let payload_len = buf.get_u32_le();
        let truncate_seq = buf.get_u32_le();
        let truncate_size = buf.get_u64_le();

        Ok(Self {
            op,
            offset,
            length,
            payload_len,
            truncate_seq,
            truncate_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn round_trips_through_encode_decode() {
        let op = OsdOp {
            op: OpCode::SetTrunc,
            offset: 7,
            length: 0,
            payload_len: 0,
            truncate_seq: 11,
            truncate_size: 1 << 20,
        };

        let mut buf = BytesMut::new();
        op.encode(&mut buf);
        assert_eq!(buf.len(), WIRE_SIZE);

        let mut frozen = buf.freeze();
        let decoded = OsdOp::decode(&mut frozen).unwrap();
        assert_eq!(decoded, op);
        assert_eq!(frozen.remaining(), 0);
    }

    #[test]
    fn decode_reports_truncation() {
        let mut buf = bytes::Bytes::from_static(&[0u8; WIRE_SIZE - 1]);
        assert!(matches!(
            OsdOp::decode(&mut buf),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        let mut buf = BytesMut::new();
        buf.put_u16_le(0xbeef);
        buf.put_bytes(0, WIRE_SIZE - 2);
        let mut frozen = buf.freeze();
        assert!(matches!(
            OsdOp::decode(&mut frozen),
            Err(ProtocolError::UnknownOpCode(0xbeef))
        ));
    }
}
