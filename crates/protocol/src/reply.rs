use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::op::OsdOp;
use crate::types::ReassertVersion;

/// Fixed-size portion of an inbound `OSD_OPREPLY` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    /// Transaction id this reply answers.
    pub tid: u64,
    /// Flags echoed from the request (`ACK` vs `ONDISK` distinguishes a
    /// provisional write acknowledgement from the final commit).
    pub flags: u32,
    /// Daemon-side result code (`0` on success, negative `errno` on failure).
    pub result: i32,
    /// Length of the oid that follows the ops.
    pub object_len: u32,
    /// Number of [`OsdOp`] entries that follow the header.
    pub num_ops: u32,
    /// Opaque token the client must echo back on a retry of the same write.
    pub reassert_version: ReassertVersion,
}

impl ReplyHeader {
    /// Fixed wire size of [`ReplyHeader`], excluding the ops/oid that follow.
    pub const WIRE_SIZE: usize = 8 + 4 + 4 + 4 + 4 + ReassertVersion::WIRE_SIZE;

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.tid);
        buf.put_u32_le(self.flags);
        buf.put_i32_le(self.result);
        buf.put_u32_le(self.object_len);
        buf.put_u32_le(self.num_ops);
        self.reassert_version.encode(buf);
    }

    fn decode(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < Self::WIRE_SIZE {
            return Err(ProtocolError::Truncated {
                needed: Self::WIRE_SIZE,
                available: buf.remaining(),
            });
        }

        let tid = buf.get_u64_le();
        let flags = buf.get_u32_le();
        let result = buf.get_i32_le();
        let object_len = buf.get_u32_le();
        let num_ops = buf.get_u32_le();
        let reassert_version = ReassertVersion::decode(buf)?;

        Ok(Self {
            tid,
            flags,
            result,
            object_len,
            num_ops,
            reassert_version,
        })
    }
}

/// A fully assembled inbound `OSD_OPREPLY` message: header, echoed ops and
/// object name, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdReplyMessage {
    /// The fixed header.
    pub header: ReplyHeader,
    /// The ops as echoed back by the daemon.
    pub ops: Vec<OsdOp>,
    /// Object name the reply concerns.
    pub oid: String,
}

impl OsdReplyMessage {
    /// Encodes the full message, sizing the output buffer exactly.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let size =
            ReplyHeader::WIRE_SIZE + self.ops.len() * crate::op::WIRE_SIZE + self.oid.len();

        let mut buf = BytesMut::with_capacity(size);
        self.header.encode(&mut buf);
        for op in &self.ops {
            op.encode(&mut buf);
        }
        buf.put_slice(self.oid.as_bytes());

        assert_eq!(
            buf.len(),
            size,
            "OsdReplyMessage::encode produced an unexpected size"
        );

        buf.freeze()
    }

    /// Decodes a message previously produced by [`Self::encode`].
    ///
    /// Before touching the op/oid payload, validates the declared front
    /// length against `header + object_len + num_ops * op_size`, per the
    /// reply-handler's first validation step.
    pub fn decode(bytes: Bytes) -> Result<Self, ProtocolError> {
        let declared = bytes.remaining();
        let mut cursor = bytes;
        let header = ReplyHeader::decode(&mut cursor)?;

        let expected = ReplyHeader::WIRE_SIZE
            + header.object_len as usize
            + header.num_ops as usize * crate::op::WIRE_SIZE;

        if declared != expected {
            return Err(ProtocolError::FrontLengthMismatch {
                declared,
                expected,
                header: ReplyHeader::WIRE_SIZE,
                object_len: header.object_len,
                num_ops: header.num_ops,
            });
        }

        let mut ops = Vec::with_capacity(header.num_ops as usize);
        for _ in 0..header.num_ops {
            ops.push(OsdOp::decode(&mut cursor)?);
        }

        let object_len = header.object_len as usize;
        let oid_bytes = cursor.copy_to_bytes(object_len);
        let oid = String::from_utf8(oid_bytes.to_vec()).map_err(|_| ProtocolError::InvalidOid)?;

        Ok(Self { header, ops, oid })
    }
}
