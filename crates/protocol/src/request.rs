use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::flags::RequestFlags;
use crate::op::OsdOp;
use crate::types::{PgId, ReassertVersion, Timespec};

/// Fixed-size portion of an outbound `OSD_OP` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Client session incarnation, distinguishes reconnects of the same client.
    pub client_inc: u32,
    /// Transaction id, unique and strictly increasing within a client session.
    pub tid: u64,
    /// Placement-group routing for this request.
    pub layout: PgId,
    /// Snapshot id the op targets (`0` for head).
    pub snapid: u64,
    /// Newest snapshot sequence the client is aware of.
    pub snap_seq: u64,
    /// Number of trailing snapshot ids appended after the oid/ticket.
    pub num_snaps: u32,
    /// Length of the oid string that follows the ops.
    pub object_len: u32,
    /// Length of the ticket blob that follows the oid.
    pub ticket_len: u32,
    /// Epoch of the osd map the client had when it sent this request.
    pub osdmap_epoch: u32,
    /// [`RequestFlags`] bits.
    pub flags: RequestFlags,
    /// Client-supplied mtime, used for write ordering metadata.
    pub mtime: Timespec,
    /// Echoed back on retry so the daemon can recognise a duplicate write.
    pub reassert_version: ReassertVersion,
    /// Number of [`OsdOp`] entries that follow the header.
    pub num_ops: u16,
}

impl RequestHeader {
    /// Fixed wire size of [`RequestHeader`], excluding the variable-length
    /// ops/oid/ticket/snaps that follow it.
    pub const WIRE_SIZE: usize = 4
        + 8
        + PgId::WIRE_SIZE
        + 8
        + 8
        + 4
        + 4
        + 4
        + 4
        + 4
        + Timespec::WIRE_SIZE
        + ReassertVersion::WIRE_SIZE
        + 2;

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.client_inc);
        buf.put_u64_le(self.tid);
        self.layout.encode(buf);
        buf.put_u64_le(self.snapid);
        buf.put_u64_le(self.snap_seq);
        buf.put_u32_le(self.num_snaps);
        buf.put_u32_le(self.object_len);
        buf.put_u32_le(self.ticket_len);
        buf.put_u32_le(self.osdmap_epoch);
        buf.put_u32_le(self.flags.bits());
        self.mtime.encode(buf);
        self.reassert_version.encode(buf);
        buf.put_u16_le(self.num_ops);
    }

    fn decode(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < Self::WIRE_SIZE {
            return Err(ProtocolError::Truncated {
                needed: Self::WIRE_SIZE,
                available: buf.remaining(),
            });
        }

        let client_inc = buf.get_u32_le();
        let tid = buf.get_u64_le();
        let layout = PgId::decode(buf)?;
        let snapid = buf.get_u64_le();
        let snap_seq = buf.get_u64_le();
        let num_snaps = buf.get_u32_le();
        let object_len = buf.get_u32_le();
        let ticket_len = buf.get_u32_le();
        let osdmap_epoch = buf.get_u32_le();
        let flags = RequestFlags::from_bits(buf.get_u32_le());
        let mtime = Timespec::decode(buf)?;
        let reassert_version = ReassertVersion::decode(buf)?;
        let num_ops = buf.get_u16_le();

        Ok(Self {
            client_inc,
            tid,
            layout,
            snapid,
            snap_seq,
            num_snaps,
            object_len,
            ticket_len,
            osdmap_epoch,
            flags,
            mtime,
            reassert_version,
            num_ops,
        })
    }
}

/// A fully assembled outbound `OSD_OP` message: header, ops, object name,
/// ticket and trailing snapshot ids, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdRequestMessage {
    /// The fixed header.
    pub header: RequestHeader,
    /// The primary op followed by any auxiliary ops.
    pub ops: Vec<OsdOp>,
    /// Object name (`"<inode-hex>.<blockno-hex08>"`).
    pub oid: String,
    /// Opaque authentication ticket.
    pub ticket: Vec<u8>,
    /// Snapshot ids the write must remain visible in.
    pub snaps: Vec<u64>,
}

impl OsdRequestMessage {
    /// Encodes the full message, sizing the output buffer exactly.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let size = RequestHeader::WIRE_SIZE
            + self.ops.len() * crate::op::WIRE_SIZE
            + self.oid.len()
            + self.ticket.len()
            + self.snaps.len() * 8;

        let mut buf = BytesMut::with_capacity(size);
        self.header.encode(&mut buf);
        for op in &self.ops {
            op.encode(&mut buf);
        }
        buf.put_slice(self.oid.as_bytes());
        buf.put_slice(&self.ticket);
        for snap in &self.snaps {
            buf.put_u64_le(*snap);
        }

        assert_eq!(
            buf.len(),
            size,
            "OsdRequestMessage::encode produced an unexpected size"
        );

        buf.freeze()
    }

    /// Decodes a message previously produced by [`Self::encode`].
    pub fn decode(mut bytes: Bytes) -> Result<Self, ProtocolError> {
        let header = RequestHeader::decode(&mut bytes)?;

        let mut ops = Vec::with_capacity(header.num_ops as usize);
        for _ in 0..header.num_ops {
            ops.push(OsdOp::decode(&mut bytes)?);
        }

        let object_len = header.object_len as usize;
        if bytes.remaining() < object_len {
            return Err(ProtocolError::Truncated {
                needed: object_len,
                available: bytes.remaining(),
            });
        }
        let oid_bytes = bytes.copy_to_bytes(object_len);
        let oid = String::from_utf8(oid_bytes.to_vec()).map_err(|_| ProtocolError::InvalidOid)?;

        let ticket_len = header.ticket_len as usize;
        if bytes.remaining() < ticket_len {
            return Err(ProtocolError::Truncated {
                needed: ticket_len,
                available: bytes.remaining(),
            });
        }
        let ticket = bytes.copy_to_bytes(ticket_len).to_vec();

        let mut snaps = Vec::with_capacity(header.num_snaps as usize);
        for _ in 0..header.num_snaps {
            if bytes.remaining() < 8 {
                return Err(ProtocolError::Truncated {
                    needed: 8,
                    available: bytes.remaining(),
                });
            }
            snaps.push(bytes.get_u64_le());
        }

        Ok(Self {
            header,
            ops,
            oid,
            ticket,
            snaps,
        })
    }
}
