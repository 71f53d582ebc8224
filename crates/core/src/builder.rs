use osdc_placement::{calc_object_layout, FileLayout, ObjectLayout, OsdMap, Vino};
use osdc_protocol::{OpCode, OsdOp, RequestFlags, Timespec};

use crate::error::ClientError;
use crate::request::Request;

/// Everything the caller supplies for one request, beyond the layout/map
/// inputs `calc_object_layout` already consumes (§4.1 `build`).
#[allow(clippy::too_many_arguments)]
pub(crate) struct BuildArgs<'a> {
    pub layout: &'a FileLayout,
    pub vino: Vino,
    pub off: u64,
    pub plen: u64,
    pub opcode: OpCode,
    pub flags: RequestFlags,
    pub client_inc: u32,
    pub snap_seq: u64,
    pub snaps: Vec<u64>,
    pub trunc_seq: u32,
    pub trunc_size: u64,
    pub do_sync: bool,
    pub mtime: Timespec,
}

/// Composes a layout, op list and flag set into a [`Request`] (§4.1
/// `build`): calls the placement engine to shorten `plen` at an object
/// boundary, then appends the auxiliary truncate op (`MASKTRUNC` for a read,
/// `SETTRUNC` for a write) when a truncate point is known, and a
/// `STARTSYNC` op when `do_sync` is set.
pub(crate) fn build(args: BuildArgs<'_>, map: &OsdMap) -> Result<(Request, ObjectLayout), ClientError> {
    let layout = calc_object_layout(args.layout, args.vino, args.off, args.plen, map)?;

    let payload_len = if args.opcode.is_write() {
        u32::try_from(layout.object_length).unwrap_or(u32::MAX)
    } else {
        0
    };
    let mut ops = vec![OsdOp::primary(args.opcode, layout.object_offset, layout.object_length, payload_len)];

    // §4.1: "truncate_size biased by (off - primary_op.offset)", so the
    // daemon sees the boundary expressed in object-relative units matching
    // this op's own offset.
    if args.trunc_seq > 0 {
        let bias = args.off.saturating_sub(layout.object_offset);
        let trunc_opcode = if args.opcode.is_read() {
            OpCode::MaskTrunc
        } else {
            OpCode::SetTrunc
        };
        ops.push(OsdOp {
            op: trunc_opcode,
            offset: 0,
            length: 0,
            payload_len: 0,
            truncate_seq: args.trunc_seq,
            truncate_size: args.trunc_size.saturating_sub(bias),
        });
    }

    if args.do_sync {
        ops.push(OsdOp::primary(OpCode::StartSync, 0, 0, 0));
    }

    let request = Request::new(
        &layout,
        args.opcode.is_read(),
        args.flags,
        args.client_inc,
        args.vino.snap,
        args.snap_seq,
        ops,
        Vec::new(),
        args.snaps,
        args.mtime,
    );

    Ok((request, layout))
}
