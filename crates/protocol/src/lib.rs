#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `osdc_protocol` defines the little-endian wire structures exchanged
//! between an object-storage-device client and the storage daemons it
//! talks to: the outbound `OSD_OP` request and the inbound `OSD_OPREPLY`
//! response, together with the opcode and flag vocabularies referenced by
//! both.
//!
//! # Design
//!
//! - [`opcode::OpCode`] and [`flags::RequestFlags`] are the closed
//!   vocabularies the rest of the workspace builds requests from.
//! - [`oid::format_oid`] renders the `<inode-hex>.<blockno-hex08>` object
//!   name shared by every layer that needs to print or route on it.
//! - [`request::RequestHeader`] / [`request::OsdRequestMessage`] and
//!   [`reply::ReplyHeader`] / [`reply::OsdReplyMessage`] own encode/decode
//!   for the two message shapes; [`op::OsdOp`] is the repeated sub-structure
//!   both embed.
//!
//! # Invariants
//!
//! - Every encoded message is sized exactly at build time; there is no
//!   padding and no length field is ever left unset.
//! - Decoding a reply validates the front length against the declared
//!   `object_len`/`num_ops` before touching the payload.
//!
//! # Errors
//!
//! All decode failures are reported through [`error::ProtocolError`].
//!
//! # Examples
//!
//! ```
//! use osdc_protocol::oid::format_oid;
//!
//! assert_eq!(format_oid(0x1000, 0x2a), "1000.0000002a");
//! ```

/// Wire errors shared by request and reply decoding.
pub mod error;
/// Bitset of request flags (`READ`, `WRITE`, `ONDISK`, `RETRY`, ...).
pub mod flags;
/// Object-name formatting (`"<inode-hex>.<blockno-hex08>"`).
pub mod oid;
/// Opcode vocabulary (`READ`, `WRITE`, `STARTSYNC`, `MASKTRUNC`, `SETTRUNC`).
pub mod opcode;
/// The repeated per-op wire structure embedded in both messages.
pub mod op;
/// Inbound `OSD_OPREPLY` header and message.
pub mod reply;
/// Outbound `OSD_OP` header and message.
pub mod request;
/// Small wire-shaped value types shared by request and reply headers.
pub mod types;

pub use error::ProtocolError;
pub use flags::RequestFlags;
pub use op::OsdOp;
pub use opcode::OpCode;
pub use reply::{OsdReplyMessage, ReplyHeader};
pub use request::{OsdRequestMessage, RequestHeader};
pub use types::{PgId, ReassertVersion, Timespec};
