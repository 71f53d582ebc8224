use thiserror::Error;

/// Errors produced while encoding or decoding wire messages.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ProtocolError {
    /// The buffer ended before a fixed-size field could be read.
    #[error("truncated message: needed {needed} bytes, had {available}")]
    Truncated {
        /// Bytes required to finish decoding the current field.
        needed: usize,
        /// Bytes actually remaining in the buffer.
        available: usize,
    },
    /// The declared front length did not match `header + object_len + num_ops * op_len`.
    #[error(
        "front length mismatch: declared {declared}, expected {expected} \
         (header {header}, object_len {object_len}, {num_ops} ops)"
    )]
    FrontLengthMismatch {
        /// Length actually present in the buffer.
        declared: usize,
        /// Length computed from the header fields.
        expected: usize,
        /// Size of the fixed header portion.
        header: usize,
        /// `object_len` field from the header.
        object_len: u32,
        /// `num_ops` field from the header.
        num_ops: u32,
    },
    /// An opcode on the wire did not match any known [`crate::opcode::OpCode`].
    #[error("unknown opcode {0}")]
    UnknownOpCode(u16),
    /// A string field was not valid UTF-8.
    #[error("object name was not valid UTF-8")]
    InvalidOid,
}
