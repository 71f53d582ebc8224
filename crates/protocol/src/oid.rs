//! Object-name formatting.

/// Formats an object name as `"<inode-hex>.<blockno-hex08>"`, matching the
/// literal `"%llx.%08llx" % (ino, block_no)` rule from the data model.
#[must_use]
pub fn format_oid(ino: u64, block_no: u64) -> String {
    format!("{ino:x}.{block_no:08x}")
}
