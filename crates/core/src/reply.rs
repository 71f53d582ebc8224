use std::sync::Arc;

use osdc_protocol::reply::OsdReplyMessage;
use osdc_protocol::RequestFlags;
use osdc_transport::{Message, Transport};

use crate::inner::SharedState;

/// Decodes and applies one inbound reply (§4.6).
#[derive(Clone)]
pub(crate) struct ReplyHandler {
    state: Arc<SharedState>,
    transport: Arc<dyn Transport>,
}

impl ReplyHandler {
    pub(crate) fn new(state: Arc<SharedState>, transport: Arc<dyn Transport>) -> Self {
        Self { state, transport }
    }

    /// Entry point for a decoded reply message (§4.6).
    pub(crate) fn handle_reply(&self, msg: &Message) {
        let decoded = match OsdReplyMessage::decode(msg.body().clone()) {
            Ok(decoded) => decoded,
            Err(error) => {
                tracing::warn!(%error, "corrupt reply, dropping");
                return;
            }
        };

        let tid = decoded.header.tid;
        let request = {
            let locked = self.state.locked.lock().unwrap();
            locked.index.lookup(tid)
        };
        let Some(request) = request else {
            tracing::debug!(tid, "reply for unknown tid, dropping (may have been aborted)");
            return;
        };

        // Step 3: release the pinned reply-message reference held only for
        // the duration of page-vector exposure.
        request.with_mutable(|m| m.reply_msg = None);

        if request.with_mutable(|m| m.aborted) {
            return;
        }

        let flags = RequestFlags::from_bits(decoded.header.flags);
        let ondisk = flags.contains(RequestFlags::ONDISK);
        let is_first = request.with_mutable(|m| !m.got_reply);

        if is_first {
            let data_len: i32 = decoded.ops.iter().map(|op| op.payload_len as i32).sum();
            request.with_mutable(|m| {
                m.result = if decoded.header.result < 0 {
                    decoded.header.result
                } else {
                    data_len
                };
                m.reassert_version = decoded.header.reassert_version;
                m.got_reply = true;
            });
        } else if !ondisk {
            tracing::trace!(tid, "duplicate ack, dropping");
            return;
        }

        if ondisk || request.is_read() {
            self.unregister(&request);
        }

        let on_reply = request.with_mutable(|m| m.on_reply.take());
        let result = request.with_mutable(|m| m.result);
        match on_reply {
            Some(callback) => callback(result),
            None => request.fire_done(),
        }

        if ondisk {
            let on_safe = request.with_mutable(|m| m.on_safe.take());
            if let Some(callback) = on_safe {
                callback();
            }
            request.fire_safe();
        }
    }

    fn unregister(&self, request: &crate::request::Request) {
        let ordinal = request.with_mutable(|m| m.routed_daemon);
        let closed_connection = {
            let mut locked = self.state.locked.lock().unwrap();
            locked.index.remove(request.tid());
            locked.live_count = locked.live_count.saturating_sub(1);
            ordinal.and_then(|ordinal| locked.registry.unroute(ordinal, request.tid()))
        };
        if let Some(connection) = closed_connection {
            self.transport.close(&connection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{test_request, test_write_request};
    use osdc_placement::{OsdMap, OsdMapSnapshot};
    use osdc_protocol::opcode::OpCode;
    use osdc_protocol::reply::ReplyHeader;
    use osdc_protocol::{OsdOp, ReassertVersion};
    use osdc_transport::mock::MockTransport;
    use std::collections::BTreeMap;

    fn reply_message(tid: u64, flags: RequestFlags, result: i32, data_len: u32) -> Message {
        let reply = OsdReplyMessage {
            header: ReplyHeader {
                tid,
                flags: flags.bits(),
                result,
                object_len: 0,
                num_ops: 1,
                reassert_version: ReassertVersion::default(),
            },
            ops: vec![OsdOp::primary(OpCode::Read, 0, u64::from(data_len), data_len)],
            oid: String::new(),
        };
        Message::new(tid, reply.encode())
    }

    fn handler_with_registered(request: crate::request::Request) -> (ReplyHandler, Arc<MockTransport>) {
        let map = OsdMap::decode_full(OsdMapSnapshot {
            epoch: 1,
            pg_num: 8,
            osd_addr: BTreeMap::new(),
            pg_primary: BTreeMap::new(),
        });
        let state = Arc::new(SharedState::new(map));
        {
            let mut locked = state.locked.lock().unwrap();
            locked.index.insert(request.tid(), request);
        }
        let transport = Arc::new(MockTransport::new());
        let handler = ReplyHandler::new(state, transport.clone() as Arc<dyn Transport>);
        (handler, transport)
    }

    #[test]
    fn read_reply_completes_and_unregisters() {
        let request = test_request(1);
        let (handler, _transport) = handler_with_registered(request.clone());

        handler.handle_reply(&reply_message(1, RequestFlags::empty(), 0, 4096));

        assert!(request.is_done());
        assert_eq!(request.with_mutable(|m| m.result), 4096);
        let still_indexed = {
            let locked = handler.state.locked.lock().unwrap();
            locked.index.lookup(1).is_some()
        };
        assert!(!still_indexed);
    }

    #[test]
    fn duplicate_ack_without_ondisk_is_dropped() {
        let request = test_request(2);
        let (handler, _transport) = handler_with_registered(request.clone());

        handler.handle_reply(&reply_message(2, RequestFlags::empty(), 0, 10));
        assert!(request.is_done());
        let first_result = request.with_mutable(|m| m.result);

        handler.handle_reply(&reply_message(2, RequestFlags::empty(), 0, 999));
        assert_eq!(request.with_mutable(|m| m.result), first_result);
    }

    #[test]
    fn write_waits_for_ondisk_before_safe_fires() {
        let request = test_write_request(3);
        let (handler, _transport) = handler_with_registered(request.clone());

        handler.handle_reply(&reply_message(3, RequestFlags::ACK, 0, 10));
        assert!(request.is_done());
        assert!(!request.is_safe());

        handler.handle_reply(&reply_message(3, RequestFlags::ONDISK, 0, 10));
        assert!(request.is_safe());
    }

    #[test]
    fn unknown_tid_is_dropped_silently() {
        let map = OsdMap::empty(8);
        let state = Arc::new(SharedState::new(map));
        let transport = Arc::new(MockTransport::new());
        let handler = ReplyHandler::new(state, transport.clone() as Arc<dyn Transport>);

        handler.handle_reply(&reply_message(999, RequestFlags::empty(), 0, 4));
    }
}
