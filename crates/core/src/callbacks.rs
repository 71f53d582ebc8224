use std::sync::Arc;

use osdc_transport::{Message, TransportCallbacks, TransportError};

use crate::dispatcher::Dispatcher;
use crate::reply::ReplyHandler;

/// Wires the transport's callback edge (§1, §5: "transport callback threads
/// delivering replies and reset notifications") back into the core.
///
/// `on_reset` is the mechanism named by §2 item 5 and the error-taxonomy
/// row for a transport reset (§7): mass-resubmission via
/// `Dispatcher::kick_requests`.
pub(crate) struct CoreCallbacks {
    reply_handler: ReplyHandler,
    dispatcher: Arc<Dispatcher>,
}

impl CoreCallbacks {
    pub(crate) fn new(reply_handler: ReplyHandler, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            reply_handler,
            dispatcher,
        }
    }
}

impl TransportCallbacks for CoreCallbacks {
    fn on_reply(&self, msg: Message) {
        self.reply_handler.handle_reply(&msg);
    }

    fn on_reset(&self, addr: &str) {
        tracing::warn!(addr, "transport reset, mass-resubmitting affected requests");
        self.dispatcher.kick_requests(Some(addr));
    }

    fn on_prepare_pages(&self, _msg: &Message, _want: usize) -> Result<(), TransportError> {
        // Page storage is attached by the caller before a request is ever
        // started (`Message::attach_pages`, the §1 page-vector boundary);
        // this transport never needs to grow one on the core's behalf.
        Ok(())
    }
}
