use std::collections::BTreeMap;

use osdc_transport::Connection;

use crate::request::Request;

/// A daemon session: a connection handle and the requests currently routed
/// to it (§3, §4.3). Lifetime is bounded by non-emptiness of `requests`;
/// the registry destroys a session as soon as its list empties.
pub(crate) struct DaemonSession {
    pub osd_ordinal: i32,
    pub connection: Connection,
    pub requests: Vec<Request>,
}

impl DaemonSession {
    fn new(osd_ordinal: i32, connection: Connection) -> Self {
        Self {
            osd_ordinal,
            connection,
            requests: Vec::new(),
        }
    }

    fn attach(&mut self, request: Request) {
        self.requests.push(request);
    }

    /// Removes `tid` from this session's list by identity. Returns `true`
    /// if the session is now empty and should be destroyed.
    fn detach(&mut self, tid: u64) -> bool {
        self.requests.retain(|r| r.tid() != tid);
        self.requests.is_empty()
    }
}

/// A read-only snapshot entry for diagnostics (`osd_ordinal`,
/// `in_flight_count`), mirroring Ceph's `dump_active_requests` (SPEC_FULL.md
/// "Supplemented features").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Daemon ordinal this entry describes.
    pub osd_ordinal: i32,
    /// Number of requests currently routed to this daemon.
    pub in_flight_count: usize,
}

/// Key-ordered map from `osd_ordinal` to daemon session (§4.3).
#[derive(Default)]
pub(crate) struct DaemonRegistry {
    sessions: BTreeMap<i32, DaemonSession>,
}

impl DaemonRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Routes `request` to `osd_ordinal`, creating the session (via
    /// `connect_fn`) if this is its first request. Returns an error from
    /// `connect_fn` unchanged on connect failure.
    pub(crate) fn route<E>(
        &mut self,
        osd_ordinal: i32,
        request: Request,
        connect_fn: impl FnOnce() -> Result<Connection, E>,
    ) -> Result<(), E> {
        if let Some(session) = self.sessions.get_mut(&osd_ordinal) {
            session.attach(request);
            return Ok(());
        }
        let connection = connect_fn()?;
        let mut session = DaemonSession::new(osd_ordinal, connection);
        session.attach(request);
        self.sessions.insert(osd_ordinal, session);
        Ok(())
    }

    /// Detaches `tid` from `osd_ordinal`'s session, destroying the session
    /// (and returning its connection for `close`) if it becomes empty.
    pub(crate) fn unroute(&mut self, osd_ordinal: i32, tid: u64) -> Option<Connection> {
        let empty = self
            .sessions
            .get_mut(&osd_ordinal)
            .map(|session| session.detach(tid))
            .unwrap_or(false);
        if empty {
            self.sessions.remove(&osd_ordinal).map(|s| s.connection)
        } else {
            None
        }
    }

    pub(crate) fn connection(&self, osd_ordinal: i32) -> Option<&Connection> {
        self.sessions.get(&osd_ordinal).map(|s| &s.connection)
    }

    pub(crate) fn contains(&self, osd_ordinal: i32) -> bool {
        self.sessions.contains_key(&osd_ordinal)
    }

    /// Every currently open connection, used to mass-resubmit on a map
    /// change without targeting a specific address.
    pub(crate) fn ordinals(&self) -> Vec<i32> {
        self.sessions.keys().copied().collect()
    }

    /// Read-only diagnostic snapshot of every session's in-flight count.
    #[must_use]
    pub fn session_summary(&self) -> Vec<SessionSummary> {
        self.sessions
            .values()
            .map(|session| SessionSummary {
                osd_ordinal: session.osd_ordinal,
                in_flight_count: session.requests.len(),
            })
            .collect()
    }
}
