//! End-to-end scenarios from the specification's testable-properties
//! section, driven entirely through the public [`osdc_core::Client`] facade
//! against [`osdc_transport::mock::MockTransport`] and the real
//! `osdc-placement` implementation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use osdc_core::monitor::NullMonitorClient;
use osdc_core::{Client, ClientConfig};
use osdc_placement::{calc_object_layout, FileLayout, OsdMap, OsdMapSnapshot, Vino, NOSNAP};
use osdc_protocol::{OpCode, OsdOp, ReassertVersion};
use osdc_transport::mock::MockTransport;
use osdc_transport::{Message, PageVec, Transport};

fn config() -> ClientConfig {
    ClientConfig::builder(1).osd_timeout(Duration::from_secs(30)).build()
}

fn ack_reply(tid: u64, result: i32, data_len: u32) -> Message {
    let reply = osdc_protocol::reply::OsdReplyMessage {
        header: osdc_protocol::reply::ReplyHeader {
            tid,
            flags: 0,
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

fn ondisk_reply(tid: u64) -> Message {
    let reply = osdc_protocol::reply::OsdReplyMessage {
        header: osdc_protocol::reply::ReplyHeader {
            tid,
            flags: osdc_protocol::RequestFlags::ONDISK.bits(),
            result: 0,
            object_len: 0,
            num_ops: 1,
            reassert_version: ReassertVersion::default(),
        },
        ops: vec![OsdOp::primary(OpCode::Write, 0, 4096, 4096)],
        oid: String::new(),
    };
    Message::new(tid, reply.encode())
}

/// Scenario 1: a short read across an object boundary is shortened to the
/// object's remaining length.
#[test]
fn short_read_across_object_boundary_shortens_length() {
    let layout = FileLayout {
        object_size: 4 << 20,
        pool: 1,
    };
    let vino = Vino {
        ino: 0x1000,
        snap: NOSNAP,
    };
    let off = (4 << 20) - (4 << 10);

    let empty_map = OsdMap::empty(8);
    let pg = calc_object_layout(&layout, vino, off, 8 << 10, &empty_map).unwrap().pg_id;

    let map = OsdMap::decode_full(OsdMapSnapshot {
        epoch: 1,
        pg_num: 8,
        osd_addr: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
        pg_primary: BTreeMap::from([(pg, 3)]),
    });

    let transport = Arc::new(MockTransport::new());
    let client = Client::init(config(), transport.clone(), Arc::new(NullMonitorClient), map, 0);

    let pages = PageVec::new(vec![bytes::Bytes::from(vec![0u8; 4 << 10])]);
    std::thread::scope(|scope| {
        let handle = scope.spawn(|| client.readpages(vino, &layout, off, 8 << 10, 0, 0, pages));
        std::thread::sleep(Duration::from_millis(20));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let tid = sent[0].1.tid();
        client.handle_reply(&ack_reply(tid, 0, 4 << 10));

        let result = handle.join().unwrap().unwrap();
        assert_eq!(result, 4 << 10);
    });

    client.stop();
}

/// Scenario 3: a map change mid-flight reroutes an in-flight request to the
/// new primary and resends it with `RETRY` set.
#[test]
fn map_change_reroutes_inflight_request() {
    let layout = FileLayout {
        object_size: 4 << 20,
        pool: 1,
    };
    let vino = Vino { ino: 1, snap: NOSNAP };
    let empty_map = OsdMap::empty(8);
    let pg = calc_object_layout(&layout, vino, 0, 4096, &empty_map).unwrap().pg_id;

    let map = OsdMap::decode_full(OsdMapSnapshot {
        epoch: 1,
        pg_num: 8,
        osd_addr: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
        pg_primary: BTreeMap::from([(pg, 3)]),
    });

    let transport = Arc::new(MockTransport::new());
    let client = Client::init(config(), transport.clone(), Arc::new(NullMonitorClient), map, 0);

    let pages = PageVec::new(vec![bytes::Bytes::from(vec![0u8; 4096])]);
    std::thread::scope(|scope| {
        let handle = scope.spawn(|| client.readpages(vino, &layout, 0, 4096, 0, 0, pages));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(transport.sent_count_to("10.0.0.3:6800"), 1);

        let moved = OsdMapSnapshot {
            epoch: 2,
            pg_num: 8,
            osd_addr: BTreeMap::from([
                (3, "10.0.0.3:6800".to_string()),
                (5, "10.0.0.5:6800".to_string()),
            ]),
            pg_primary: BTreeMap::from([(pg, 5)]),
        };
        client.handle_map_update(&osdc_core::MapUpdate {
            fsid: 0,
            incrementals: vec![],
            full_maps: vec![moved],
        });

        assert_eq!(transport.sent_count_to("10.0.0.5:6800"), 1);
        let tid = transport.sent().last().unwrap().1.tid();
        client.handle_reply(&ack_reply(tid, 0, 4096));
        handle.join().unwrap().unwrap();
    });

    client.stop();
}

/// Scenario 4: a duplicate ack without `ONDISK` is dropped and does not
/// re-fire the completion signal's observable state.
#[test]
fn duplicate_ack_without_ondisk_is_dropped() {
    let layout = FileLayout {
        object_size: 4 << 20,
        pool: 1,
    };
    let vino = Vino { ino: 2, snap: NOSNAP };
    let empty_map = OsdMap::empty(8);
    let pg = calc_object_layout(&layout, vino, 0, 4096, &empty_map).unwrap().pg_id;

    let map = OsdMap::decode_full(OsdMapSnapshot {
        epoch: 1,
        pg_num: 8,
        osd_addr: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
        pg_primary: BTreeMap::from([(pg, 3)]),
    });

    let transport = Arc::new(MockTransport::new());
    let client = Client::init(config(), transport.clone(), Arc::new(NullMonitorClient), map, 0);

    let pages = PageVec::new(vec![bytes::Bytes::from(vec![0u8; 4096])]);
    std::thread::scope(|scope| {
        let handle = scope.spawn(|| client.readpages(vino, &layout, 0, 4096, 0, 0, pages));
        std::thread::sleep(Duration::from_millis(20));
        let tid = transport.sent()[0].1.tid();

        client.handle_reply(&ack_reply(tid, 0, 4096));
        client.handle_reply(&ack_reply(tid, 0, 999));

        let result = handle.join().unwrap().unwrap();
        assert_eq!(result, 4096);
    });

    client.stop();
}

/// An in-flight request shows up in the diagnostic session summary before
/// its reply arrives, then disappears once it completes normally.
///
/// `Client::abort`/`Client::wait` take a `Request` handle that `readpages`
/// does not hand back through the public facade by design (it blocks until
/// completion internally); the facade-level abort contract is exercised
/// directly in `osdc-core`'s own `client.rs` test module, which has
/// crate-internal access to build a `Request` without going through
/// `readpages`.
#[test]
fn in_flight_request_appears_in_session_summary_then_clears_on_completion() {
    let layout = FileLayout {
        object_size: 4 << 20,
        pool: 1,
    };
    let vino = Vino { ino: 3, snap: NOSNAP };
    let empty_map = OsdMap::empty(8);
    let pg = calc_object_layout(&layout, vino, 0, 4096, &empty_map).unwrap().pg_id;

    let map = OsdMap::decode_full(OsdMapSnapshot {
        epoch: 1,
        pg_num: 8,
        osd_addr: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
        pg_primary: BTreeMap::from([(pg, 3)]),
    });

    let transport = Arc::new(MockTransport::new());
    let client = Client::init(config(), transport.clone(), Arc::new(NullMonitorClient), map, 0);

    let pages = PageVec::new(vec![bytes::Bytes::from(vec![0u8; 4096])]);
    std::thread::scope(|scope| {
        let handle = scope.spawn(|| client.readpages(vino, &layout, 0, 4096, 0, 0, pages));
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(
            client.session_summary(),
            vec![osdc_core::SessionSummary {
                osd_ordinal: 3,
                in_flight_count: 1,
            }]
        );

        let tid = transport.sent()[0].1.tid();
        client.handle_reply(&ack_reply(tid, 0, 4096));
        handle.join().unwrap().unwrap();

        assert!(client.session_summary().is_empty());
    });

    client.stop();
}

/// A transport-reported reset of a connection mass-resubmits every request
/// currently routed through it, via the same callback edge a real transport
/// would use (`MockTransport::simulate_reset` drives `on_reset` exactly as
/// a dropped connection would).
#[test]
fn transport_reset_mass_resubmits_requests_routed_through_it() {
    let layout = FileLayout {
        object_size: 4 << 20,
        pool: 1,
    };
    let vino = Vino { ino: 7, snap: NOSNAP };
    let empty_map = OsdMap::empty(8);
    let pg = calc_object_layout(&layout, vino, 0, 4096, &empty_map).unwrap().pg_id;

    let map = OsdMap::decode_full(OsdMapSnapshot {
        epoch: 1,
        pg_num: 8,
        osd_addr: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
        pg_primary: BTreeMap::from([(pg, 3)]),
    });

    let transport = Arc::new(MockTransport::new());
    let client = Client::init(config(), transport.clone(), Arc::new(NullMonitorClient), map, 0);

    let pages = PageVec::new(vec![bytes::Bytes::from(vec![0u8; 4096])]);
    std::thread::scope(|scope| {
        let handle = scope.spawn(|| client.readpages(vino, &layout, 0, 4096, 0, 0, pages));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(transport.sent_count_to("10.0.0.3:6800"), 1);

        // Drives `Transport::set_callbacks` -> `CoreCallbacks::on_reset` ->
        // `Dispatcher::kick_requests(Some(addr))`, the exact path wired up
        // in `Client::init`.
        transport.simulate_reset("10.0.0.3:6800");
        assert_eq!(transport.sent_count_to("10.0.0.3:6800"), 2);

        let tid = transport.sent().last().unwrap().1.tid();
        client.handle_reply(&ack_reply(tid, 0, 4096));
        handle.join().unwrap().unwrap();
    });

    client.stop();
}

/// Scenario 6: `sync` waits only on past writes, skipping reads and writes
/// started after the snapshot of `last_tid`.
#[test]
fn sync_waits_only_on_writes_up_to_last_tid() {
    let layout = FileLayout {
        object_size: 4 << 20,
        pool: 1,
    };
    let vino = Vino { ino: 4, snap: NOSNAP };
    let empty_map = OsdMap::empty(8);
    let pg = calc_object_layout(&layout, vino, 0, 4096, &empty_map).unwrap().pg_id;

    let map = OsdMap::decode_full(OsdMapSnapshot {
        epoch: 1,
        pg_num: 8,
        osd_addr: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
        pg_primary: BTreeMap::from([(pg, 3)]),
    });

    let transport = Arc::new(MockTransport::new());
    let client = Client::init(config(), transport.clone(), Arc::new(NullMonitorClient), map, 0);

    std::thread::scope(|scope| {
        let write_pages = || PageVec::new(vec![bytes::Bytes::from(vec![0u8; 4096])]);

        let w1 = scope.spawn(|| {
            client.writepages(
                vino,
                &layout,
                0,
                Vec::new(),
                0,
                4096,
                0,
                0,
                osdc_protocol::Timespec::default(),
                write_pages(),
                osdc_protocol::RequestFlags::empty(),
                false,
                false,
            )
        });
        std::thread::sleep(Duration::from_millis(10));

        let read_pages = PageVec::new(vec![bytes::Bytes::from(vec![0u8; 4096])]);
        let r = scope.spawn(|| client.readpages(vino, &layout, 0, 4096, 0, 0, read_pages));
        std::thread::sleep(Duration::from_millis(10));

        let w2 = scope.spawn(|| {
            client.writepages(
                vino,
                &layout,
                0,
                Vec::new(),
                0,
                4096,
                0,
                0,
                osdc_protocol::Timespec::default(),
                write_pages(),
                osdc_protocol::RequestFlags::empty(),
                false,
                false,
            )
        });
        std::thread::sleep(Duration::from_millis(10));

        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        let tids: Vec<u64> = sent.iter().map(|(_, m)| m.tid()).collect();

        // Ack (not ondisk) every in-flight request so each facade call's
        // first-completion wait returns; only the writes additionally wait
        // on the safe signal via `sync`.
        for &tid in &tids {
            client.handle_reply(&ack_reply(tid, 0, 4096));
        }
        r.join().unwrap().unwrap();
        // Writes need their durable commit before `writepages` itself
        // returns only on ack (per §4.9, writepages waits for first
        // completion, not safe) - so join them now, then drive `sync`.
        w1.join().unwrap().unwrap();
        w2.join().unwrap().unwrap();

        let sync_handle = scope.spawn(|| client.sync());
        std::thread::sleep(Duration::from_millis(10));
        for &tid in &tids {
            client.handle_reply(&ondisk_reply(tid));
        }
        assert!(sync_handle.join().unwrap().is_ok());
    });

    client.stop();
}
