use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use osdc_transport::Transport;

use crate::dispatcher::Dispatcher;
use crate::inner::SharedState;
use crate::monitor::MonitorClient;

/// Periodic sweep over in-flight requests, resending anything flagged and
/// pinging daemons that have gone quiet past `osd_timeout` (§4.8).
struct Sweeper {
    state: Arc<SharedState>,
    transport: Arc<dyn Transport>,
    monitor: Arc<dyn MonitorClient>,
    dispatcher: Arc<Dispatcher>,
    osd_timeout: Duration,
}

impl Sweeper {
    /// Runs one sweep. Returns `true` if any request remains in flight,
    /// i.e. the worker should reschedule itself (§4.8: "reschedule iff any
    /// request remains").
    fn sweep(&self) -> bool {
        self.monitor.request_newer_map();

        let requests = {
            let locked = self.state.locked.lock().expect("request mutex poisoned");
            locked.index.in_order()
        };

        let mut pinged: HashSet<i32> = HashSet::new();
        let now = Instant::now();

        for request in &requests {
            if request.with_mutable(|m| m.aborted) {
                continue;
            }

            let needs_resend = request.with_mutable(|m| m.resend);
            if needs_resend {
                match self.dispatcher.send(request) {
                    Ok(()) => request.with_mutable(|m| m.resend = false),
                    Err(_) => request.with_mutable(|m| m.resend = true),
                }
                continue;
            }

            let (deadline, ordinal) = request.with_mutable(|m| (m.timeout_stamp, m.routed_daemon));
            if now < deadline {
                continue;
            }
            request.with_mutable(|m| m.timeout_stamp = now + self.osd_timeout);

            let Some(ordinal) = ordinal else { continue };
            if !pinged.insert(ordinal) {
                continue;
            }
            let connection = {
                let locked = self.state.locked.lock().expect("request mutex poisoned");
                locked.registry.connection(ordinal).cloned()
            };
            if let Some(connection) = connection {
                if self.transport.ping(&connection).is_err() {
                    tracing::debug!(ordinal, "ping failed, daemon still unresponsive");
                }
            }
        }

        !requests.is_empty()
    }
}

/// Handle to the background timeout-sweep thread started by `init` (§4.8,
/// §4.9). Dropping this without calling [`TimeoutWorker::stop`] leaves the
/// thread running detached; `Client::stop` always calls `stop` explicitly.
pub(crate) struct TimeoutWorker {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl TimeoutWorker {
    pub(crate) fn start(
        state: Arc<SharedState>,
        transport: Arc<dyn Transport>,
        monitor: Arc<dyn MonitorClient>,
        dispatcher: Arc<Dispatcher>,
        osd_timeout: Duration,
    ) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let wake = Arc::new((Mutex::new(false), Condvar::new()));

        let sweeper = Sweeper {
            state,
            transport,
            monitor,
            dispatcher,
            osd_timeout,
        };

        let thread_stop = stop_flag.clone();
        let thread_wake = wake.clone();
        let handle = std::thread::Builder::new()
            .name("osdc-timeout".to_string())
            .spawn(move || {
                let (lock, condvar) = &*thread_wake;
                loop {
                    if thread_stop.load(Ordering::Acquire) {
                        return;
                    }

                    // §4.8: "reschedule iff any request remains" — still
                    // wait out the interval either way, since a stop signal
                    // or a freshly-started request may arrive while idle.
                    let _any_remaining = sweeper.sweep();

                    let guard = lock.lock().expect("timeout-worker wake mutex poisoned");
                    let _ = condvar
                        .wait_timeout_while(guard, osd_timeout, |_| {
                            !thread_stop.load(Ordering::Acquire)
                        })
                        .expect("timeout-worker wake mutex poisoned");
                }
            })
            .expect("failed to spawn timeout worker thread");

        Self {
            stop_flag,
            wake,
            handle: Some(handle),
        }
    }

    /// Signals the worker to exit and joins it. Does not touch in-flight
    /// requests; stopping the worker does not force-fail them (§4.9).
    pub(crate) fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Release);
        let (lock, condvar) = &*self.wake;
        let _guard = lock.lock().expect("timeout-worker wake mutex poisoned");
        condvar.notify_all();
        drop(_guard);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimeoutWorker {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        let (lock, condvar) = &*self.wake;
        let _guard = lock.lock().expect("timeout-worker wake mutex poisoned");
        condvar.notify_all();
        drop(_guard);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
