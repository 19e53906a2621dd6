use std::cell::{Cell, RefCell, RefMut};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use bytes::Bytes;
use parking_lot::{Mutex, ReentrantMutex};
use serlink_transport::{DataHandler, LinkLayer, LogLevel, StatusCode};
use tracing::{debug, error, trace, warn};

use crate::config::SessionConfig;
use crate::decoder::EventDecoder;
use crate::dispatch;
use crate::error::{Result, SessionError};
use crate::packet::{self, PacketKind};
use crate::queue::EventQueue;
use crate::response::{Delivery, ResponseSlot};
use crate::sinks::Sinks;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// A tagged command/response and event session over one link.
///
/// `open` brings up the link and the event dispatch thread, `send` issues one
/// command at a time and optionally waits for its response, `close` stops
/// dispatching and tears the link down. A session can be opened again after
/// it has been closed.
///
/// Event callbacks may call `send` on the same session. They must not call
/// `close`: that is refused with [`SessionError::InvalidState`]. Status and
/// log callbacks can run synchronously inside the link's `open` and `send`;
/// from there they may query the session, while `send` and `close` are
/// refused with [`SessionError::InvalidState`] until the link call returns.
pub struct Session<L: LinkLayer, D: EventDecoder> {
    lifecycle: ReentrantMutex<Lifecycle<L, D::Event>>,
    send_lock: Mutex<()>,
    shared: Arc<Shared>,
    decoder: Arc<D>,
    config: SessionConfig,
}

/// Each field is borrowed only briefly, so a callback re-entering the session
/// from inside a link call never meets an outstanding borrow except on `link`.
struct Lifecycle<L, E> {
    state: Cell<SessionState>,
    link: RefCell<L>,
    sinks: RefCell<Option<Arc<Sinks<E>>>>,
    dispatcher: RefCell<Option<Dispatcher>>,
}

impl<L: LinkLayer, E> Lifecycle<L, E> {
    /// Borrow the link, or refuse when a link call further up this thread's
    /// stack already holds it.
    fn link(&self) -> Result<RefMut<'_, L>> {
        self.link
            .try_borrow_mut()
            .map_err(|_| SessionError::InvalidState("link call already in progress on this thread"))
    }

    fn sinks(&self) -> Option<Arc<Sinks<E>>> {
        self.sinks.borrow().clone()
    }

    fn dispatch_thread(&self) -> Option<ThreadId> {
        self.dispatcher
            .borrow()
            .as_ref()
            .map(|dispatcher| dispatcher.thread)
    }
}

struct Dispatcher {
    handle: JoinHandle<()>,
    thread: ThreadId,
}

/// State reachable from the link's reader thread and the dispatch thread.
struct Shared {
    response: ResponseSlot,
    events: EventQueue,
}

impl<L: LinkLayer, D: EventDecoder> Session<L, D> {
    /// Create a closed session that owns `link`.
    pub fn new(link: L, decoder: D, config: SessionConfig) -> Self {
        Self {
            lifecycle: ReentrantMutex::new(Lifecycle {
                state: Cell::new(SessionState::Closed),
                link: RefCell::new(link),
                sinks: RefCell::new(None),
                dispatcher: RefCell::new(None),
            }),
            send_lock: Mutex::new(()),
            shared: Arc::new(Shared {
                response: ResponseSlot::new(),
                events: EventQueue::new(),
            }),
            decoder: Arc::new(decoder),
            config,
        }
    }

    /// Open the link and start event dispatching.
    ///
    /// `status` receives asynchronous notices (including event decode
    /// failures), `event` receives each decoded event on the dispatch thread
    /// in arrival order, and `log` receives diagnostics from any thread. The
    /// three replace whatever a previous `open` registered.
    ///
    /// Returns only after the dispatch thread is running and able to observe
    /// a stop request.
    pub fn open<S, V, G>(&self, status: S, event: V, log: G) -> Result<()>
    where
        S: Fn(StatusCode, &str) + Send + Sync + 'static,
        V: Fn(D::Event) + Send + Sync + 'static,
        G: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        let lifecycle = self.lifecycle.lock();
        let sinks = Arc::new(Sinks {
            status: Arc::new(status),
            event: Arc::new(event),
            log: Arc::new(log),
        });
        if lifecycle.state.get() != SessionState::Closed {
            return Err(SessionError::AlreadyOpen);
        }
        if lifecycle.dispatcher.borrow().is_some() {
            return Err(SessionError::InvalidState(
                "event dispatch thread already running",
            ));
        }
        let mut link = lifecycle.link()?;
        lifecycle.state.set(SessionState::Opening);
        *lifecycle.sinks.borrow_mut() = Some(Arc::clone(&sinks));

        self.shared.events.mark_stale();
        let on_data: DataHandler = {
            let shared = Arc::clone(&self.shared);
            let sinks = Arc::clone(&sinks);
            Arc::new(move |payload: &[u8]| demultiplex(&shared, &sinks, payload))
        };

        let opened = link.open(Arc::clone(&sinks.status), on_data, Arc::clone(&sinks.log));
        if let Err(err) = opened {
            warn!(error = %err, "link open failed");
            lifecycle.state.set(SessionState::Closed);
            return Err(err.into());
        }

        match self.spawn_dispatcher(&sinks) {
            Ok(dispatcher) => {
                debug!(thread = ?dispatcher.thread, "session open");
                *lifecycle.dispatcher.borrow_mut() = Some(dispatcher);
                lifecycle.state.set(SessionState::Open);
                Ok(())
            }
            Err(err) => {
                if let Err(close_err) = link.close() {
                    warn!(error = %close_err, "link close after failed open also failed");
                }
                lifecycle.state.set(SessionState::Closed);
                Err(err)
            }
        }
    }

    /// Spawn the dispatch thread and wait until it reports ready.
    ///
    /// The queue lock is taken before the spawn and only released inside the
    /// ready wait, which the new thread cannot satisfy before reaching its
    /// own wait loop.
    fn spawn_dispatcher(&self, sinks: &Arc<Sinks<D::Event>>) -> Result<Dispatcher> {
        let events = &self.shared.events;
        let mut queue = events.lock();
        queue.processing = true;
        queue.ready = false;

        let spawned = thread::Builder::new()
            .name("serlink-dispatch".to_string())
            .spawn({
                let shared = Arc::clone(&self.shared);
                let decoder = Arc::clone(&self.decoder);
                let sinks = Arc::clone(sinks);
                move || dispatch::run(&shared.events, &*decoder, &sinks)
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                queue.processing = false;
                error!(error = %err, "failed to spawn event dispatch thread");
                return Err(SessionError::InvalidState(
                    "failed to spawn event dispatch thread",
                ));
            }
        };

        events
            .ready
            .wait_while_for(&mut queue, |queue| !queue.ready, self.config.startup_timeout);
        if !queue.ready {
            queue.processing = false;
            events.wake.notify_all();
            drop(queue);
            error!(
                timeout = ?self.config.startup_timeout,
                "event dispatch thread did not acknowledge startup"
            );
            // The thread leaves its loop as soon as it sees `processing` off;
            // joining keeps it from outliving this open.
            if handle.join().is_err() {
                error!("event dispatch thread panicked during startup");
            }
            return Err(SessionError::InvalidState(
                "event dispatch thread did not acknowledge startup",
            ));
        }

        Ok(Dispatcher {
            thread: handle.thread().id(),
            handle,
        })
    }

    /// Stop event dispatching and close the link.
    ///
    /// When this returns, no event callback is running or will run for this
    /// open. Refused with [`SessionError::InvalidState`] when called from
    /// inside an event callback.
    pub fn close(&self) -> Result<()> {
        let dispatcher = {
            let lifecycle = self.lifecycle.lock();
            if lifecycle.state.get() != SessionState::Open {
                return Err(SessionError::AlreadyClosed);
            }
            if lifecycle.link.try_borrow_mut().is_err() {
                return Err(SessionError::InvalidState(
                    "close called from inside a link call",
                ));
            }
            if lifecycle.dispatch_thread() == Some(thread::current().id()) {
                let sinks = lifecycle.sinks();
                let message = "close called from the event dispatch thread; refusing to join itself";
                warn!("{message}");
                if let Some(sinks) = sinks {
                    sinks.report(LogLevel::Warning, message);
                }
                return Err(SessionError::InvalidState(
                    "close called from the event dispatch thread",
                ));
            }
            lifecycle.state.set(SessionState::Closing);
            let dispatcher = lifecycle.dispatcher.borrow_mut().take();
            dispatcher
        };

        // The lifecycle lock is not held here: an event callback blocked in
        // `send` must be able to observe `Closing` and return.
        self.shared.events.stop();
        let joined = match dispatcher {
            Some(dispatcher) => dispatcher.handle.join().map_err(|_| {
                error!("event dispatch thread panicked");
                SessionError::InvalidState("event dispatch thread could not be joined")
            }),
            None => Ok(()),
        };

        let lifecycle = self.lifecycle.lock();
        let closed = lifecycle.link.borrow_mut().close();
        lifecycle.state.set(SessionState::Closed);
        debug!(pending_events = self.shared.events.len(), "session closed");

        joined?;
        closed.map_err(Into::into)
    }

    /// Send one command tagged with `tag`.
    ///
    /// Without a reply buffer this returns as soon as the link accepted the
    /// payload. With one, it blocks until the response arrives or the
    /// response timeout (measured from the start of this call) expires.
    ///
    /// The reply buffer's length on entry is its capacity. A response that
    /// fits is copied in and the buffer truncated to the response length; a
    /// response that does not fit leaves the buffer unchanged (and is
    /// logged) but still completes the call successfully.
    ///
    /// Concurrent callers are serialized: a second command is only
    /// transmitted once the first call has returned.
    pub fn send(&self, command: &[u8], mut reply: Option<&mut Vec<u8>>, tag: u8) -> Result<()> {
        let lifecycle = self.lifecycle.lock();
        if lifecycle.state.get() != SessionState::Open {
            return Err(SessionError::InvalidState("session is not open"));
        }
        let mut link = lifecycle.link()?;

        let _in_flight = self.send_lock.lock();
        let deadline = Instant::now() + self.config.response_timeout;

        self.shared
            .response
            .arm(reply.as_deref_mut().map(std::mem::take));

        let payload = packet::tagged(tag, command);
        let sent = link.send(&payload);
        drop(link);
        if let Err(err) = sent {
            if let (Some(reply), Some(buffer)) = (reply, self.shared.response.disarm()) {
                *reply = buffer;
            }
            warn!(tag, size = command.len(), error = %err, "link send failed");
            return Err(err.into());
        }
        trace!(tag, size = command.len(), "command sent");

        let Some(reply) = reply else {
            return Ok(());
        };

        let (received, buffer) = self.shared.response.wait_until(deadline);
        if let Some(buffer) = buffer {
            *reply = buffer;
        }

        if !received {
            let timeout = self.config.response_timeout;
            warn!(tag, ?timeout, "failed to receive response for command");
            if let Some(sinks) = lifecycle.sinks() {
                sinks.report(LogLevel::Warning, "failed to receive response for command");
            }
            return Err(SessionError::NoResponse(timeout));
        }
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.lifecycle.lock().state.get()
    }

    /// Whether the session is open.
    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Identity of the running dispatch thread, if any.
    pub fn dispatch_thread(&self) -> Option<ThreadId> {
        self.lifecycle.lock().dispatch_thread()
    }

    /// Raw events queued and not yet dispatched.
    pub fn pending_events(&self) -> usize {
        self.shared.events.len()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl<L: LinkLayer, D: EventDecoder> Drop for Session<L, D> {
    fn drop(&mut self) {
        let on_dispatcher = self.dispatch_thread() == Some(thread::current().id());
        if !on_dispatcher {
            if self.is_open() {
                if let Err(err) = self.close() {
                    warn!(error = %err, "close during drop failed");
                }
            }
            return;
        }

        // Last handle released from inside an event callback: the dispatch
        // thread cannot join itself, so it is told to stop and detached.
        debug!("session dropped on its dispatch thread; detaching");
        self.shared.events.stop();
        let lifecycle = self.lifecycle.get_mut();
        *lifecycle.dispatcher.get_mut() = None;
        if let Err(err) = lifecycle.link.get_mut().close() {
            warn!(error = %err, "link close during drop failed");
        }
        lifecycle.state.set(SessionState::Closed);
    }
}

/// Route one inbound payload by its tag. Runs on the link's reader thread.
fn demultiplex<E>(shared: &Shared, sinks: &Sinks<E>, payload: &[u8]) {
    let Some((&tag, body)) = payload.split_first() else {
        warn!("received empty payload");
        sinks.report(LogLevel::Warning, "received empty payload");
        return;
    };

    match PacketKind::inbound(tag) {
        PacketKind::Response => match shared.response.deliver(body) {
            Delivery::Copied => trace!(size = body.len(), "response delivered"),
            Delivery::TooLarge { capacity } => {
                error!(
                    size = body.len(),
                    capacity, "response larger than the reply buffer; dropped"
                );
                sinks.report(
                    LogLevel::Error,
                    "received response with a packet that is larger than the allocated buffer",
                );
            }
            Delivery::NoBuffer => {
                error!(size = body.len(), "response arrived but command had no reply buffer");
                sinks.report(
                    LogLevel::Error,
                    "received response but command did not provide a buffer for the reply",
                );
            }
        },
        PacketKind::Event => {
            trace!(size = body.len(), "event queued");
            shared.events.push(Bytes::copy_from_slice(body));
        }
        PacketKind::Unknown(tag) => {
            warn!(tag, size = body.len(), "unknown packet tag; discarded");
            sinks.report(
                LogLevel::Warning,
                &format!("unknown packet tag {tag:#04x} received; discarded"),
            );
        }
    }
}
