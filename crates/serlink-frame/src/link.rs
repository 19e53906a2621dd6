use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serlink_transport::{
    DataHandler, LinkLayer, LinkStream, LogLevel, LogSink, StatusCode, StatusSink,
    TransportError,
};
use tracing::{debug, warn};

use crate::codec::FrameConfig;
use crate::error::FrameError;
use crate::reader::FrameReader;
use crate::writer::FrameWriter;

/// A [`LinkLayer`] that frames payloads over a connected [`LinkStream`].
///
/// A link created with [`FramedLink::connect`] dials its socket path on every
/// `open`, so it can be opened again after `close`. A link created from an
/// already accepted stream can be opened once.
pub struct FramedLink {
    endpoint: Endpoint,
    config: FrameConfig,
    active: Option<Active>,
}

enum Endpoint {
    #[cfg(unix)]
    Path(PathBuf),
    Stream(Option<LinkStream>),
}

struct Active {
    writer: FrameWriter<LinkStream>,
    status: StatusSink,
    closing: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl FramedLink {
    /// A link that connects to the controller socket at `path` on each open.
    #[cfg(unix)]
    pub fn connect(path: impl Into<PathBuf>) -> Self {
        Self::new(Endpoint::Path(path.into()))
    }

    /// A single-use link over an already connected stream.
    pub fn from_stream(stream: LinkStream) -> Self {
        Self::new(Endpoint::Stream(Some(stream)))
    }

    fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            config: FrameConfig::default(),
            active: None,
        }
    }

    /// Override the frame configuration used for subsequent opens.
    pub fn with_config(mut self, config: FrameConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether the link is currently open.
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    fn take_stream(&mut self) -> Result<LinkStream, TransportError> {
        match &mut self.endpoint {
            #[cfg(unix)]
            Endpoint::Path(path) => serlink_transport::UnixDomainSocket::connect(path.as_path()),
            Endpoint::Stream(stream) => stream
                .take()
                .ok_or(TransportError::Exhausted("stream-backed link cannot be reopened")),
        }
    }
}

impl LinkLayer for FramedLink {
    fn open(
        &mut self,
        status: StatusSink,
        on_data: DataHandler,
        log: LogSink,
    ) -> Result<(), TransportError> {
        if self.active.is_some() {
            return Err(TransportError::AlreadyOpen);
        }

        let stream = self.take_stream()?;
        let reader = FrameReader::for_stream(stream.try_clone()?, self.config.clone())?;
        let writer = FrameWriter::for_stream(stream, self.config.clone())?;

        let closing = Arc::new(AtomicBool::new(false));
        let reader = {
            let closing = Arc::clone(&closing);
            let status = Arc::clone(&status);
            thread::Builder::new()
                .name("serlink-link-reader".to_string())
                .spawn(move || read_loop(reader, on_data, status, log, closing))?
        };

        debug!("framed link open");
        status(StatusCode::ConnectionActive, "framed link open");

        self.active = Some(Active {
            writer,
            status,
            closing,
            reader,
        });
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let active = self.active.as_mut().ok_or(TransportError::NotOpen)?;
        active.writer.write_frame(payload).map_err(|err| {
            let message = format!("failed to write frame: {err}");
            warn!(size = payload.len(), error = %err, "framed link send failed");
            (active.status)(StatusCode::PktSendError, &message);
            TransportError::from(err)
        })
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let active = self.active.take().ok_or(TransportError::NotOpen)?;
        active.closing.store(true, Ordering::SeqCst);

        let shutdown = active.writer.get_ref().shutdown();
        if active.reader.thread().id() == thread::current().id() {
            // Closed from a callback on the reader thread; it exits on its
            // next read and cannot join itself.
            debug!("framed link closed from its reader thread; detaching");
        } else if active.reader.join().is_err() {
            warn!("link reader thread panicked");
        }
        debug!("framed link closed");
        shutdown
    }
}

impl Drop for FramedLink {
    fn drop(&mut self) {
        if self.active.is_some() {
            let _ = self.close();
        }
    }
}

fn read_loop(
    mut reader: FrameReader<LinkStream>,
    on_data: DataHandler,
    status: StatusSink,
    log: LogSink,
    closing: Arc<AtomicBool>,
) {
    loop {
        match reader.read_frame() {
            Ok(payload) => on_data(&payload),
            Err(_) if closing.load(Ordering::SeqCst) => break,
            Err(FrameError::ConnectionClosed) => {
                debug!("peer closed the link");
                status(StatusCode::ConnectionLost, "peer closed the link");
                break;
            }
            Err(err) => {
                let message = format!("link read failed: {err}");
                warn!(error = %err, "link read failed");
                log(LogLevel::Error, &message);
                status(StatusCode::IoResourcesUnavailable, &message);
                break;
            }
        }
    }
    debug!("link reader stopped");
}
