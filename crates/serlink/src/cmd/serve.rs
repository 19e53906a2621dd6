use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serlink_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use serlink_session::packet::{self, tag_name, EVENT, RESPONSE};
use serlink_transport::{LinkStream, UnixDomainSocket};

use crate::cmd::{install_ctrlc_handler, parse_duration, ServeArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What the simulated controller emits besides responses.
#[derive(Debug, Clone, Copy)]
struct Behaviour {
    command_events: bool,
    heartbeat: Option<Duration>,
}

pub fn run(args: ServeArgs, _format: OutputFormat) -> CliResult<i32> {
    let behaviour = Behaviour {
        command_events: !args.no_events,
        heartbeat: args.heartbeat.as_deref().map(parse_duration).transpose()?,
    };

    let listener =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    tracing::info!(path = %listener.path().display(), "simulated controller listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        tracing::info!("controller link connected");

        match serve_connection(stream, behaviour, &running) {
            Ok(()) => tracing::info!("controller link closed"),
            Err(err) => tracing::warn!(error = %err, "controller link dropped"),
        }
    }

    Ok(SUCCESS)
}

fn serve_connection(
    stream: LinkStream,
    behaviour: Behaviour,
    running: &AtomicBool,
) -> CliResult<()> {
    let config = FrameConfig {
        read_timeout: Some(POLL_INTERVAL),
        ..FrameConfig::default()
    };
    let read_half = stream
        .try_clone()
        .map_err(|err| transport_error("stream clone failed", err))?;
    let mut reader = FrameReader::for_stream(read_half, config.clone())
        .map_err(|err| frame_error("reader setup failed", err))?;
    let mut writer = FrameWriter::for_stream(stream, config)
        .map_err(|err| frame_error("writer setup failed", err))?;

    let mut heartbeats = 0u64;
    let mut next_heartbeat = behaviour.heartbeat.map(|every| Instant::now() + every);

    while running.load(Ordering::SeqCst) {
        match reader.read_frame() {
            Ok(payload) => {
                for frame in replies(&payload, behaviour) {
                    writer
                        .write_frame(&frame)
                        .map_err(|err| frame_error("reply failed", err))?;
                }
            }
            Err(FrameError::Io(err)) if is_poll_timeout(&err) => {}
            Err(FrameError::ConnectionClosed) => return Ok(()),
            Err(err) => return Err(frame_error("read failed", err)),
        }

        if let (Some(every), Some(due)) = (behaviour.heartbeat, next_heartbeat) {
            if Instant::now() >= due {
                heartbeats += 1;
                let body = serde_json::json!({"kind": "heartbeat", "seq": heartbeats});
                writer
                    .write_frame(&packet::tagged(EVENT, body.to_string().as_bytes()))
                    .map_err(|err| frame_error("heartbeat failed", err))?;
                next_heartbeat = Some(due + every);
            }
        }
    }
    Ok(())
}

/// Frames the controller sends back for one inbound payload.
fn replies(payload: &[u8], behaviour: Behaviour) -> Vec<Vec<u8>> {
    let Some((&tag, body)) = payload.split_first() else {
        tracing::warn!("ignoring empty payload");
        return Vec::new();
    };
    tracing::info!(
        tag,
        tag_name = tag_name(tag),
        size = body.len(),
        "answering command"
    );

    let mut frames = vec![packet::tagged(RESPONSE, body)];
    if behaviour.command_events {
        let event = serde_json::json!({"kind": "command", "tag": tag, "size": body.len()});
        frames.push(packet::tagged(EVENT, event.to_string().as_bytes()));
    }
    frames
}

fn is_poll_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
