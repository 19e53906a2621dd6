use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serlink_frame::FramedLink;
use serlink_session::{JsonDecoder, Session, SessionConfig, StatusCode};

use crate::cmd::{install_ctrlc_handler, parse_duration, ListenArgs};
use crate::exit::{session_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::logging::{forward_session_log, forward_status};
use crate::output::{print_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Notice {
    Event(serde_json::Value),
    Lost,
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let deadline = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|d| Instant::now() + d);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (tx, rx) = mpsc::channel();
    let session = Session::new(
        FramedLink::connect(&args.path),
        JsonDecoder::<serde_json::Value>::new(),
        SessionConfig::default(),
    );
    let events_tx = tx.clone();
    session
        .open(
            move |code, message: &str| {
                forward_status(code, message);
                if code == StatusCode::ConnectionLost {
                    let _ = tx.send(Notice::Lost);
                }
            },
            move |event| {
                let _ = events_tx.send(Notice::Event(event));
            },
            forward_session_log,
        )
        .map_err(|err| session_error("connect failed", err))?;

    let outcome = print_events(&rx, &running, args.count, deadline, format);
    if let Err(err) = session.close() {
        tracing::warn!(error = %err, "session close failed");
    }
    outcome
}

fn print_events(
    rx: &mpsc::Receiver<Notice>,
    running: &AtomicBool,
    count: Option<usize>,
    deadline: Option<Instant>,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut printed = 0usize;
    if count == Some(0) {
        return Ok(SUCCESS);
    }

    while running.load(Ordering::SeqCst) {
        let wait = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) => left.min(POLL_INTERVAL),
                None => break,
            },
            None => POLL_INTERVAL,
        };

        match rx.recv_timeout(wait) {
            Ok(Notice::Event(event)) => {
                printed = printed.saturating_add(1);
                print_event(printed, &event, format);
                if count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Ok(Notice::Lost) => {
                return Err(CliError::new(FAILURE, "controller closed the link"));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::debug!(printed, "listen finished");
    Ok(SUCCESS)
}
