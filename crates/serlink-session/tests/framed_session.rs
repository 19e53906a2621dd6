//! Session over a real framed link with a scripted controller on the far end.

#![cfg(unix)]

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use serlink_frame::{FrameReader, FrameWriter, FramedLink};
use serlink_session::{
    packet, JsonDecoder, RawDecoder, Session, SessionConfig, SessionError, SessionState,
    StatusCode, COMMAND, EVENT, RESPONSE,
};
use serlink_transport::LinkStream;

/// Answer every command with its own body and follow it with an event
/// carrying the command tag.
fn spawn_controller(stream: LinkStream, rounds: usize) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = FrameReader::new(stream.try_clone().unwrap());
        let mut writer = FrameWriter::new(stream);
        for _ in 0..rounds {
            let payload = reader.read_frame().unwrap();
            let (tag, body) = payload.split_first().unwrap();
            writer.write_frame(&packet::tagged(RESPONSE, body)).unwrap();
            writer.write_frame(&[EVENT, *tag]).unwrap();
        }
    })
}

#[test]
fn commands_and_events_share_one_stream() {
    let (local, remote) = LinkStream::pair().unwrap();
    let controller = spawn_controller(remote, 3);

    let session = Session::new(
        FramedLink::from_stream(local),
        RawDecoder,
        SessionConfig::default(),
    );
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    session
        .open(
            |_, _| {},
            move |event: Bytes| {
                let _ = tx.lock().unwrap().send(event);
            },
            |_, _| {},
        )
        .unwrap();

    for (i, tag) in [COMMAND, packet::DTM_COMMAND, packet::RESET_COMMAND]
        .into_iter()
        .enumerate()
    {
        let body = vec![i as u8; 4 + i];
        let mut reply = vec![0u8; 16];
        session.send(&body, Some(&mut reply), tag).unwrap();
        assert_eq!(reply, body);

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.as_ref(), &[tag]);
    }

    controller.join().unwrap();
    session.close().unwrap();
}

#[test]
fn controller_hangup_is_reported_and_close_still_succeeds() {
    let (local, remote) = LinkStream::pair().unwrap();
    let session = Session::new(
        FramedLink::from_stream(local),
        RawDecoder,
        SessionConfig::default().with_response_timeout(Duration::from_millis(100)),
    );
    let notices = Arc::new(Mutex::new(Vec::new()));
    {
        let notices = Arc::clone(&notices);
        session
            .open(
                move |code, _| notices.lock().unwrap().push(code),
                |_event: Bytes| {},
                |_, _| {},
            )
            .unwrap();
    }

    drop(remote);
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !notices.lock().unwrap().contains(&StatusCode::ConnectionLost) {
        assert!(std::time::Instant::now() < deadline, "no ConnectionLost notice");
        thread::sleep(Duration::from_millis(5));
    }

    let mut reply = vec![0u8; 4];
    let result = session.send(b"ping", Some(&mut reply), COMMAND);
    assert!(result.is_err());
    session.close().unwrap();
}

#[derive(Debug, Deserialize, PartialEq)]
struct ScanReport {
    address: String,
    rssi: i8,
}

#[test]
fn json_events_are_decoded_on_the_dispatch_thread() {
    let (local, remote) = LinkStream::pair().unwrap();
    let session = Session::new(
        FramedLink::from_stream(local),
        JsonDecoder::<ScanReport>::new(),
        SessionConfig::default(),
    );
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let decode_failures = Arc::new(Mutex::new(0usize));
    {
        let decode_failures = Arc::clone(&decode_failures);
        session
            .open(
                move |code, _| {
                    if code == StatusCode::PktDecodeError {
                        *decode_failures.lock().unwrap() += 1;
                    }
                },
                move |report: ScanReport| {
                    let _ = tx.lock().unwrap().send(report);
                },
                |_, _| {},
            )
            .unwrap();
    }

    let mut controller = FrameWriter::new(remote);
    controller.write_frame(b"\x02{not json").unwrap();
    controller
        .write_frame(&packet::tagged(
            EVENT,
            br#"{"address":"C0:FF:EE:00:00:01","rssi":-61}"#,
        ))
        .unwrap();

    let report = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        report,
        ScanReport {
            address: "C0:FF:EE:00:00:01".to_string(),
            rssi: -61,
        }
    );
    assert_eq!(*decode_failures.lock().unwrap(), 1);
    session.close().unwrap();
}

#[test]
fn reply_buffer_too_small_is_not_an_error() {
    let (local, remote) = LinkStream::pair().unwrap();
    let controller = spawn_controller(remote, 1);
    let session = Session::new(
        FramedLink::from_stream(local),
        RawDecoder,
        SessionConfig::default(),
    );
    let errors = Arc::new(Mutex::new(Vec::new()));
    {
        let errors = Arc::clone(&errors);
        session
            .open(
                |_, _| {},
                |_event: Bytes| {},
                move |level, msg: &str| {
                    if level == serlink_session::LogLevel::Error {
                        errors.lock().unwrap().push(msg.to_string());
                    }
                },
            )
            .unwrap();
    }

    let mut reply = vec![0u8; 2];
    session.send(b"longer than two", Some(&mut reply), COMMAND).unwrap();
    assert_eq!(reply, vec![0u8; 2]);

    // Logged by the link's reader thread after the waiter was released.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while errors.lock().unwrap().is_empty() {
        assert!(std::time::Instant::now() < deadline, "oversized response not logged");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(errors.lock().unwrap().len(), 1);

    controller.join().unwrap();
    session.close().unwrap();
}

#[test]
fn send_after_close_is_rejected() {
    let (local, _remote) = LinkStream::pair().unwrap();
    let session = Session::new(
        FramedLink::from_stream(local),
        RawDecoder,
        SessionConfig::default(),
    );
    session.open(|_, _| {}, |_event: Bytes| {}, |_, _| {}).unwrap();
    session.close().unwrap();

    assert!(matches!(
        session.send(b"x", None, COMMAND),
        Err(SessionError::InvalidState(_))
    ));
    // A stream-backed link cannot be dialled again.
    assert!(matches!(
        session.open(|_, _| {}, |_event: Bytes| {}, |_, _| {}),
        Err(SessionError::Link(_))
    ));
}

#[test]
fn status_sink_can_query_the_session_during_open() {
    let (local, _remote) = LinkStream::pair().unwrap();
    let session = Arc::new(Session::new(
        FramedLink::from_stream(local),
        RawDecoder,
        SessionConfig::default(),
    ));
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let weak = Arc::downgrade(&session);
        let seen = Arc::clone(&seen);
        session
            .open(
                move |code, _| {
                    if code != StatusCode::ConnectionActive {
                        return;
                    }
                    if let Some(session) = weak.upgrade() {
                        let refused = session.send(b"early", None, COMMAND).is_err();
                        seen.lock().unwrap().push((session.state(), refused));
                    }
                },
                |_event: Bytes| {},
                |_, _| {},
            )
            .unwrap();
    }

    assert_eq!(*seen.lock().unwrap(), vec![(SessionState::Opening, true)]);
    assert_eq!(session.state(), SessionState::Open);
    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn status_sink_can_close_the_session_on_connection_lost() {
    let (local, remote) = LinkStream::pair().unwrap();
    let session = Arc::new(Session::new(
        FramedLink::from_stream(local),
        RawDecoder,
        SessionConfig::default(),
    ));
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    {
        let weak = Arc::downgrade(&session);
        session
            .open(
                move |code, _| {
                    if code != StatusCode::ConnectionLost {
                        return;
                    }
                    if let Some(session) = weak.upgrade() {
                        let _ = tx.lock().unwrap().send(session.close());
                    }
                },
                |_event: Bytes| {},
                |_, _| {},
            )
            .unwrap();
    }

    drop(remote);
    let closed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(closed.is_ok(), "{closed:?}");
    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(session.close(), Err(SessionError::AlreadyClosed)));
}
