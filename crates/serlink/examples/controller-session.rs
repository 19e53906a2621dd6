//! Talk to a controller: send a few commands and print the events it emits.
//!
//! Start a simulated controller first:
//!   cargo run --features cli -- serve /tmp/serlink-demo.sock --heartbeat 1s
//!
//! Then run:
//!   cargo run --example controller-session -- /tmp/serlink-demo.sock

use std::time::Duration;

use serlink::frame::FramedLink;
use serlink::session::{packet, JsonDecoder, Session, SessionConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/tmp/serlink-demo.sock".to_string());

    let session = Session::new(
        FramedLink::connect(&path),
        JsonDecoder::<serde_json::Value>::new(),
        SessionConfig::default().with_response_timeout(Duration::from_secs(2)),
    );
    session.open(
        |code, msg| eprintln!("status {code}: {msg}"),
        |event| println!("event: {event}"),
        |level, msg| eprintln!("[{level}] {msg}"),
    )?;

    for (tag, body) in [
        (packet::COMMAND, b"hello".as_slice()),
        (packet::DTM_COMMAND, b"\x01\x02\x03".as_slice()),
    ] {
        let mut reply = vec![0u8; 64];
        session.send(body, Some(&mut reply), tag)?;
        println!("{} -> {:02x?}", packet::tag_name(tag), reply);
    }

    session.send(b"", None, packet::RESET_COMMAND)?;
    std::thread::sleep(Duration::from_millis(500));
    session.close()?;
    Ok(())
}
