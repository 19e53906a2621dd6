use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serlink_session::packet::tag_name;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    kind: &'static str,
    tag: u8,
    tag_name: &'static str,
    size: usize,
    hex: String,
    text: Option<&'a str>,
    timestamp: String,
}

#[derive(Serialize)]
struct EventOutput<'a> {
    kind: &'static str,
    seq: usize,
    event: &'a serde_json::Value,
    timestamp: String,
}

/// Print the response to the command sent with `tag`.
pub fn print_reply(tag: u8, body: &[u8], format: OutputFormat) {
    let text = std::str::from_utf8(body).ok();
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                kind: "response",
                tag,
                tag_name: tag_name(tag),
                size: body.len(),
                hex: hex_string(body),
                text,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "SIZE", "REPLY"])
                .add_row(vec![
                    format!("{} ({tag})", tag_name(tag)),
                    body.len().to_string(),
                    payload_preview(body),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "response to {} ({tag}) size={} reply={}",
                tag_name(tag),
                body.len(),
                payload_preview(body)
            );
        }
        OutputFormat::Raw => print_raw(body),
    }
}

/// Print one decoded event. `seq` counts from 1.
pub fn print_event(seq: usize, event: &serde_json::Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                kind: "event",
                seq,
                event,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "KIND", "EVENT"])
                .add_row(vec![
                    seq.to_string(),
                    event_kind(event).to_string(),
                    event.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("event #{seq} kind={} {event}", event_kind(event));
        }
        OutputFormat::Raw => {
            print_raw(event.to_string().as_bytes());
            print_raw(b"\n");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn event_kind(event: &serde_json::Value) -> &str {
    event
        .get("kind")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("-")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes: {}>", payload.len(), hex_string(payload)),
    }
}

pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
