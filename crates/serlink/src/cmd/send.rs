use std::fs;

use bytes::Bytes;
use serlink_frame::FramedLink;
use serlink_session::{RawDecoder, Session, SessionConfig};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS};
use crate::logging::{forward_session_log, forward_status};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let body = resolve_body(&args)?;

    let session = Session::new(
        FramedLink::connect(&args.path),
        RawDecoder,
        SessionConfig::default().with_response_timeout(timeout),
    );
    session
        .open(
            forward_status,
            |event: Bytes| tracing::debug!(size = event.len(), "ignoring controller event"),
            forward_session_log,
        )
        .map_err(|err| session_error("connect failed", err))?;

    let result = if args.no_reply {
        session.send(&body, None, args.tag).map(|()| None)
    } else {
        let mut reply = vec![0u8; args.reply_size];
        session
            .send(&body, Some(&mut reply), args.tag)
            .map(|()| Some(reply))
    };

    if let Err(err) = session.close() {
        tracing::warn!(error = %err, "session close failed");
    }

    if let Some(reply) = result.map_err(|err| session_error("send failed", err))? {
        print_reply(args.tag, &reply, format);
    }
    Ok(SUCCESS)
}

fn resolve_body(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

/// Parse hex digits, ignoring whitespace, `:` separators and a `0x` prefix.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::usage("--hex needs an even number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).unwrap_or("");
            u8::from_str_radix(pair, 16)
                .map_err(|_| CliError::usage(format!("--hex has invalid digits: {pair:?}")))
        })
        .collect()
}
