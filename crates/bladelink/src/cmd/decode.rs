use std::io::{self, Read};

use bladelink::frame::{parse_frame, BladeCodec, FrameError};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::warn;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

const READ_CHUNK: usize = 8 * 1024;

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.frames.is_empty() {
        for frame in &args.frames {
            print_event(&parse_frame(frame), format);
        }
        return Ok(SUCCESS);
    }

    read_frames(io::stdin().lock(), |line| {
        print_event(&parse_frame(&line), format)
    })?;
    Ok(SUCCESS)
}

/// Split a byte capture into frame lines with the wire codec, so Latin-1
/// bytes and oversized lines are handled the same way as on a live link.
fn read_frames<R: Read>(mut reader: R, mut on_frame: impl FnMut(String)) -> CliResult<()> {
    let mut codec = BladeCodec::new();
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("reading stdin failed", err)),
        };
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        drain(&mut codec, &mut buffer, &mut on_frame, false)?;
    }
    drain(&mut codec, &mut buffer, &mut on_frame, true)
}

fn drain(
    codec: &mut BladeCodec,
    buffer: &mut BytesMut,
    on_frame: &mut impl FnMut(String),
    eof: bool,
) -> CliResult<()> {
    loop {
        let decoded = if eof {
            codec.decode_eof(buffer)
        } else {
            codec.decode(buffer)
        };
        match decoded {
            Ok(Some(line)) => on_frame(line),
            Ok(None) => return Ok(()),
            Err(err @ FrameError::LineTooLong { .. }) => {
                warn!(error = %err, "skipping oversized line");
            }
            Err(err) => return Err(frame_error("decoding stdin failed", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(capture: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        read_frames(capture, |line| out.push(line)).unwrap();
        out
    }

    #[test]
    fn reads_latin1_capture() {
        let lines = frames(b"<SRC:1|NAME:Caf\xe9>\r\n\r\n<SYS|NAME:Blade03>");
        assert_eq!(lines.len(), 2);
        assert_eq!(parse_frame(&lines[0]).param("NAME"), Some("Caf\u{e9}"));
        assert_eq!(lines[1], "<SYS|NAME:Blade03>");
    }

    #[test]
    fn skips_oversized_line_and_continues() {
        let mut capture = b"<SRC:1|NAME:".to_vec();
        capture.resize(capture.len() + 70 * 1024, b'x');
        capture.extend_from_slice(b">\r\n<OK>\r\n");
        assert_eq!(frames(&capture), vec!["<OK>".to_string()]);
    }
}
