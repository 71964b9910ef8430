use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{FrameError, Result};
use crate::escape::{
    contains_unescaped, escape_param_value, find_unescaped, has_dangling_marker, split_unescaped,
    unescape, ESCAPE_MARKER,
};
use crate::event::Event;

/// Keepalive frame. The device answers any traffic, so an empty frame is enough.
pub const HEARTBEAT: &str = "<>";

const FRAME_OPEN: char = '<';
const FRAME_CLOSE: char = '>';
const PARAMS_SEPARATOR: char = '|';
const SUBADDR_SEPARATOR: char = ':';
const PARAM_SEPARATOR: char = ',';
const KEY_VALUE_SEPARATOR: char = ':';
const QUERY_MARKER: char = '?';

/// Characters that must never appear unescaped in a target or sub-address.
const STRUCTURAL_CHARS: [char; 3] = [FRAME_OPEN, FRAME_CLOSE, PARAMS_SEPARATOR];

/// Characters a parameter key may not contain at all.
const KEY_FORBIDDEN_CHARS: [char; 6] = [':', ',', '|', '<', '>', '?'];

/// Build a command frame.
///
/// Produces `<TARGET[:SUBADDR]|KEY1:VAL1,KEY2:VAL2>` with every value escaped.
/// An empty parameter list omits the `|` section entirely. The line
/// terminator is added by the codec, not here.
///
/// ```text
/// build_frame("UMIX", Some("1.2"), &[("FDRA", "-6.5")]) => "<UMIX:1.2|FDRA:-6.5>"
/// build_frame("SYS", None, &[("IFID", "Companion")])    => "<SYS|IFID:Companion>"
/// ```
pub fn build_frame<K, V>(target: &str, subaddr: Option<&str>, params: &[(K, V)]) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = open_target(target, subaddr)?;

    if !params.is_empty() {
        out.push(PARAMS_SEPARATOR);
        for (idx, (key, value)) in params.iter().enumerate() {
            let key = key.as_ref();
            let value = value.as_ref();
            validate_key(key)?;
            reject_line_breaks("parameter value", value)?;
            if has_dangling_marker(value) {
                return Err(FrameError::InvalidCommand(format!(
                    "parameter value {value:?} has an unpaired `/` before a separator"
                )));
            }
            if idx > 0 {
                out.push(PARAM_SEPARATOR);
            }
            out.push_str(key);
            out.push(KEY_VALUE_SEPARATOR);
            out.push_str(&escape_param_value(value));
        }
    }

    out.push(FRAME_CLOSE);
    Ok(out)
}

/// Build a query frame, `<TARGET[:SUBADDR]?>`.
///
/// The device answers a query with the current state of the object, e.g.
/// `<SYS?>` yields a `SYS` system-info frame.
pub fn build_query(target: &str, subaddr: Option<&str>) -> Result<String> {
    let mut out = open_target(target, subaddr)?;
    out.push(QUERY_MARKER);
    out.push(FRAME_CLOSE);
    Ok(out)
}

fn open_target(target: &str, subaddr: Option<&str>) -> Result<String> {
    if target.is_empty() {
        return Err(FrameError::InvalidCommand("target must not be empty".into()));
    }
    validate_address("target", target)?;
    if let Some(subaddr) = subaddr {
        if subaddr.is_empty() {
            return Err(FrameError::InvalidCommand(
                "sub-address must not be empty when present".into(),
            ));
        }
        validate_address("sub-address", subaddr)?;
    }

    let mut out = String::with_capacity(target.len() + 32);
    out.push(FRAME_OPEN);
    out.push_str(target);
    if let Some(subaddr) = subaddr {
        out.push(SUBADDR_SEPARATOR);
        out.push_str(subaddr);
    }
    Ok(out)
}

fn validate_address(what: &str, value: &str) -> Result<()> {
    reject_line_breaks(what, value)?;
    if contains_unescaped(value, &STRUCTURAL_CHARS) {
        return Err(FrameError::InvalidCommand(format!(
            "{what} {value:?} contains an unescaped frame delimiter"
        )));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(FrameError::InvalidCommand(
            "parameter key must not be empty".into(),
        ));
    }
    reject_line_breaks("parameter key", key)?;
    if key.contains(&KEY_FORBIDDEN_CHARS[..]) {
        return Err(FrameError::InvalidCommand(format!(
            "parameter key {key:?} contains a reserved character"
        )));
    }
    Ok(())
}

fn reject_line_breaks(what: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(FrameError::InvalidCommand(format!(
            "{what} must not contain line breaks"
        )));
    }
    Ok(())
}

/// Parse one inbound frame.
///
/// Never fails: the device does not guarantee well-bracketed output, so
/// missing brackets are tolerated and parameter tokens without a `:` are
/// dropped. Input that does not classify as a known frame type becomes an
/// [`EventKind::Unrecognized`](crate::EventKind::Unrecognized) event.
pub fn parse_frame(raw: &str) -> Event {
    let body = strip_brackets(raw.trim());

    let (target, param_string) = match find_unescaped(body, PARAMS_SEPARATOR) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };

    let (frame_type, subaddr) = match target.find(SUBADDR_SEPARATOR) {
        Some(idx) => (&target[..idx], Some(&target[idx + 1..])),
        None => (target, None),
    };
    let subaddr = subaddr
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut params = BTreeMap::new();
    if let Some(param_string) = param_string {
        for token in split_unescaped(param_string, PARAM_SEPARATOR) {
            match parse_param(token) {
                Ok((key, value)) => {
                    params.insert(key.to_string(), value);
                }
                Err(err) => {
                    debug!(frame = raw, %err, "dropping parameter token");
                }
            }
        }
    }

    Event::new(frame_type.trim(), subaddr, params)
}

fn strip_brackets(body: &str) -> &str {
    let body = body.strip_prefix(FRAME_OPEN).unwrap_or(body);
    match body.strip_suffix(FRAME_CLOSE) {
        Some(inner) if trailing_markers(inner) % 2 == 0 => inner,
        _ => body,
    }
}

fn trailing_markers(s: &str) -> usize {
    s.chars().rev().take_while(|&c| c == ESCAPE_MARKER).count()
}

fn parse_param(token: &str) -> Result<(&str, String)> {
    let token = token.trim();
    let idx = find_unescaped(token, KEY_VALUE_SEPARATOR).ok_or_else(|| {
        FrameError::MalformedFrame(format!("parameter {token:?} has no key/value separator"))
    })?;
    let key = token[..idx].trim();
    if key.is_empty() {
        return Err(FrameError::MalformedFrame(format!(
            "parameter {token:?} has an empty key"
        )));
    }
    Ok((key, unescape(&token[idx + 1..])))
}
