use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use bladelink::frame::{build_frame, Event};
use bladelink::session::{ConnectionState, Status};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

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

/// JSON lines carry a `record` tag so event and status lines can share one
/// stream (`monitor`).
#[derive(Serialize)]
struct EventOutput<'a> {
    record: &'static str,
    #[serde(flatten)]
    event: &'a Event,
    timestamp: String,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    record: &'static str,
    state: ConnectionState,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    timestamp: String,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    record: &'static str,
    frame: &'a str,
}

pub fn print_event(event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                record: "event",
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
                .set_header(vec!["KIND", "TYPE", "SUBADDR", "PARAMS"])
                .add_row(vec![
                    event.kind.to_string(),
                    event.frame_type.clone(),
                    event.subaddr.clone().unwrap_or_default(),
                    params_preview(event),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} type={} subaddr={} params={}",
                event.kind,
                event.frame_type,
                event.subaddr.as_deref().unwrap_or("-"),
                params_preview(event)
            );
        }
        OutputFormat::Raw => {
            println!("{}", wire_form(event));
        }
    }
}

pub fn print_status(
    state: ConnectionState,
    status: Status,
    message: Option<&str>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = StatusOutput {
                record: "status",
                state,
                status,
                message,
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
                .set_header(vec!["STATE", "STATUS", "MESSAGE"])
                .add_row(vec![
                    state.to_string(),
                    status.to_string(),
                    message.unwrap_or_default().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match message {
            Some(message) => println!("state={state} status={status} message={message}"),
            None => println!("state={state} status={status}"),
        },
        // Raw output carries frames only.
        OutputFormat::Raw => {}
    }
}

/// Print an outbound wire frame.
pub fn print_frame(frame: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                record: "frame",
                frame,
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
                .set_header(vec!["FRAME"])
                .add_row(vec![frame]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => println!("{frame}"),
    }
}

fn params_preview(event: &Event) -> String {
    event
        .params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Re-encode an event for raw output. Falls back to the bare type tag when the
/// parsed pieces cannot be framed again.
fn wire_form(event: &Event) -> String {
    let params: Vec<(&str, &str)> = event
        .params
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    build_frame(&event.frame_type, event.subaddr.as_deref(), &params)
        .unwrap_or_else(|_| format!("<{}>", event.frame_type))
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
