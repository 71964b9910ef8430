use bladelink::frame::DEFAULT_MAX_LINE_LENGTH;
use bladelink::session::SessionConfig;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

/// Package version plus the session defaults this build dials with.
#[derive(Serialize)]
struct VersionReport {
    name: &'static str,
    version: &'static str,
    default_port: u16,
    heartbeat_interval_ms: u128,
    heartbeat_timeout_ms: u128,
    reconnect_delay_ms: u128,
    connect_timeout_ms: u128,
    max_line_length: usize,
    platform: String,
}

impl VersionReport {
    fn current() -> Self {
        let defaults = SessionConfig::default();
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            default_port: defaults.port,
            heartbeat_interval_ms: defaults.heartbeat_interval.as_millis(),
            heartbeat_timeout_ms: defaults.heartbeat_timeout.as_millis(),
            reconnect_delay_ms: defaults.reconnect_delay.as_millis(),
            connect_timeout_ms: defaults.connect_timeout.as_millis(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            platform: format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("default_port", self.default_port.to_string()),
            ("heartbeat_interval", format!("{}ms", self.heartbeat_interval_ms)),
            ("heartbeat_timeout", format!("{}ms", self.heartbeat_timeout_ms)),
            ("reconnect_delay", format!("{}ms", self.reconnect_delay_ms)),
            ("connect_timeout", format!("{}ms", self.connect_timeout_ms)),
            ("max_line_length", self.max_line_length.to_string()),
            ("platform", self.platform.clone()),
        ]
    }
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let report = VersionReport::current();
    if !args.extended {
        println!("{} {}", report.name, report.version);
        return Ok(SUCCESS);
    }

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["KEY", "VALUE"]);
            table.add_row(vec!["version".to_string(), report.version.to_string()]);
            for (key, value) in report.rows() {
                table.add_row(vec![key.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("{} {}", report.name, report.version);
            for (key, value) in report.rows() {
                println!("{key}: {value}");
            }
        }
    }
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_reflects_session_defaults() {
        let report = VersionReport::current();
        assert_eq!(report.name, "bladelink");
        assert_eq!(report.default_port, 93);
        assert_eq!(report.heartbeat_interval_ms, 1000);
        assert_eq!(report.max_line_length, 64 * 1024);
        assert!(report
            .rows()
            .iter()
            .any(|(key, value)| *key == "reconnect_delay" && value == "5000ms"));
    }
}
