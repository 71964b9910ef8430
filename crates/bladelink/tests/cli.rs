#![cfg(feature = "cli")]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::process::{Command, Stdio};
use std::thread;

fn bladelink() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_bladelink"));
    command
        .env_remove("BLADELINK_HOST")
        .env_remove("BLADELINK_PORT")
        .env_remove("BLADELINK_LOG")
        .arg("--log-level")
        .arg("error");
    command
}

#[test]
fn encode_prints_escaped_frame() {
    let output = bladelink()
        .args(["--format", "raw", "encode", "--target", "SYS"])
        .args(["--param", "IFID=Studio|A"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "<SYS|IFID:Studio/|A>"
    );
}

#[test]
fn encode_rejects_frame_breaking_target() {
    let output = bladelink()
        .args(["encode", "--target", "UM<IX"])
        .output()
        .expect("encode should run");

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid command"));
}

#[test]
fn decode_prints_json_event() {
    let output = bladelink()
        .args(["--format", "json", "decode", "<UMIXEVENT:1.2|ON:1,FDRA:-6.5>"])
        .output()
        .expect("decode should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"record\":\"event\""));
    assert!(stdout.contains("\"kind\":\"mixer_update\""));
    assert!(stdout.contains("\"subaddr\":\"1.2\""));
    assert!(stdout.contains("\"FDRA\":\"-6.5\""));
}

#[test]
fn decode_reads_stdin_lines() {
    let mut child = bladelink()
        .args(["--format", "pretty", "decode"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("decode should start");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"<SYS|NAME:Blade03>\r\n\r\n<OK>\r\n")
        .expect("stdin write should succeed");

    let output = child.wait_with_output().expect("decode should finish");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("kind=system_info type=SYS"));
    assert!(lines[1].starts_with("kind=unrecognized type=OK"));
}

#[test]
fn decode_reads_latin1_stdin() {
    let mut child = bladelink()
        .args(["--format", "json", "decode"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("decode should start");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"<SRC:00400001|NAME:Caf\xe9>\r\n")
        .expect("stdin write should succeed");

    let output = child.wait_with_output().expect("decode should finish");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("json output is utf-8");
    assert!(stdout.contains("\"NAME\":\"Caf\u{e9}\""), "stdout: {stdout}");
}

#[test]
fn version_extended_reports_session_defaults() {
    let output = bladelink()
        .args(["--format", "json", "version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"default_port\":93"));
    assert!(stdout.contains("\"heartbeat_interval_ms\":1000"));
}

#[test]
fn version_prints_package_version() {
    let output = bladelink()
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("bladelink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn send_writes_command_and_prints_reply() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let port = listener.local_addr().expect("local addr").port();

    let device = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("bladelink should connect");
        let mut writer = stream.try_clone().expect("clone stream");
        let mut lines = BufReader::new(stream).lines();
        let command = loop {
            let line = lines
                .next()
                .expect("command should arrive")
                .expect("read should succeed");
            if line != "<>" {
                break line;
            }
        };
        writer
            .write_all(b"<UMIX:1.2|ON:1>\r\n")
            .expect("reply should be written");
        // Drain until the client hangs up.
        for _ in lines.by_ref() {}
        command
    });

    let output = bladelink()
        .args(["--format", "json", "send", "--host", "127.0.0.1"])
        .args(["--port", &port.to_string()])
        .args(["--target", "UMIX", "--subaddr", "1.2", "--param", "ON=1"])
        .args(["--wait", "--wait-timeout", "5s"])
        .output()
        .expect("send should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"kind\":\"mixer_update\""));
    assert!(stdout.contains("\"ON\":\"1\""));
    assert_eq!(device.join().expect("device thread"), "<UMIX:1.2|ON:1>");
}

#[test]
fn send_to_closed_port_returns_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        listener.local_addr().expect("local addr").port()
    };

    let output = bladelink()
        .args(["send", "--host", "127.0.0.1", "--port", &port.to_string()])
        .args(["--target", "SYS", "--query"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn invalid_heartbeat_settings_are_usage_errors() {
    let output = bladelink()
        .args(["send", "--host", "127.0.0.1", "--heartbeat", "30s"])
        .args(["--target", "SYS", "--query"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
}
