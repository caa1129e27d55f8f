use assert_cmd::Command;
use std::io::{Read, Write};
use std::net::{TcpListener, UdpSocket};
use std::process::{Child, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const NO_CONFIG: &str = "/nonexistent/relaycat/config.toml";

fn relaycat() -> Command {
    let mut cmd = Command::cargo_bin("relaycat").unwrap();
    // Keep a developer's config file out of the way.
    cmd.arg("--config").arg(NO_CONFIG);
    cmd
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> ExitStatus {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("relaycat did not exit within {limit:?}");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn closed_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[test]
fn no_arguments_exits_with_one() {
    relaycat().assert().code(1);
}

#[test]
fn connect_needs_host_and_port() {
    relaycat().arg("localhost").assert().code(1);
}

#[test]
fn listen_takes_exactly_one_port() {
    relaycat().args(["-l", "localhost", "4000"]).assert().code(1);
}

#[test]
fn non_integer_port_exits_with_one() {
    relaycat().args(["localhost", "http"]).assert().code(1);
}

#[test]
fn non_integer_source_port_exits_with_one() {
    relaycat().args(["-p", "abc", "localhost", "80"]).assert().code(1);
}

#[test]
fn help_exits_cleanly() {
    relaycat().arg("--help").assert().success();
}

#[test]
fn refused_connection_exits_with_one() {
    let port = closed_port();
    let output = relaycat()
        .args(["127.0.0.1", &port.to_string()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to connect"), "stderr: {stderr}");
}

#[test]
fn relays_stdin_to_tcp_peer_and_exits_on_eof() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (mut conn, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        conn.read_to_end(&mut received).unwrap();
        received
    });

    let output = relaycat()
        .args(["127.0.0.1", &port.to_string()])
        .write_stdin("ping")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    // Diagnostics never land on stdout.
    assert!(output.stdout.is_empty());
    assert_eq!(server.join().unwrap(), b"ping");
}

#[test]
fn relays_stdin_to_udp_peer() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    server.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    let port = server.local_addr().unwrap().port();

    let output = relaycat()
        .args(["-u", "127.0.0.1", &port.to_string()])
        .write_stdin("hello")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let mut buf = [0u8; 64];
    let (n, _) = server.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello");
}

#[test]
fn stdout_write_failure_exits_with_one() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_relaycat"))
        .args(["--config", NO_CONFIG, "127.0.0.1", &port.to_string()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    // Nobody will ever read stdout; stdin stays open so input never ends.
    drop(child.stdout.take());
    let _stdin = child.stdin.take();

    let (mut conn, _) = listener.accept().unwrap();
    conn.write_all(b"payload").unwrap();

    let status = wait_with_deadline(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(1));
}

#[test]
fn verbose_run_reports_loaded_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[relay]\nbuffer_size = 2048").unwrap();
    let port = closed_port();

    let output = Command::cargo_bin("relaycat")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("-v")
        .arg("--config")
        .arg(file.path())
        .args(["127.0.0.1", &port.to_string()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loaded config"), "stderr: {stderr}");
}
