#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// SIGTERM must end `serve` even while stdin stays open with nothing to read.
#[test]
fn sigterm_exits_while_stdin_is_held_open() {
    let tmp = TempDir::new().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_memory-mcp"))
        .arg("--config")
        .arg(tmp.path().join("absent.toml"))
        .arg("serve")
        .env("MEMORY_MCP_DB", tmp.path().join("memories.db"))
        .env("MEMORY_MCP_LOG_LEVEL", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // One round trip proves the server is up and its signal handler installed.
    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
        .unwrap();
    stdin.flush().unwrap();
    let mut reply = String::new();
    BufReader::new(child.stdout.take().unwrap())
        .read_line(&mut reply)
        .unwrap();
    assert!(reply.contains("\"id\":1"));

    let status = Command::new("kill")
        .arg("-TERM")
        .arg(child.id().to_string())
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break Some(exit);
        }
        if Instant::now() > deadline {
            break None;
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    // stdin is still open here; the exit must not depend on EOF.
    drop(stdin);
    if exit.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
    assert!(exit.expect("server still running after SIGTERM").success());
}
