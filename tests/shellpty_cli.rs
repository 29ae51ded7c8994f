use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn shellpty_bin() -> &'static str {
    env!("CARGO_BIN_EXE_shellpty")
}

fn run_with_stdin(args: &[&str], input: &[u8]) -> std::process::Output {
    let mut child = Command::new(shellpty_bin())
        .args(args)
        .env_remove("SHELLPTY_COMMAND")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn shellpty");
    child
        .stdin
        .take()
        .expect("piped stdin")
        .write_all(input)
        .expect("write stdin");
    child.wait_with_output().expect("wait for shellpty")
}

#[test]
fn shellpty_help_mentions_pseudoterminal() {
    let output = Command::new(shellpty_bin())
        .arg("--help")
        .output()
        .expect("run shellpty --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("pseudoterminal"));
    assert!(combined.contains("--command"));
}

#[test]
fn shellpty_rejects_empty_command() {
    let output = Command::new(shellpty_bin())
        .args(["--command", ""])
        .output()
        .expect("run shellpty");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--command cannot be empty"));
}

#[test]
fn shellpty_rejects_missing_command() {
    let output = Command::new(shellpty_bin())
        .args(["--command", "/nonexistent/shellpty-missing"])
        .output()
        .expect("run shellpty");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("failed to canonicalize"));
}

#[test]
fn shellpty_relays_piped_input_through_cat() {
    let output = run_with_stdin(&["--command", "/bin/cat"], b"hello\n");
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello\r\n"), "stdout: {stdout:?}");
}

#[test]
fn shellpty_propagates_child_exit_code() {
    let output = run_with_stdin(&["--command", "/bin/sh"], b"exit 7\n");
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

#[test]
fn shellpty_relays_large_piped_input_without_stalling() {
    let lines = 5000;
    let filler = "x".repeat(32);
    let mut input = Vec::new();
    for i in 0..lines {
        input.extend_from_slice(format!("{i:06} {filler}\n").as_bytes());
    }

    let mut child = Command::new(shellpty_bin())
        .args(["--command", "/bin/cat"])
        .env_remove("SHELLPTY_COMMAND")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn shellpty");
    let mut stdin = child.stdin.take().expect("piped stdin");
    let writer = thread::spawn(move || {
        let _ = stdin.write_all(&input);
    });
    let mut stdout = child.stdout.take().expect("piped stdout");
    let reader = thread::spawn(move || {
        let mut collected = Vec::new();
        let _ = stdout.read_to_end(&mut collected);
        collected
    });

    let deadline = Instant::now() + Duration::from_secs(20);
    let status = loop {
        if let Some(status) = child.try_wait().expect("poll shellpty") {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            panic!("shellpty stalled relaying {lines} lines through /bin/cat");
        }
        thread::sleep(Duration::from_millis(20));
    };
    writer.join().expect("stdin writer");
    let stdout = reader.join().expect("stdout reader");

    assert!(status.success(), "status: {status:?}");
    let text = String::from_utf8_lossy(&stdout);
    let last = format!("{:06} {filler}\r\n", lines - 1);
    assert!(text.contains(&last), "missing final line, got {} bytes", stdout.len());
}
