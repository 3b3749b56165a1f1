//! Runs real programs with the built library preloaded.
//!
//! The library has to be built first (`cargo build -p vdi-inception-layer`);
//! each test skips with a message when it is missing.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use vdi_config::testing::TestEnvironment;

const PROXY_VARS: &[&str] = &[
    "http_proxy",
    "HTTP_PROXY",
    "https_proxy",
    "HTTPS_PROXY",
    "all_proxy",
    "ALL_PROXY",
];

fn layer_path() -> Option<PathBuf> {
    // target/debug/deps/preload_test-* -> target/debug
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?.parent()?;
    let so = dir.join("libvdi_inception_layer.so");
    if so.exists() {
        Some(so)
    } else {
        eprintln!("skipping: {} not built", so.display());
        None
    }
}

/// Run `program args...`, with the layer preloaded when `layer` is set;
/// returns the output and the child pid.
fn run(
    layer: Option<&Path>,
    env: &TestEnvironment,
    program: &str,
    args: &[&str],
) -> anyhow::Result<(Output, i32)> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env("VDI_LOG_FORMAT", "minimal")
        .env("VDI_DOWNLOAD_TIMEOUT", "10")
        .env_remove("VDI_LOG")
        .env_remove("VDI_REMOTE_FETCH");
    if let Some(layer) = layer {
        cmd.env("LD_PRELOAD", layer);
    }
    for var in PROXY_VARS {
        cmd.env_remove(var);
    }
    for (k, v) in env.layer_env() {
        cmd.env(k, v);
    }
    let child = cmd
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()?;
    let pid = child.id() as i32;
    Ok((child.wait_with_output()?, pid))
}

fn run_cat(layer: &Path, env: &TestEnvironment, arg: &str) -> anyhow::Result<(Output, i32)> {
    run(Some(layer), env, "cat", &[arg])
}

fn has_python() -> bool {
    let found = Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if !found {
        eprintln!("skipping: python3 not available");
    }
    found
}

/// ctypes bindings shared by the driver scripts; `arg` is the first
/// command-line argument as bytes.
const DRIVER_PRELUDE: &str = r#"
import ctypes, os, sys
libc = ctypes.CDLL(None, use_errno=True)
P = ctypes.c_void_p
libc.fopen.restype = P
libc.fopen.argtypes = [ctypes.c_char_p, ctypes.c_char_p]
libc.fopen64.restype = P
libc.fopen64.argtypes = [ctypes.c_char_p, ctypes.c_char_p]
libc.freopen.restype = P
libc.freopen.argtypes = [ctypes.c_char_p, ctypes.c_char_p, P]
libc.openat.restype = ctypes.c_int
libc.openat.argtypes = [ctypes.c_int, ctypes.c_char_p, ctypes.c_int, ctypes.c_uint]
libc.write.restype = ctypes.c_ssize_t
libc.write.argtypes = [ctypes.c_int, ctypes.c_char_p, ctypes.c_size_t]
arg = sys.argv[1].encode()
"#;

fn run_driver(
    layer: Option<&Path>,
    env: &TestEnvironment,
    body: &str,
    arg: &str,
) -> anyhow::Result<(Output, i32)> {
    let script = format!("{}{}", DRIVER_PRELUDE, body);
    run(layer, env, "python3", &["-c", &script, arg])
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

fn serve_once(body: &'static [u8]) -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let mut seen = Vec::new();
            while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => seen.extend_from_slice(&buf[..n]),
                }
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        }
    });
    Ok(port)
}

#[test]
fn test_local_file_is_logged_and_unchanged() -> anyhow::Result<()> {
    let Some(layer) = layer_path() else {
        return Ok(());
    };
    let env = TestEnvironment::new()?;
    let input = env.create_file("input.txt", b"local contents\n")?;
    let input = input.to_string_lossy().into_owned();

    let (output, pid) = run_cat(&layer, &env, &input)?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout, b"local contents\n");

    let lines = env.log_lines(pid);
    assert!(
        lines.iter().any(|line| {
            let mut tokens = line.split(' ');
            tokens.next().is_some_and(|f| f.starts_with("open")) && tokens.next() == Some(input.as_str())
        }),
        "no open record for {} in {:?}",
        input,
        lines
    );
    assert!(!env.download_dir.exists());
    Ok(())
}

#[test]
fn test_url_is_served_from_download() -> anyhow::Result<()> {
    let Some(layer) = layer_path() else {
        return Ok(());
    };
    let env = TestEnvironment::new()?;
    let port = serve_once(b"served over http\n")?;
    let url = format!("http://127.0.0.1:{}/notes.txt", port);

    let (output, pid) = run_cat(&layer, &env, &url)?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout, b"served over http\n");

    let downloads: Vec<String> = std::fs::read_dir(&env.download_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(downloads.len(), 1);
    assert!(downloads[0].starts_with(&format!("{}.", pid)));
    assert!(downloads[0].ends_with(".notes.txt"));

    // The record keeps the URL the program asked for.
    assert!(env.log_lines(pid).iter().any(|line| line.contains(&url)));
    Ok(())
}

#[test]
fn test_unreachable_url_is_no_such_file() -> anyhow::Result<()> {
    let Some(layer) = layer_path() else {
        return Ok(());
    };
    let env = TestEnvironment::new()?;
    let url = "http://127.0.0.1:1/missing.txt";

    let (output, pid) = run_cat(&layer, &env, url)?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No such file or directory"));
    assert!(output.stdout.is_empty());

    assert!(env.log_lines(pid).iter().any(|line| line.contains(url)));
    let leftovers = std::fs::read_dir(&env.download_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
    Ok(())
}

#[test]
fn test_fopen_errors_match_unwrapped_calls() -> anyhow::Result<()> {
    let Some(layer) = layer_path() else {
        return Ok(());
    };
    if !has_python() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let missing = env.root.join("missing.txt").to_string_lossy().into_owned();
    let body = r#"
missing = libc.fopen(arg, b"r")
e1 = ctypes.get_errno()
isdir = libc.fopen(os.path.dirname(arg), b"w")
e2 = ctypes.get_errno()
print(missing, e1, isdir, e2)
"#;

    let (plain, _) = run_driver(None, &env, body, &missing)?;
    let (layered, pid) = run_driver(Some(layer.as_path()), &env, body, &missing)?;
    assert!(layered.status.success(), "{}", String::from_utf8_lossy(&layered.stderr));
    assert_eq!(stdout_of(&layered), "None 2 None 21");
    assert_eq!(stdout_of(&layered), stdout_of(&plain));

    let lines = env.log_lines(pid);
    assert!(lines.contains(&format!("fopen {} r", missing)), "{:?}", lines);
    Ok(())
}

#[test]
fn test_openat_logs_mode_and_write_logs_count() -> anyhow::Result<()> {
    let Some(layer) = layer_path() else {
        return Ok(());
    };
    if !has_python() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let created = env.root.join("created.txt");
    let created_str = created.to_string_lossy().into_owned();
    let body = r#"
fd = libc.openat(-100, arg, os.O_CREAT | os.O_WRONLY, 0o600)
n = libc.write(fd, b"hello", 5)
print(fd, n)
"#;

    let (output, pid) = run_driver(Some(layer.as_path()), &env, body, &created_str)?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = stdout_of(&output);
    let mut fields = stdout.split(' ');
    let fd = fields.next().unwrap_or_default().to_string();
    assert_eq!(fields.next(), Some("5"));

    assert_eq!(std::fs::read(&created)?, b"hello");
    assert_eq!(std::fs::metadata(&created)?.permissions().mode() & 0o777, 0o600);

    let lines = env.log_lines(pid);
    assert!(
        lines.contains(&format!("openat -100 {} 65::O_WRONLY+O_CREAT 384::0600", created_str)),
        "{:?}",
        lines
    );
    assert!(lines.contains(&format!("write {} 5", fd)), "{:?}", lines);
    Ok(())
}

#[test]
fn test_freopen_null_path_and_fopen64() -> anyhow::Result<()> {
    let Some(layer) = layer_path() else {
        return Ok(());
    };
    if !has_python() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let input = env.create_file("input.txt", b"x")?;
    let input = input.to_string_lossy().into_owned();
    let body = r#"
f = libc.fopen(arg, b"r")
g = libc.freopen(None, b"r", f)
h = libc.fopen64(arg, b"r")
print(hex(f), g is not None, h is not None)
"#;

    let (output, pid) = run_driver(Some(layer.as_path()), &env, body, &input)?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = stdout_of(&output);
    let mut fields = stdout.split(' ');
    let stream = fields.next().unwrap_or_default().to_string();
    assert_eq!(fields.next(), Some("True"));
    assert_eq!(fields.next(), Some("True"));

    let lines = env.log_lines(pid);
    assert!(lines.contains(&format!("freopen (null) r {}", stream)), "{:?}", lines);
    assert!(lines.contains(&format!("fopen64 {} r", input)), "{:?}", lines);
    assert!(!env.download_dir.exists());
    Ok(())
}

#[test]
fn test_unreachable_ftp_fopen_is_enoent() -> anyhow::Result<()> {
    let Some(layer) = layer_path() else {
        return Ok(());
    };
    if !has_python() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let url = "ftp://127.0.0.1:1/z";
    let body = r#"
r = libc.fopen(arg, b"r")
print(r, ctypes.get_errno())
"#;

    let (output, pid) = run_driver(Some(layer.as_path()), &env, body, url)?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_of(&output), "None 2");
    assert!(env.log_lines(pid).contains(&format!("fopen {} r", url)));
    Ok(())
}

#[test]
fn test_unresolvable_symbol_is_logged_before_abort() -> anyhow::Result<()> {
    let Some(layer) = layer_path() else {
        return Ok(());
    };
    if !has_python() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let input = env.create_file("input.txt", b"x")?;
    let input = input.to_string_lossy().into_owned();
    let body = r#"
libc.fopenat.restype = P
libc.fopenat.argtypes = [ctypes.c_int, ctypes.c_char_p, ctypes.c_char_p]
libc.fopenat(-100, arg, b"r")
"#;

    let (output, pid) = run_driver(Some(layer.as_path()), &env, body, &input)?;
    let lines = env.log_lines(pid);
    assert!(lines.contains(&format!("fopenat -100 {} r", input)), "{:?}", lines);
    if !output.status.success() {
        // No later object defines fopenat on glibc.
        assert_eq!(output.status.signal(), Some(libc::SIGABRT));
        assert!(String::from_utf8_lossy(&output.stderr)
            .contains("cannot resolve real symbol 'fopenat'"));
    }
    Ok(())
}
