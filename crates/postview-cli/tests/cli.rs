use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    if let Some(path) = env::var_os("CARGO_BIN_EXE_postview") {
        return PathBuf::from(path);
    }
    let exe = env::current_exe().expect("current exe");
    let mut debug_dir = exe.as_path();
    while let Some(parent) = debug_dir.parent() {
        if parent.file_name().and_then(|name| name.to_str()) == Some("debug") {
            let candidate = parent.join("postview");
            if candidate.exists() {
                return candidate;
            }
        }
        debug_dir = parent;
    }
    panic!("binary path missing");
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let mut path = env::temp_dir();
    let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("time");
    let file_name = format!(
        "postview_cli_{}_{}_{}.html",
        name,
        now.as_secs(),
        now.subsec_nanos()
    );
    path.push(file_name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env_remove("POSTVIEW_API_URL")
        .env_remove("POSTVIEW_IMAGE_SIZE")
        .env_remove("RUST_LOG")
        .output()
        .expect("run")
}

#[test]
fn escaped_markup_renders_as_real_markup() {
    let input = temp_file("escaped", "&lt;h2&gt;Title&lt;/h2&gt;&lt;p&gt;Body&lt;/p&gt;");
    let output = run(&[input.to_str().expect("path")]);

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<h2>Title</h2>"), "got {stdout}");
    assert!(stdout.contains("<p>Body</p>"));
}

#[test]
fn api_base_flag_rewrites_images() {
    let input = temp_file("image", "<p><img src=\"/api/v1/blog/images/abc\"></p>");
    let output = run(&[
        "--api-base",
        "https://api.example.com/",
        input.to_str().expect("path"),
    ]);

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("src=\"https://api.example.com/api/v1/blog/images/abc\""));
}

#[test]
fn diagnostics_json_reports_sanitized_content() {
    let input = temp_file("script", "<script>alert(1)</script>");
    let output = run(&["--diagnostics", "json", input.to_str().expect("path")]);

    assert!(output.status.success(), "content problems are not fatal");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stdout.trim(), "<p></p>");
    assert!(
        stderr.contains("\"code\": \"W_SANITIZED_EMPTY\""),
        "expected W_SANITIZED_EMPTY in stderr"
    );
}

#[test]
fn toc_json_lists_headings() {
    let input = temp_file("toc", "<h2>Intro</h2><h3>Detail</h3><h2>End</h2>");
    let output = run(&["--toc", "json", input.to_str().expect("path")]);

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let toc: serde_json::Value = serde_json::from_str(&stdout).expect("toc json");
    assert_eq!(toc[0]["entry"]["id"], "heading-0");
    assert_eq!(toc[0]["children"][0]["entry"]["text"], "Detail");
    assert_eq!(toc[1]["entry"]["level"], 2);
}

#[test]
fn standalone_wraps_page_with_assets() {
    let input = temp_file(
        "standalone",
        "<h2>One</h2><pre><code class=\"language-rust\">let x = 1;</code></pre><h2>Two</h2>",
    );
    let output = run(&["--standalone", "--theme", "dark", input.to_str().expect("path")]);

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<!DOCTYPE html>"), "expected HTML wrapper");
    assert!(stdout.contains("<style>"), "expected inline CSS");
    assert!(stdout.contains("class=\"postview-toc\""));
    assert!(stdout.contains("data-highlighted=\"yes\""));
}

#[test]
fn no_highlight_leaves_code_untouched() {
    let input = temp_file("plain", "<pre><code class=\"language-rust\">let x = 1;</code></pre>");
    let output = run(&["--no-highlight", input.to_str().expect("path")]);

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("data-highlighted"));
}

#[test]
fn bad_theme_is_a_usage_error() {
    let output = run(&["--theme", "sepia"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn bad_api_base_is_a_usage_error() {
    let input = temp_file("bad_base", "text");
    let output = run(&["--api-base", "ftp://x", input.to_str().expect("path")]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_input_file_exits_with_io_error() {
    let output = run(&["/definitely/not/here/post.html"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"));
}
