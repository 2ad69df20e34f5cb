#![allow(dead_code)]

use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::sync::mpsc;
use std::thread;

use tiny_http::{Header, Response, Server};

pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create a temporary git repo with an initial commit and nothing staged.
pub fn init_temp_repo() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path();
    run_git(path, &["init"]);
    run_git(path, &["config", "user.email", "test@test.com"]);
    run_git(path, &["config", "user.name", "Test"]);
    std::fs::write(path.join("README.md"), "# test\n").unwrap();
    run_git(path, &["add", "."]);
    run_git(path, &["commit", "-m", "init"]);
    dir
}

/// Write `content` to `name` in the repo and stage it.
pub fn stage_file(repo: &Path, name: &str, content: &str) {
    let file = repo.join(name);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(file, content).unwrap();
    run_git(repo, &["add", name]);
}

/// A request captured by [`stub_server`].
#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Serve the given `(status, body)` responses in order on a local port.
/// Returns the base URL and a receiver of captured requests; each request is
/// sent before its response goes out.
pub fn stub_server(responses: Vec<(u16, String)>) -> (String, mpsc::Receiver<CapturedRequest>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let base = format!("http://{addr}");
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for ((status, body), mut request) in responses.into_iter().zip(server.incoming_requests())
        {
            let mut received = String::new();
            request.as_reader().read_to_string(&mut received).unwrap();

            let _ = tx.send(CapturedRequest {
                method: request.method().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string(), h.value.to_string()))
                    .collect(),
                body: received,
            });

            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                );
            let _ = request.respond(response);
        }
    });

    (base, rx)
}

/// A `generateContent` response whose text is `review_json`.
pub fn gemini_response(review_json: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": review_json }] },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}
