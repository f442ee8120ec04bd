use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use maxchat::commands::dispatcher::LineSource;
use maxchat::config::OllamaConfig;

/// Ollama config pointing at a mock server
#[allow(dead_code)]
pub fn ollama_config(server: &MockServer) -> OllamaConfig {
    OllamaConfig {
        host: server.uri(),
        timeout_seconds: 5,
        ..OllamaConfig::default()
    }
}

/// Body of a `/api/tags` response listing the given (name, family, size) models
#[allow(dead_code)]
pub fn tags_body(models: &[(&str, &str, &str)]) -> Value {
    let models: Vec<Value> = models
        .iter()
        .map(|(name, family, size)| {
            json!({
                "name": name,
                "model": name,
                "size": 2019393189u64,
                "details": { "family": family, "parameter_size": size }
            })
        })
        .collect();
    json!({ "models": models })
}

#[allow(dead_code)]
pub async fn mount_tags(server: &MockServer, models: &[(&str, &str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tags_body(models)))
        .mount(server)
        .await;
}

/// One streamed content line
#[allow(dead_code)]
pub fn fragment(content: &str) -> Value {
    json!({
        "model": "llama3.2:latest",
        "created_at": "2024-10-01T10:00:00Z",
        "message": { "role": "assistant", "content": content },
        "done": false
    })
}

/// The final streamed line with timing statistics
#[allow(dead_code)]
pub fn done_line(eval_count: u64, eval_duration: u64) -> Value {
    json!({
        "model": "llama3.2:latest",
        "created_at": "2024-10-01T10:00:01Z",
        "message": { "role": "assistant", "content": "" },
        "done_reason": "stop",
        "done": true,
        "total_duration": 2_600_000_000u64,
        "load_duration": 0,
        "prompt_eval_count": 26,
        "prompt_eval_duration": 0,
        "eval_count": eval_count,
        "eval_duration": eval_duration
    })
}

/// Join JSON values as newline-delimited JSON
#[allow(dead_code)]
pub fn ndjson(lines: &[Value]) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str(&line.to_string());
        body.push('\n');
    }
    body
}

/// A streaming `/api/chat` response with the given NDJSON body
#[allow(dead_code)]
pub fn chat_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/x-ndjson")
        .set_body_string(body)
}

/// Line input that replays a fixed script, then reports end of input
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedLines {
    lines: VecDeque<String>,
    pub prompts: Vec<String>,
}

#[allow(dead_code)]
impl ScriptedLines {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            prompts: Vec::new(),
        }
    }
}

impl LineSource for ScriptedLines {
    fn read_line(&mut self, prompt: &str) -> maxchat::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
