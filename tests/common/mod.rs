use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;
use tempfile::TempDir;
use mcp_remote_client::mcp::logging::{LogLevel, ToolCallLog, ToolCallLogEntry};

/// Tool-call log sink that keeps `(level, message, payload)` triples.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct CapturedLog {
    entries: Mutex<Vec<(LogLevel, &'static str, Value)>>,
}

#[allow(dead_code)]
impl CapturedLog {
    pub fn entries(&self) -> Vec<(LogLevel, &'static str, Value)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<&'static str> {
        self.entries().into_iter().map(|(_, m, _)| m).collect()
    }

    pub fn payloads(&self, message: &str) -> Vec<Value> {
        self.entries()
            .into_iter()
            .filter(|(_, m, _)| *m == message)
            .map(|(_, _, v)| v)
            .collect()
    }
}

impl ToolCallLog for CapturedLog {
    fn record(&self, level: LogLevel, entry: &ToolCallLogEntry<'_>) {
        if level == LogLevel::Silent {
            return;
        }
        self.entries
            .lock()
            .unwrap()
            .push((level, entry.message(), entry.to_json()));
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Path to the `mcp_test_server` helper binary.
#[allow(dead_code)]
pub fn test_server_exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mcp_test_server"))
}
