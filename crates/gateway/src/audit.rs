// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Append-only `audit.jsonl` writer (spec §4.4). Each record is opened,
//! appended, and flushed as its own `tokio::fs` operation — never buffered
//! across requests — so a crash mid-request can't lose or duplicate the
//! preceding line.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use hack_core::AuditRecord;

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn append(&self, record: &AuditRecord) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut line = serde_json::to_vec(record).map_err(std::io::Error::other)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.jsonl"));
        log.append(&AuditRecord {
            timestamp_ms: 1,
            token_id: None,
            method: "GET".into(),
            path: "/v1/projects".into(),
            status: 200,
            duration_ms: 5,
        })
        .await
        .unwrap();
        log.append(&AuditRecord {
            timestamp_ms: 2,
            token_id: None,
            method: "POST".into(),
            path: "/v1/projects/x/jobs".into(),
            status: 403,
            duration_ms: 1,
        })
        .await
        .unwrap();

        let contents = tokio::fs::read_to_string(dir.path().join("audit.jsonl")).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let _: serde_json::Value = serde_json::from_str(line).expect("each line is a JSON object");
        }
    }

    #[tokio::test]
    async fn never_writes_a_token_secret() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.jsonl"));
        log.append(&AuditRecord {
            timestamp_ms: 1,
            token_id: Some(hack_core::TokenId::new()),
            method: "GET".into(),
            path: "/v1/projects".into(),
            status: 200,
            duration_ms: 1,
        })
        .await
        .unwrap();
        let contents = tokio::fs::read_to_string(dir.path().join("audit.jsonl")).await.unwrap();
        assert!(!contents.contains("secret"));
    }
}
