//! Catch-all audit consumer. Binds `#` on its own queue and appends
//! every message, metadata first, to a file. No reconciliation logic.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::messaging::{Consumer, Delivery, Outcome};

pub struct Auditor {
    queue_name: String,
    audit_file: PathBuf,
}

impl Auditor {
    #[must_use]
    pub fn new(queue_name: impl Into<String>, audit_file: impl Into<PathBuf>) -> Self {
        Self {
            queue_name: queue_name.into(),
            audit_file: audit_file.into(),
        }
    }

    async fn append(&self, delivery: &Delivery) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_file)
            .await?;

        let entry = format!(
            "routing key = {}\ncontent-type = {}\n{}\n",
            delivery.routing_key,
            delivery.content_type.as_deref().unwrap_or("unknown"),
            String::from_utf8_lossy(&delivery.body),
        );
        file.write_all(entry.as_bytes()).await
    }
}

#[async_trait]
impl Consumer for Auditor {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn routing_keys(&self) -> Vec<String> {
        vec!["#".to_string()]
    }

    /// Auditing is best effort: the message is acknowledged whether or
    /// not the write succeeded, so a full disk never blocks the bus.
    async fn handle(&self, delivery: &Delivery) -> Outcome {
        if let Err(error) = self.append(delivery).await {
            tracing::warn!(%error, file = %self.audit_file.display(), "failed to write audit entry");
        }
        Outcome::Ack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_metadata_and_payload_for_each_message() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audit_file = dir.path().join("audit.log");
        let auditor = Auditor::new("audit-queue", &audit_file);

        let mut first = Delivery::new("lab.s2.plate.create", br#"{"plate":{}}"#.to_vec());
        first.content_type = Some("application/json".to_string());
        let second = Delivery::new("lab.s2.order.create", br#"{"order":{}}"#.to_vec());

        assert_eq!(auditor.handle(&first).await, Outcome::Ack);
        assert_eq!(auditor.handle(&second).await, Outcome::Ack);

        let contents = tokio::fs::read_to_string(&audit_file).await.expect("read");
        assert!(contents.contains("routing key = lab.s2.plate.create"));
        assert!(contents.contains("content-type = application/json"));
        assert!(contents.contains(r#"{"plate":{}}"#));
        assert!(contents.contains("routing key = lab.s2.order.create"));
        assert!(contents.contains("content-type = unknown"));
    }
}
