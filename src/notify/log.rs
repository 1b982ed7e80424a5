// src/notify/log.rs
use super::{Delivery, Notifier, OutboundMessage, PublishError};

/// Dry-run sink: writes each message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, msg: &OutboundMessage) -> Result<Delivery, PublishError> {
        tracing::info!(target: "notify", chars = msg.text.chars().count(), "[dry-run] message not sent");
        tracing::debug!(target: "notify", "[dry-run]\n{}", msg.text);
        Ok(Delivery::default())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn message_body_stays_out_of_info_logs() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let msg = OutboundMessage {
            text: "[속보] 비공개 본문".into(),
            parse_mode: None,
            disable_preview: true,
        };
        LogNotifier.send(&msg).await.unwrap();

        let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("message not sent"));
        assert!(!out.contains("비공개 본문"));
    }
}
