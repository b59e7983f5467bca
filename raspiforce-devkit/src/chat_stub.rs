/*!
Mock du canal de chat

Enregistre chaque message envoyé et la fermeture du canal.
*/

use parking_lot::Mutex;
use raspiforce_agent::chat::{ChatMessage, ChatSink};
use raspiforce_agent::error::ChatError;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    sent: Vec<ChatMessage>,
    payloads: Vec<String>,
    close_count: usize,
}

#[derive(Clone, Default)]
pub struct MockChat {
    inner: Arc<Mutex<Inner>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages envoyés, dans l'ordre
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.lock().sent.clone()
    }

    /// Payloads JSON tels qu'ils partiraient sur le fil
    pub fn payloads(&self) -> Vec<String> {
        self.inner.lock().payloads.clone()
    }

    /// Textes envoyés sur un handle donné
    pub fn texts_for(&self, handle: &str) -> Vec<String> {
        self.inner
            .lock()
            .sent
            .iter()
            .filter(|m| m.handle == handle)
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.inner.lock().close_count
    }
}

impl ChatSink for MockChat {
    async fn send(&mut self, message: ChatMessage) -> Result<(), ChatError> {
        let payload = message.to_json()?;
        let mut inner = self.inner.lock();
        inner.payloads.push(payload);
        inner.sent.push(message);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.inner.lock().close_count += 1;
        Ok(())
    }
}
