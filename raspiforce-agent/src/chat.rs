//! Chat channel used to narrate agent status
//!
//! Each message is a JSON envelope `{"handle": ..., "text": ...}` sent as a
//! UTF-8 text frame. Sends are fire-and-forget: no reply is awaited.

use crate::error::ChatError;
use futures::SinkExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

/// Chat message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub handle: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(handle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            text: text.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, ChatError> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

/// Outbound side of a chat channel
#[allow(async_fn_in_trait)]
pub trait ChatSink {
    async fn send(&mut self, message: ChatMessage) -> Result<(), ChatError>;

    async fn close(&mut self) -> Result<(), ChatError>;
}

/// WebSocket chat channel
pub struct WsChat {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsChat {
    pub async fn connect(url: &str) -> Result<Self, ChatError> {
        let (stream, _response) = connect_async(url).await?;
        info!("Chat channel connected to {}", url);
        Ok(Self { stream })
    }
}

impl ChatSink for WsChat {
    async fn send(&mut self, message: ChatMessage) -> Result<(), ChatError> {
        let payload = message.to_json()?;
        debug!("Chat -> {}", payload);
        self.stream.send(Message::text(payload)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Optional chat channel: every call is a no-op when chat mode is off
pub struct Notifier<N> {
    chat: Option<N>,
}

impl<N: ChatSink> Notifier<N> {
    pub fn new(chat: Option<N>) -> Self {
        Self { chat }
    }

    pub fn disabled() -> Self {
        Self { chat: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.chat.is_some()
    }

    pub async fn send(&mut self, handle: &str, text: &str) -> Result<(), ChatError> {
        match self.chat.as_mut() {
            Some(chat) => chat.send(ChatMessage::new(handle, text)).await,
            None => Ok(()),
        }
    }

    /// Close the channel once; later calls do nothing
    pub async fn close(&mut self) -> Result<(), ChatError> {
        match self.chat.take() {
            Some(mut chat) => chat.close().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<ChatMessage>,
        closed: usize,
    }

    impl ChatSink for &mut Recorder {
        async fn send(&mut self, message: ChatMessage) -> Result<(), ChatError> {
            self.sent.push(message);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ChatError> {
            self.closed += 1;
            Ok(())
        }
    }

    #[test]
    fn test_envelope_field_order() {
        let json = ChatMessage::new("RPI-1", "Case created.").to_json().unwrap();
        assert_eq!(json, r#"{"handle":"RPI-1","text":"Case created."}"#);
    }

    #[test]
    fn test_envelope_escapes_and_utf8() {
        let json = ChatMessage::new("Setup", "say \"hi\" at 26.1°C")
            .to_json()
            .unwrap();
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, "say \"hi\" at 26.1°C");
        assert!(json.contains('°'));
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_silent() {
        let mut notifier: Notifier<&mut Recorder> = Notifier::disabled();
        assert!(!notifier.is_enabled());
        notifier.send("x", "y").await.unwrap();
        notifier.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_notifier_closes_once() {
        let mut recorder = Recorder::default();
        {
            let mut notifier = Notifier::new(Some(&mut recorder));
            notifier.send("Setup", "Connection established.").await.unwrap();
            notifier.close().await.unwrap();
            notifier.close().await.unwrap();
            notifier.send("Setup", "dropped").await.unwrap();
        }
        assert_eq!(recorder.sent.len(), 1);
        assert_eq!(recorder.closed, 1);
    }
}
