//! Deepgram streaming adapter.
//!
//! Implements real-time transcription over Deepgram's WebSocket API.
//! Reference: <https://developers.deepgram.com/docs/live-streaming-audio>

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::adapter::{
    InitError, ProviderAdapter, ProviderError, ProviderSession, ProviderTranscript,
    SessionOptions, TransportError,
};

const DEEPGRAM_STREAMING_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Adapter for Deepgram's live streaming transcription endpoint.
pub struct DeepgramAdapter {
    api_key: String,
}

impl DeepgramAdapter {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl ProviderAdapter for DeepgramAdapter {
    async fn open(&self, opts: SessionOptions) -> Result<Box<dyn ProviderSession>, InitError> {
        let mut url = format!(
            "{DEEPGRAM_STREAMING_URL}?encoding=linear16&sample_rate={}&channels={}&language={}&punctuate=true",
            opts.sample_rate_hz, opts.channels, opts.language
        );
        if opts.interim_results {
            url.push_str("&interim_results=true");
        }

        log::info!("[Bridge] Connecting to Deepgram: {url}");

        let mut request = url
            .into_client_request()
            .map_err(|e| InitError(format!("failed to build request: {e}")))?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.api_key))
            .map_err(|e| InitError(format!("invalid api key: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        let (ws_stream, response) = connect_async(request)
            .await
            .map_err(|e| InitError(format!("websocket connection failed: {e}")))?;

        if response.status().is_client_error() {
            return Err(InitError(format!(
                "unauthorized: provider returned {}",
                response.status()
            )));
        }

        log::info!("[Bridge] Connected to Deepgram");
        let (sink, stream) = ws_stream.split();
        Ok(Box::new(DeepgramSession {
            sink: Some(sink),
            stream,
        }))
    }

    fn provider_id(&self) -> &'static str {
        "deepgram"
    }
}

type DeepgramSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type DeepgramStream = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

struct DeepgramSession {
    sink: Option<DeepgramSink>,
    stream: DeepgramStream,
}

#[async_trait]
impl ProviderSession for DeepgramSession {
    async fn send_audio(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(TransportError("connection already closed".into()));
        };
        sink.send(Message::Binary(bytes.to_vec().into()))
            .await
            .map_err(|e| TransportError(e.to_string()))
    }

    async fn next_event(&mut self) -> Option<Result<ProviderTranscript, ProviderError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<DeepgramResponse>(&text) {
                        Ok(response) => {
                            if let Some(transcript) = response.into_transcript() {
                                return Some(Ok(transcript));
                            }
                            // Metadata / empty-alternative messages: keep reading.
                            continue;
                        }
                        Err(e) => {
                            return Some(Err(ProviderError::Message(format!(
                                "malformed provider message: {e}"
                            ))))
                        }
                    }
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(ProviderError::Message(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ProviderError> {
        if let Some(mut sink) = self.sink.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DeepgramResponse {
    channel: Option<DeepgramChannel>,
    is_final: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
struct DeepgramAlternative {
    transcript: String,
    confidence: Option<f32>,
}

impl DeepgramResponse {
    fn into_transcript(self) -> Option<ProviderTranscript> {
        let alternative = self.channel?.alternatives.into_iter().next()?;
        if alternative.transcript.is_empty() {
            return None;
        }
        Some(ProviderTranscript {
            text: alternative.transcript,
            is_final: self.is_final.unwrap_or(false),
            confidence: alternative.confidence,
        })
    }
}
