//! Message framing for the bidirectional voice endpoint.
//!
//! Everything here is plain JSON in and out of a websocket; building and
//! parsing are kept free of socket state so they can be tested directly.

use crate::audio::codec::INPUT_MIME;
use crate::config::LiveConfig;
use crate::llm::prompts::LIVE_SYSTEM_INSTRUCTION;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

const ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Websocket URL with the key as a query parameter
pub fn endpoint_url(api_key: &str) -> String {
    format!("{}?key={}", ENDPOINT, api_key)
}

/// First frame on the socket: model, audio-only responses, voice, persona
pub fn setup_message(config: &LiveConfig) -> String {
    serde_json::json!({
        "setup": {
            "model": format!("models/{}", config.model),
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {
                            "voiceName": config.voice_name
                        }
                    }
                }
            },
            "systemInstruction": {
                "parts": [{
                    "text": LIVE_SYSTEM_INSTRUCTION
                }]
            },
            "outputAudioTranscription": {}
        }
    })
    .to_string()
}

/// One captured microphone frame, already base64-encoded 16 kHz PCM
pub fn audio_frame(encoded_pcm: &str) -> String {
    serde_json::json!({
        "realtimeInput": {
            "mediaChunks": [{
                "mimeType": INPUT_MIME,
                "data": encoded_pcm
            }]
        }
    })
    .to_string()
}

/// Everything a single server frame can carry that we act on
#[derive(Debug, Default, PartialEq)]
pub struct ServerEvent {
    pub setup_complete: bool,
    /// Raw 24 kHz PCM16 chunks, base64-decoded
    pub audio_chunks: Vec<Vec<u8>>,
    /// Transcript of the spoken response, when present
    pub transcript: Option<String>,
    pub turn_complete: bool,
    /// The user spoke over the model; pending playback must be dropped
    pub interrupted: bool,
}

impl ServerEvent {
    pub fn is_empty(&self) -> bool {
        !self.setup_complete
            && self.audio_chunks.is_empty()
            && self.transcript.is_none()
            && !self.turn_complete
            && !self.interrupted
    }
}

/// Parse one inbound frame. Unknown fields are ignored; frames that are
/// not JSON at all yield an empty event.
pub fn parse_server_message(raw: &str) -> ServerEvent {
    let mut event = ServerEvent::default();

    let json: Value = match serde_json::from_str(raw) {
        Ok(json) => json,
        Err(_) => return event,
    };

    if json.get("setupComplete").is_some() {
        event.setup_complete = true;
    }

    let Some(server_content) = json.get("serverContent") else {
        return event;
    };

    if let Some(parts) = server_content
        .get("modelTurn")
        .and_then(|turn| turn.get("parts"))
        .and_then(|parts| parts.as_array())
    {
        for part in parts {
            let Some(data) = part
                .get("inlineData")
                .and_then(|inline| inline.get("data"))
                .and_then(|data| data.as_str())
            else {
                continue;
            };
            if let Ok(bytes) = BASE64.decode(data) {
                event.audio_chunks.push(bytes);
            }
        }
    }

    if let Some(text) = server_content
        .get("outputTranscription")
        .and_then(|transcription| transcription.get("text"))
        .and_then(|text| text.as_str())
    {
        if !text.is_empty() {
            event.transcript = Some(text.to_string());
        }
    }

    event.turn_complete = server_content
        .get("turnComplete")
        .and_then(|flag| flag.as_bool())
        .unwrap_or(false)
        || server_content
            .get("generationComplete")
            .and_then(|flag| flag.as_bool())
            .unwrap_or(false);

    event.interrupted = server_content
        .get("interrupted")
        .and_then(|flag| flag.as_bool())
        .unwrap_or(false);

    event
}
