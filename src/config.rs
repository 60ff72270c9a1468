//! Configuration for the assistant components.
//!
//! API credentials are an external concern and only ever enter through the
//! environment; everything else has working defaults.

use crate::{EngenheiroError, Result};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the report-generation client
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    /// API key (never logged)
    pub api_key: String,

    /// Model used for plain and web-grounded requests
    pub model: String,

    /// Model used when deep reasoning is requested
    pub thinking_model: String,

    /// Low temperature for precise technical answers
    pub temperature: f32,

    pub max_output_tokens: u32,

    /// Token budget for the thinking phase
    pub thinking_budget: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            thinking_model: "gemini-2.5-pro".to_string(),
            temperature: 0.4,
            max_output_tokens: 4000,
            thinking_budget: 8192,
        }
    }
}

/// Configuration for the realtime voice session
#[derive(Clone, Debug)]
pub struct LiveConfig {
    pub api_key: String,

    /// Bidirectional native-audio model
    pub model: String,

    pub voice_name: String,

    /// Microphone capture rate (what the remote side expects inbound)
    pub input_sample_rate: u32,

    /// Rate of the PCM the remote side streams back
    pub output_sample_rate: u32,

    /// Samples per outbound frame at the capture rate
    pub frame_size: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash-native-audio-preview-12-2025".to_string(),
            voice_name: "Puck".to_string(),
            input_sample_rate: 16_000,
            output_sample_rate: 24_000,
            frame_size: 1024,
        }
    }
}

/// Complete application configuration
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub live: LiveConfig,
}

impl AppConfig {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.generation.api_key = key.clone();
        self.live.api_key = key;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.live.voice_name = voice.into();
        self
    }

    /// Build a configuration with the API key taken from the environment
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| EngenheiroError::ConfigError(format!("{} is not set", API_KEY_ENV)))?;

        let mut config = Self::default();
        config.generation.api_key = api_key.clone();
        config.live.api_key = api_key;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.generation.api_key.is_empty() {
            return Err(EngenheiroError::ConfigError("API key is empty".into()));
        }
        if self.generation.model.is_empty() || self.live.model.is_empty() {
            return Err(EngenheiroError::ConfigError("model id is empty".into()));
        }
        if self.live.frame_size == 0 {
            return Err(EngenheiroError::ConfigError("frame size must be non-zero".into()));
        }
        Ok(())
    }
}
