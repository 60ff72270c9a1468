pub mod client;
pub mod prompts;

pub use client::{GeminiClient, GenerationClient, MockGenerationClient};
