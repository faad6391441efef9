//! Gemini `generateContent` client used as Herald's captioner.

mod client;
mod error;
mod prompts;

pub use client::{DEFAULT_MODEL, GEMINI_API, GeminiClient};
pub use error::GeminiError;
pub use prompts::{caption_prompt, greeting_prompt};
