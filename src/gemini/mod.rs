//! Minimal client for the Gemini `generateContent` REST endpoint.
pub mod client;
pub mod types;
