//! LLM backend for the narrator roles.
//!
//! Compiled only with the `llm` feature (the crate's default): embeds
//! `mistral.rs` as a library and calls it directly from the triage/deep
//! narrator implementations in `assessment::narrator_llm`. With the
//! feature off, those narrators don't exist and the daemon falls back
//! to the `NoOp` pair.

#[cfg(feature = "llm")]
mod mistral_rs;
#[cfg(feature = "llm")]
pub use mistral_rs::MistralRsBackend;
#[cfg(feature = "llm")]
pub use mistral_rs::is_cuda_available;
