//! Upstream generation layer for Mitran.
//!
//! # Architecture
//!
//! - [`traits::GenerationProvider`]: trait every upstream backend implements
//! - [`gemini::GeminiProvider`]: streaming client for the Gemini API
//! - [`gemini::create_provider`]: convenience builder from the loaded config
//! - [`error::GenerationError`]: everything that can fail upstream

pub mod error;
pub mod gemini;
pub mod traits;

pub use error::GenerationError;
pub use gemini::{create_provider, GeminiProvider};
pub use traits::{FragmentStream, GenerationProvider, GenerationRequest};
