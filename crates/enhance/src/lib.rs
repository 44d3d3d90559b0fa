//! # syntgen enhance
//!
//! Azure OpenAI implementation of [`syntgen_core::EnhancementHook`].
//!
//! The hook is installed at startup only when credentials are present. It performs one
//! blocking chat-completion call per request; the core `Enhancer` owns deadlines, retries
//! and fallback to the provider's draft text.

#![warn(rust_2018_idioms)]

mod azure;
mod config;

pub use azure::AzureOpenAiHook;
pub use config::{
    AzureOpenAiConfig, EnhanceConfigError, EnhanceConfigResult, DEFAULT_API_VERSION,
    DEFAULT_DEPLOYMENT,
};
