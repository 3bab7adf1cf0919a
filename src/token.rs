//! Anti-scraping token strategies.
//!
//! Every search request needs an `nkparam` header. Nobody has a working generator for it, so the
//! default strategy refuses to produce one and an operator has to supply a captured value.

use crate::request::{Headers, Params};
use crate::{Error, Result};

/// Header the remote API reads the token from.
pub const TOKEN_HEADER: &str = "nkparam";

/// Produces the per-request token from the request context.
/// A failure is fatal for the whole filter run.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self, page: u32, params: &Params, headers: &Headers) -> Result<String>;
}

/// Default strategy. Always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredToken;

impl TokenGenerator for UnconfiguredToken {
    fn generate(&self, page: u32, _params: &Params, _headers: &Headers) -> Result<String> {
        Err(Error::TokenGeneration {
            page,
            reason: "no token generator configured, pass --token or set NAUKRI_TOKEN".into(),
        })
    }
}

/// Replays one operator supplied value on every request.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenGenerator for StaticToken {
    fn generate(&self, page: u32, _params: &Params, _headers: &Headers) -> Result<String> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(Error::TokenGeneration {
                page,
                reason: "static token is empty".into(),
            });
        }
        Ok(token.to_string())
    }
}

/// Picks the strategy for an optional configured token.
pub fn from_setting(token: Option<&str>) -> Box<dyn TokenGenerator> {
    match token {
        Some(token) => Box::new(StaticToken::new(token)),
        None => Box::new(UnconfiguredToken),
    }
}
