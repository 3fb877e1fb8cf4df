use crate::config::ApiKey;
use crate::error::GatewayError;
use crate::server::GatewayState;

/// Extract and validate the bearer credential from an inbound `Authorization`
/// header value, consulting the Config Store for the matching key.
///
/// A small, pure, synchronous function — route matching and authentication
/// never suspend, so they run inline ahead of any I/O in the pipeline.
pub fn verify(header: Option<&str>, state: &GatewayState) -> Result<ApiKey, GatewayError> {
    let header = header.ok_or(GatewayError::Unauthorized("missing credential"))?;

    let token = strip_bearer_prefix(header).ok_or(GatewayError::Unauthorized("malformed credential"))?;
    if token.is_empty() {
        return Err(GatewayError::Unauthorized("malformed credential"));
    }

    state
        .get_key(token)
        .ok_or(GatewayError::Unauthorized("unknown key"))
}

fn strip_bearer_prefix(header: &str) -> Option<&str> {
    const PREFIX: &str = "bearer ";
    if header.len() < PREFIX.len() {
        return None;
    }
    let (head, tail) = header.split_at(PREFIX.len());
    if head.eq_ignore_ascii_case(PREFIX) {
        Some(tail)
    } else {
        None
    }
}
