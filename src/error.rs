use http::StatusCode;
use std::fmt;

#[derive(Debug, Clone)]
pub enum GatewayError {
    NoRoute,
    Unauthorized(&'static str),
    RateLimited { retry_after_ms: u64 },
    UpstreamTimeout,
    UpstreamUnreachable(String),
    UpstreamProtocolError(String),
    BadRequest(String),
    UnknownKey,
    Config(String),
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRoute => StatusCode::NOT_FOUND,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::UpstreamTimeout
            | GatewayError::UpstreamUnreachable(_)
            | GatewayError::UpstreamProtocolError(_) => StatusCode::BAD_GATEWAY,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::UnknownKey => StatusCode::NOT_FOUND,
            GatewayError::Config(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short human message, used both for the client-facing JSON body and the log record.
    pub fn message(&self) -> String {
        match self {
            GatewayError::NoRoute => "no route".to_string(),
            GatewayError::Unauthorized(reason) => reason.to_string(),
            GatewayError::RateLimited { .. } => "rate limited".to_string(),
            GatewayError::UpstreamTimeout => "upstream timeout".to_string(),
            GatewayError::UpstreamUnreachable(msg) => format!("upstream unreachable: {msg}"),
            GatewayError::UpstreamProtocolError(msg) => format!("upstream protocol error: {msg}"),
            GatewayError::BadRequest(msg) => msg.clone(),
            GatewayError::UnknownKey => "unknown key".to_string(),
            GatewayError::Config(msg) => msg.clone(),
            GatewayError::Internal(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for GatewayError {}
