use crate::error::GatewayError;
use crate::proxy::context::{full_body, BoxBody};
use crate::server::GatewayState;
use http::Method;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct KeyPolicyRequest {
    key: String,
    #[serde(default)]
    rate_limit: Option<crate::config::RateLimitPolicy>,
}

/// Dispatch an `/admin/*` request. Called by `proxy::handle_request` before
/// the Route Resolver runs, so an operator-configured route can never shadow
/// this namespace.
pub async fn handle_admin(
    req: Request<Incoming>,
    state: &GatewayState,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (method.clone(), path.as_str()) {
        (Method::GET, "/admin/logs") => Ok(get_logs(state)),
        (Method::DELETE, "/admin/logs") => Ok(delete_logs(state)),
        (Method::GET, "/admin/keys") => Ok(get_keys(state)),
        (Method::POST, "/admin/key-policy") => post_key_policy(req, state).await,
        (Method::GET, "/admin/healthz") => Ok(healthz()),
        (Method::GET, "/admin/metrics") => Ok(get_metrics(state)),
        _ => Err(GatewayError::NoRoute),
    };

    Ok(result.unwrap_or_else(|e| error_response(&e)))
}

fn error_response(err: &GatewayError) -> Response<BoxBody> {
    let body = serde_json::json!({ "error": err.message() }).to_string();
    Response::builder()
        .status(err.status())
        .header("content-type", "application/json")
        .body(full_body(body))
        .unwrap()
}

fn json_ok(body: String) -> Response<BoxBody> {
    Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .body(full_body(body))
        .unwrap()
}

fn get_logs(state: &GatewayState) -> Response<BoxBody> {
    let records = state.logs.snapshot();
    json_ok(serde_json::to_string(&records).unwrap_or_else(|_| "[]".to_string()))
}

fn delete_logs(state: &GatewayState) -> Response<BoxBody> {
    state.logs.clear();
    Response::builder()
        .status(204)
        .body(crate::proxy::context::empty_body())
        .unwrap()
}

fn get_keys(state: &GatewayState) -> Response<BoxBody> {
    let keys = state.list_keys();
    json_ok(serde_json::to_string(&keys).unwrap_or_else(|_| "[]".to_string()))
}

async fn post_key_policy(
    req: Request<Incoming>,
    state: &GatewayState,
) -> Result<Response<BoxBody>, GatewayError> {
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| GatewayError::BadRequest(format!("failed to read body: {e}")))?
        .to_bytes();

    let payload: KeyPolicyRequest = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::BadRequest(format!("malformed json body: {e}")))?;

    if let Some(policy) = payload.rate_limit {
        if policy.interval_ms == 0 {
            return Err(GatewayError::BadRequest(
                "rate_limit.interval_ms must be greater than zero".to_string(),
            ));
        }
    }

    state.set_policy(&payload.key, payload.rate_limit)?;

    Ok(json_ok(r#"{"status":"ok"}"#.to_string()))
}

fn healthz() -> Response<BoxBody> {
    json_ok(r#"{"status":"ok"}"#.to_string())
}

fn get_metrics(state: &GatewayState) -> Response<BoxBody> {
    Response::builder()
        .status(200)
        .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
        .body(full_body(state.metrics.render()))
        .unwrap()
}
