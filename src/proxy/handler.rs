use crate::auth;
use crate::error::GatewayError;
use crate::proxy::context::{BoxBody, RequestContext};
use crate::routing::{rewrite_path, CompiledRoute};
use crate::server::{admin, GatewayState};
use crate::upstream;
use http::header::AUTHORIZATION;
use http::Uri;
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Handle a single inbound request through the gateway's phased pipeline:
///
/// 0. ADMIN_DISPATCH — `/admin/*` is served in place, ahead of route
///    resolution, so an operator-configured route can never shadow it.
/// 1. ROUTE_MATCH — longest-prefix match against the compiled route table.
/// 2. AUTHENTICATE — bearer key extraction and lookup.
/// 3. RATE_LIMIT — fixed-window admission for the authenticated key.
/// 4. FORWARD — relay to the matched upstream.
/// 5. LOG — append exactly one `LogRecord`, whatever the outcome.
pub async fn handle_request(
    req: Request<Incoming>,
    state: GatewayState,
    peer_addr: SocketAddr,
) -> Result<Response<BoxBody>, hyper::Error> {
    let path = req.uri().path();
    if path == "/admin" || path.starts_with("/admin/") {
        return admin::handle_admin(req, &state).await;
    }

    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let client_ip = peer_addr.ip();
    let mut ctx = RequestContext::new(method, path.clone(), client_ip);

    let (status, message, response) = run_pipeline(req, &state, &mut ctx).await;

    ctx.finalize_metrics(status.as_u16());
    state.logs.append(crate::logbuf::LogRecord {
        timestamp_ms: now_ms(),
        method: ctx.method.clone(),
        path: ctx.path.clone(),
        status_code: status.as_u16(),
        api_key: ctx.api_key.clone(),
        target_url: ctx.target_url.clone(),
        ip: ctx.client_ip,
        message,
    });

    Ok(response)
}

/// Run the route/auth/rate-limit/forward chain, returning the final status,
/// the exactly-one log message for this request, and the response sent to
/// the client.
async fn run_pipeline(
    req: Request<Incoming>,
    state: &GatewayState,
    ctx: &mut RequestContext,
) -> (http::StatusCode, String, Response<BoxBody>) {
    let route = match state.match_route(&ctx.path) {
        Some(route) => route,
        None => return fail(ctx, GatewayError::NoRoute),
    };
    ctx.target_url = route.target_url.clone();

    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let api_key = match auth::verify(auth_header, state) {
        Ok(k) => k,
        Err(e) => return fail(ctx, e),
    };
    ctx.api_key = api_key.key.clone();

    if let Err(e) = state
        .rate_limiter
        .check(&api_key.key, api_key.rate_limit, now_ms())
        .await
    {
        return fail(ctx, e);
    }

    match forward(req, &route, state, ctx.client_ip).await {
        Ok(resp) => (resp.status(), "ok".to_string(), resp),
        Err(e) => fail(ctx, e),
    }
}

async fn forward(
    req: Request<Incoming>,
    route: &CompiledRoute,
    state: &GatewayState,
    client_ip: std::net::IpAddr,
) -> Result<Response<BoxBody>, GatewayError> {
    let method = req.method().clone();
    let query = req.uri().query().map(str::to_string);
    let outbound_path = rewrite_path(route, req.uri().path(), query.as_deref());

    let target_authority = route
        .target_url
        .parse::<Uri>()
        .ok()
        .and_then(|u| u.authority().cloned())
        .ok_or_else(|| GatewayError::Config(format!("invalid target_url: {}", route.target_url)))?;
    let scheme = route
        .target_url
        .parse::<Uri>()
        .ok()
        .and_then(|u| u.scheme().cloned())
        .unwrap_or(http::uri::Scheme::HTTP);

    let upstream_uri = Uri::builder()
        .scheme(scheme)
        .authority(target_authority)
        .path_and_query(outbound_path)
        .build()
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    let mut headers = req.headers().clone();
    headers.remove(AUTHORIZATION);
    upstream::inject_forwarded_for(&mut headers, client_ip);

    let body = http_body_util::BodyExt::boxed(req.into_body());

    let upstream_resp = upstream::forward(
        &state.upstream_client,
        method,
        upstream_uri,
        headers,
        body,
        state.upstream_timeout,
    )
    .await?;

    relay_response(upstream_resp)
}

/// Translate an upstream `Response<Incoming>` into the gateway's outbound
/// `BoxBody` response, stripping hop-by-hop headers in the response
/// direction too.
fn relay_response(
    upstream_resp: Response<Incoming>,
) -> Result<Response<BoxBody>, GatewayError> {
    use http_body_util::BodyExt;

    let (mut parts, body) = upstream_resp.into_parts();
    upstream::strip_hop_by_hop(&mut parts.headers);

    let boxed = body.map_err(|e| hyper::Error::from(e)).boxed();
    Ok(Response::from_parts(parts, boxed))
}

fn fail(ctx: &mut RequestContext, err: GatewayError) -> (http::StatusCode, String, Response<BoxBody>) {
    let status = err.status();
    let message = err.message();

    if let GatewayError::RateLimited { retry_after_ms } = &err {
        let retry_after_secs = (*retry_after_ms).div_ceil(1000).max(1);
        let mut resp = ctx.error_response(status, &message);
        if let Ok(v) = http::HeaderValue::from_str(&retry_after_secs.to_string()) {
            resp.headers_mut().insert(http::header::RETRY_AFTER, v);
        }
        return (status, message, resp);
    }

    if matches!(
        err,
        GatewayError::UpstreamTimeout
            | GatewayError::UpstreamUnreachable(_)
            | GatewayError::UpstreamProtocolError(_)
    ) {
        warn!(
            "proxy: upstream failure, path={}, target={}, error={}",
            ctx.path, ctx.target_url, message
        );
    }

    let resp = ctx.error_response(status, &message);
    (status, message, resp)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_carries_the_error_message_into_the_log() {
        let mut ctx = RequestContext::new("GET".to_string(), "/other".to_string(), "127.0.0.1".parse().unwrap());
        let (status, message, resp) = fail(&mut ctx, GatewayError::NoRoute);
        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(message, "no route");
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn fail_sets_retry_after_header_on_rate_limit() {
        let mut ctx = RequestContext::new("GET".to_string(), "/api".to_string(), "127.0.0.1".parse().unwrap());
        let (status, message, resp) = fail(&mut ctx, GatewayError::RateLimited { retry_after_ms: 1500 });
        assert_eq!(status, http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(message, "rate limited");
        assert_eq!(resp.headers().get(http::header::RETRY_AFTER).unwrap(), "2");
    }
}
