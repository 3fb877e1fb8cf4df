use crate::error::GatewayError;
use crate::proxy::context::BoxBody;
use http::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue, Uri};
use hyper::{Request, Response};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, BoxBody>;

/// Build the single HTTP(S) client the gateway uses to reach every upstream.
/// One connector handles both `http://` and `https://` targets (HTTP/2 is
/// negotiated over TLS via ALPN); there is exactly one client for the whole
/// process since each route has exactly one upstream, not a load-balanced set.
pub fn build_client() -> UpstreamClient {
    let mut http = HttpConnector::new();
    http.set_nodelay(true);
    http.enforce_http(false);

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http);

    Client::builder(TokioExecutor::new()).build(https)
}

/// Forward a request to `upstream_uri`, applying the gateway's header policy,
/// and bound the whole interaction (connect + response headers + body) by
/// `timeout`. Body streaming is handled entirely by hyper — nothing here
/// buffers the request or response body into memory.
pub async fn forward(
    client: &UpstreamClient,
    method: http::Method,
    upstream_uri: Uri,
    mut headers: http::HeaderMap,
    body: BoxBody,
    timeout: Duration,
) -> Result<Response<hyper::body::Incoming>, GatewayError> {
    apply_outbound_host(&mut headers, &upstream_uri);
    strip_hop_by_hop(&mut headers);

    let mut builder = Request::builder().method(method).uri(upstream_uri);
    for (name, value) in &headers {
        builder = builder.header(name, value);
    }

    let req = builder
        .body(body)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    match tokio::time::timeout(timeout, client.request(req)).await {
        Ok(Ok(resp)) => Ok(resp),
        Ok(Err(e)) => {
            if e.is_connect() {
                Err(GatewayError::UpstreamUnreachable(e.to_string()))
            } else {
                Err(GatewayError::UpstreamProtocolError(e.to_string()))
            }
        }
        Err(_) => Err(GatewayError::UpstreamTimeout),
    }
}

fn apply_outbound_host(headers: &mut http::HeaderMap, upstream_uri: &Uri) {
    if let Some(authority) = upstream_uri.authority() {
        if let Ok(v) = HeaderValue::from_str(authority.as_str()) {
            headers.insert(HOST, v);
        }
    }
}

/// Strip hop-by-hop headers, plus any header named in the inbound
/// `Connection` token list. Used symmetrically for the outbound request and
/// the relayed response.
pub fn strip_hop_by_hop(headers: &mut http::HeaderMap) {
    let connection_tokens: Vec<String> = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').map(|t| t.trim().to_ascii_lowercase()).collect())
        .unwrap_or_default();

    let hop_headers: &[HeaderName] = &[
        CONNECTION,
        HeaderName::from_static("keep-alive"),
        HeaderName::from_static("proxy-authenticate"),
        HeaderName::from_static("proxy-authorization"),
        HeaderName::from_static("te"),
        HeaderName::from_static("trailers"),
        TRANSFER_ENCODING,
        HeaderName::from_static("upgrade"),
    ];

    for h in hop_headers {
        headers.remove(h);
    }

    for token in &connection_tokens {
        if let Ok(name) = HeaderName::from_bytes(token.as_bytes()) {
            headers.remove(&name);
        }
    }
}

/// Append the client IP to the `X-Forwarded-For` list, creating it if absent.
pub fn inject_forwarded_for(headers: &mut http::HeaderMap, client_ip: std::net::IpAddr) {
    static XFF: HeaderName = HeaderName::from_static("x-forwarded-for");

    let ip = client_ip.to_string();
    if let Some(existing) = headers.get(&XFF).and_then(|v| v.to_str().ok()) {
        let combined = format!("{existing}, {ip}");
        if let Ok(v) = HeaderValue::from_str(&combined) {
            headers.insert(XFF.clone(), v);
        }
    } else if let Ok(v) = HeaderValue::from_str(&ip) {
        headers.insert(XFF.clone(), v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    #[test]
    fn strips_enumerated_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("te", HeaderValue::from_static("trailers"));
        headers.insert("x-custom", HeaderValue::from_static("keep"));

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key(CONNECTION));
        assert!(!headers.contains_key("keep-alive"));
        assert!(!headers.contains_key("te"));
        assert!(headers.contains_key("x-custom"));
    }

    #[test]
    fn strips_headers_named_in_connection_token_list() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("x-session-token"));
        headers.insert("x-session-token", HeaderValue::from_static("abc"));

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key("x-session-token"));
    }

    #[test]
    fn forwarded_for_appends_to_existing_list() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        inject_forwarded_for(&mut headers, "10.0.0.2".parse().unwrap());
        assert_eq!(
            headers.get("x-forwarded-for").unwrap(),
            "10.0.0.1, 10.0.0.2"
        );
    }

    #[test]
    fn forwarded_for_creates_header_when_absent() {
        let mut headers = HeaderMap::new();
        inject_forwarded_for(&mut headers, "10.0.0.2".parse().unwrap());
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "10.0.0.2");
    }
}
