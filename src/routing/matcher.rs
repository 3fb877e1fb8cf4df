use crate::config::RouteRule;
use std::borrow::Cow;

/// A route rule after load-time compilation: same fields as `RouteRule`, kept
/// as a distinct type so the hot path never touches the config-loading shape.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub path_prefix: String,
    pub target_url: String,
    pub strip_prefix: bool,
}

impl From<&RouteRule> for CompiledRoute {
    fn from(rule: &RouteRule) -> Self {
        Self {
            path_prefix: rule.path_prefix.clone(),
            target_url: rule.target_url.clone(),
            strip_prefix: rule.strip_prefix,
        }
    }
}

/// Read-mostly table of compiled routes, sorted by `path_prefix` length
/// descending so the first boundary-safe match found is the longest one.
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    pub fn new(rules: &[RouteRule]) -> Self {
        let mut routes: Vec<CompiledRoute> = rules.iter().map(CompiledRoute::from).collect();
        routes.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));
        Self { routes }
    }

    /// Longest-prefix match on `/`-aligned boundaries: `p` matches `path_prefix`
    /// only when `p == path_prefix` or `p` continues with `/` or `?` right after it.
    pub fn match_route(&self, path: &str) -> Option<&CompiledRoute> {
        self.routes.iter().find(|r| prefix_matches(&r.path_prefix, path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn all(&self) -> &[CompiledRoute] {
        &self.routes
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if path == prefix {
        return true;
    }
    path.len() > prefix.len()
        && path.starts_with(prefix)
        && matches!(path.as_bytes()[prefix.len()], b'/' | b'?')
}

/// Build the outbound path + query sent to the upstream: strip the matched
/// prefix when requested, join with the target's own path with exactly one
/// `/` between them, and append the original query string. Fragments are
/// never part of an HTTP request path, so there is nothing to drop here.
pub fn rewrite_path(route: &CompiledRoute, inbound_path: &str, inbound_query: Option<&str>) -> String {
    let suffix: &str = if route.strip_prefix {
        let stripped = &inbound_path[route.path_prefix.len()..];
        stripped
    } else {
        inbound_path
    };

    let target_path = target_path_of(&route.target_url);
    let joined = join_single_slash(target_path, suffix);

    match inbound_query {
        Some(q) if !q.is_empty() => format!("{joined}?{q}"),
        _ => joined,
    }
}

fn target_path_of(target_url: &str) -> &str {
    match target_url.parse::<http::Uri>() {
        Ok(uri) => {
            let p = uri.path();
            if p.is_empty() {
                "/"
            } else {
                p
            }
        }
        Err(_) => "/",
    }
}

/// Join two path segments so that exactly one `/` separates them, collapsing
/// any duplicate `/` at the seam. Neither input needs to be non-empty.
fn join_single_slash(base: &str, suffix: &str) -> String {
    let base: Cow<str> = if base.is_empty() { Cow::Borrowed("/") } else { Cow::Borrowed(base) };
    let base_trimmed = base.trim_end_matches('/');
    let suffix_trimmed = suffix.trim_start_matches('/');

    if suffix_trimmed.is_empty() {
        if base_trimmed.is_empty() {
            "/".to_string()
        } else {
            base_trimmed.to_string()
        }
    } else {
        format!("{base_trimmed}/{suffix_trimmed}")
    }
}
