use std::sync::Arc;

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::IntoResponse};

/// Scheme, host and path prefix under which a client reached this server,
/// honoring the `x-forwarded-*` headers of a reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    proto: String,
    host: String,
    prefix: String,
}

impl BaseUrl {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let proto = header("x-forwarded-proto").unwrap_or("http").to_owned();
        let host = header("x-forwarded-host")
            .or_else(|| header("host"))
            .unwrap_or("localhost")
            .to_owned();
        let prefix = header("x-forwarded-prefix")
            .unwrap_or("")
            .trim_end_matches('/')
            .to_owned();

        Self {
            proto,
            host,
            prefix,
        }
    }

    pub fn full_url<S: Into<String>>(&self, path: S) -> String {
        format!("{}://{}{}{}", self.proto, self.host, self.prefix, path.into())
    }
}

pub async fn base_url_middleware(mut req: Request, next: Next) -> impl IntoResponse {
    let base_url = BaseUrl::from_headers(req.headers());
    req.extensions_mut().insert(Arc::new(base_url));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;

    use super::BaseUrl;

    #[test]
    fn defaults_to_plain_localhost() {
        let base_url = BaseUrl::from_headers(&HeaderMap::new());
        assert_eq!(base_url.full_url("/api"), "http://localhost/api");
    }

    #[test]
    fn forwarded_headers_win_over_host() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "10.0.0.3:8080".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        headers.insert("x-forwarded-host", "example.org".parse().unwrap());
        headers.insert("x-forwarded-prefix", "/registry/".parse().unwrap());

        let base_url = BaseUrl::from_headers(&headers);
        assert_eq!(
            base_url.full_url("/api/v1/locations"),
            "https://example.org/registry/api/v1/locations"
        );
    }
}
