//! Blocking HTTP implementation of [`BuildkiteApi`].
//!
//! Collects run on a blocking thread, so the client is synchronous. It must
//! be constructed outside of an async runtime.

use super::api::{BuildkiteApi, ClientError};
use super::model::{Agent, Build};
use crate::config::BuildkiteSettings;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;

/// Token-authenticated Buildkite REST client.
pub struct HttpClient {
    http: Client,
    base_url: Url,
    per_page: u32,
}

impl HttpClient {
    /// Builds a client from validated settings.
    ///
    /// Fails if the token cannot be used as a header value or the base URL
    /// is unusable; both are startup errors.
    pub fn new(settings: &BuildkiteSettings) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(&settings.api_url).map_err(|e| ClientError::Setup(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Setup(format!(
                "{} cannot be used as a base URL",
                settings.api_url
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.token))
            .map_err(|_| ClientError::Setup("token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .user_agent(concat!("buildkite-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            per_page: settings.per_page,
        })
    }

    fn endpoint(&self, org: &str, resource: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Setup(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["organizations", org, resource]);
        Ok(url)
    }

    /// Fetches one page of a list endpoint.
    ///
    /// The response is owned by this function; it is released when it goes
    /// out of scope on both the error and the success path.
    fn list<T: DeserializeOwned>(&self, org: &str, resource: &str) -> Result<Vec<T>, ClientError> {
        let url = self.endpoint(org, resource)?;
        let endpoint = url.path().to_string();

        let response = self
            .http
            .get(url)
            .query(&[("per_page", self.per_page)])
            .send()
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let items = response
            .json::<Vec<T>>()
            .map_err(|source| ClientError::Decode { endpoint, source })?;

        tracing::trace!(resource, count = items.len(), "fetched page");
        Ok(items)
    }
}

impl BuildkiteApi for HttpClient {
    fn list_builds(&self, org: &str) -> Result<Vec<Build>, ClientError> {
        self.list(org, "builds")
    }

    fn list_agents(&self, org: &str) -> Result<Vec<Agent>, ClientError> {
        self.list(org, "agents")
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("per_page", &self.per_page)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::RawQuery;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use std::time::Duration;

    /// Serves `router` on an ephemeral port from its own runtime thread and
    /// returns the API base URL.
    fn serve(router: Router) -> String {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, router).await.unwrap();
            });
        });
        format!("http://{}/v2", rx.recv().unwrap())
    }

    fn authorized(headers: &AxumHeaders) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer secret")
    }

    async fn builds_handler(headers: AxumHeaders, RawQuery(query): RawQuery) -> (StatusCode, String) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, r#"{"message":"Unauthorized"}"#.to_string());
        }
        if query.as_deref() != Some("per_page=100") {
            return (StatusCode::BAD_REQUEST, String::new());
        }
        (
            StatusCode::OK,
            r#"[{"id":"1","number":1,"state":"passed"},{"id":"2","number":2,"state":"failed"}]"#
                .to_string(),
        )
    }

    async fn agents_handler(headers: AxumHeaders) -> (StatusCode, String) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, String::new());
        }
        (StatusCode::OK, r#"[{"id":"a"},{"id":"b"},{"id":"c"}]"#.to_string())
    }

    fn stub_api() -> Router {
        Router::new()
            .route("/v2/organizations/acme/builds", get(builds_handler))
            .route("/v2/organizations/acme/agents", get(agents_handler))
    }

    fn settings(api_url: &str) -> BuildkiteSettings {
        BuildkiteSettings {
            token: "secret".to_string(),
            orgname: "acme".to_string(),
            api_url: api_url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_paths() {
        let client = HttpClient::new(&settings("https://api.buildkite.com/v2")).unwrap();
        let url = client.endpoint("acme", "builds").unwrap();
        assert_eq!(url.as_str(), "https://api.buildkite.com/v2/organizations/acme/builds");

        let client = HttpClient::new(&settings("https://api.buildkite.com/v2/")).unwrap();
        let url = client.endpoint("acme", "agents").unwrap();
        assert_eq!(url.as_str(), "https://api.buildkite.com/v2/organizations/acme/agents");
    }

    #[test]
    fn test_org_is_escaped() {
        let client = HttpClient::new(&settings("https://api.buildkite.com/v2")).unwrap();
        let url = client.endpoint("a/b", "builds").unwrap();
        assert_eq!(url.path(), "/v2/organizations/a%2Fb/builds");
    }

    #[test]
    fn test_rejects_bad_token() {
        let mut s = settings("https://api.buildkite.com/v2");
        s.token = "line\nbreak".to_string();
        assert!(matches!(HttpClient::new(&s), Err(ClientError::Setup(_))));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = HttpClient::new(&settings("https://api.buildkite.com/v2")).unwrap();
        assert!(!format!("{:?}", client).contains("secret"));
    }

    #[test]
    fn test_lists_against_stub_api() {
        let client = HttpClient::new(&settings(&serve(stub_api()))).unwrap();

        let builds = client.list_builds("acme").unwrap();
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].state, "passed");

        let agents = client.list_agents("acme").unwrap();
        assert_eq!(agents.len(), 3);
    }

    #[test]
    fn test_unauthorized_is_status_error() {
        let mut s = settings(&serve(stub_api()));
        s.token = "wrong".to_string();
        let client = HttpClient::new(&s).unwrap();

        assert!(matches!(
            client.list_builds("acme"),
            Err(ClientError::Status { status: 401, .. })
        ));
    }

    #[test]
    fn test_unknown_org_is_status_error() {
        let client = HttpClient::new(&settings(&serve(stub_api()))).unwrap();
        assert!(matches!(
            client.list_agents("other"),
            Err(ClientError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let router = Router::new().route(
            "/v2/organizations/acme/builds",
            get(|| async { "not json" }),
        );
        let client = HttpClient::new(&settings(&serve(router))).unwrap();
        assert!(matches!(
            client.list_builds("acme"),
            Err(ClientError::Decode { .. })
        ));
    }

    #[test]
    fn test_slow_upstream_times_out() {
        let router = Router::new().route(
            "/v2/organizations/acme/agents",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "[]"
            }),
        );
        let mut s = settings(&serve(router));
        s.timeout = Duration::from_millis(100);
        let client = HttpClient::new(&s).unwrap();

        assert!(matches!(
            client.list_agents("acme"),
            Err(ClientError::Transport { .. })
        ));
    }
}
