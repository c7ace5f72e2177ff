//! HTTP client for the plan service.
//!
//! [`PlanClient`] is the seam the CLI is written against; [`HttpPlanClient`]
//! implements it over `reqwest`. Every call funnels through
//! `HttpPlanClient::send`, which reads the whole response body once and hands
//! the buffer to [`classify`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ConfigError};
use crate::error::{classify, Error, Result, REQUEST_ID_HEADER};
use crate::identifier::{PlanId, PlanOwner, PlanUrl};
use crate::models::{AddCharmRequest, Plan, PlanDetails, SuspendResumeRequest};

/// Operations offered by the plan service.
#[async_trait]
pub trait PlanClient: Send + Sync {
    /// Uploads a new plan definition and returns the stored plan.
    async fn save(&self, url: &PlanUrl, definition: &str) -> Result<Plan>;

    /// Associates a charm with the plan.
    async fn add_charm(&self, url: &PlanUrl, charm_url: &str, is_default: bool) -> Result<()>;

    /// Plans matching the plan url.
    async fn get(&self, url: &PlanUrl) -> Result<Vec<Plan>>;

    /// All plans owned by `owner`.
    async fn get_plans(&self, owner: &PlanOwner) -> Result<Vec<Plan>>;

    /// Plan details; a revision of 0 asks for the latest.
    async fn get_plan_details(&self, id: &PlanId) -> Result<PlanDetails>;

    async fn get_plan_revisions(&self, url: &PlanUrl) -> Result<Vec<Plan>>;

    async fn get_default_plan(&self, charm_url: &str) -> Result<Plan>;

    async fn get_plans_for_charm(&self, charm_url: &str) -> Result<Vec<Plan>>;

    async fn suspend(&self, url: &PlanUrl, all: bool, charm_urls: &[String]) -> Result<()>;

    async fn resume(&self, url: &PlanUrl, all: bool, charm_urls: &[String]) -> Result<()>;

    /// Releases a specific revision of a plan.
    async fn release(&self, id: &PlanId) -> Result<Plan>;
}

#[derive(Clone)]
pub struct HttpPlanClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for HttpPlanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPlanClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpPlanClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| Error::Transport {
                action: "create an http client".to_string(),
                source,
            })?;
        Self::with_http_client(config, http)
    }

    /// Uses a caller-provided transport (custom TLS, proxies, test doubles).
    pub fn with_http_client(config: &ClientConfig, http: reqwest::Client) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(config.base_url()).map_err(|e| ConfigError::InvalidValue {
            field: "service_url",
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                field: "service_url",
                reason: format!("{base_url} cannot carry a path"),
            }
            .into());
        }
        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base URLs are rejected in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(segments.iter().map(|segment| segment.as_ref()));
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and returns the body of a 200 response.
    ///
    /// The body is read to the end before classification on every path.
    async fn send(&self, action: &str, request: RequestBuilder) -> Result<Vec<u8>> {
        let transport = |source| Error::Transport {
            action: action.to_string(),
            source,
        };
        let request = request.build().map_err(transport)?;
        debug!(method = %request.method(), url = %request.url(), action, "plan service request");

        let response = self.http.execute(request).await.map_err(transport)?;
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(transport)?;

        if let Err(err) = classify(action, status, &body, request_id.as_deref()) {
            warn!(
                action,
                status,
                kind = %err.kind(),
                request_id = request_id.as_deref().unwrap_or(""),
                "plan service call failed"
            );
            return Err(err.into());
        }
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(&self, action: &str, request: RequestBuilder) -> Result<T> {
        let body = self.send(action, request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn suspend_resume(
        &self,
        operation: &str,
        url: &PlanUrl,
        all: bool,
        charm_urls: &[String],
    ) -> Result<()> {
        url.validate()?;
        let [owner, name] = url.path_segments();
        let endpoint = self.endpoint(&["p", owner, name, operation]);
        let body = SuspendResumeRequest {
            all,
            charms: charm_urls.to_vec(),
        };
        let action = format!("{operation} the plan");
        self.send(&action, self.request(Method::POST, endpoint).json(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PlanClient for HttpPlanClient {
    async fn save(&self, url: &PlanUrl, definition: &str) -> Result<Plan> {
        let plan = Plan::upload(url, definition);
        plan.validate()?;
        let endpoint = self.endpoint(&["p"]);
        self.send_json("store the plan", self.request(Method::POST, endpoint).json(&plan))
            .await
    }

    async fn add_charm(&self, url: &PlanUrl, charm_url: &str, is_default: bool) -> Result<()> {
        url.validate()?;
        let body = AddCharmRequest {
            plan_url: url.to_string(),
            charm_url: charm_url.to_string(),
            default: is_default,
        };
        let endpoint = self.endpoint(&["charm"]);
        self.send("update the plan", self.request(Method::POST, endpoint).json(&body))
            .await?;
        Ok(())
    }

    async fn get(&self, url: &PlanUrl) -> Result<Vec<Plan>> {
        url.validate()?;
        let [owner, name] = url.path_segments();
        let endpoint = self.endpoint(&["p", owner, name]);
        self.send_json("retrieve matching plans", self.request(Method::GET, endpoint))
            .await
    }

    async fn get_plans(&self, owner: &PlanOwner) -> Result<Vec<Plan>> {
        let endpoint = self.endpoint(&["p", owner.as_str()]);
        self.send_json("retrieve plans", self.request(Method::GET, endpoint))
            .await
    }

    async fn get_plan_details(&self, id: &PlanId) -> Result<PlanDetails> {
        id.url().validate()?;
        let endpoint = self.endpoint(&["p", id.owner(), id.name(), "details"]);
        let mut request = self.request(Method::GET, endpoint);
        if id.has_revision() {
            request = request.query(&[("revision", id.revision())]);
        }
        self.send_json("retrieve plan details", request).await
    }

    async fn get_plan_revisions(&self, url: &PlanUrl) -> Result<Vec<Plan>> {
        url.validate()?;
        let [owner, name] = url.path_segments();
        let endpoint = self.endpoint(&["p", owner, name, "revisions"]);
        self.send_json("retrieve plan revisions", self.request(Method::GET, endpoint))
            .await
    }

    async fn get_default_plan(&self, charm_url: &str) -> Result<Plan> {
        let endpoint = self.endpoint(&["charm", "default"]);
        let request = self
            .request(Method::GET, endpoint)
            .query(&[("charm-url", charm_url)]);
        self.send_json("retrieve default plan", request).await
    }

    async fn get_plans_for_charm(&self, charm_url: &str) -> Result<Vec<Plan>> {
        let endpoint = self.endpoint(&["charm"]);
        let request = self
            .request(Method::GET, endpoint)
            .query(&[("charm-url", charm_url)]);
        self.send_json("retrieve associated plans", request).await
    }

    async fn suspend(&self, url: &PlanUrl, all: bool, charm_urls: &[String]) -> Result<()> {
        self.suspend_resume("suspend", url, all, charm_urls).await
    }

    async fn resume(&self, url: &PlanUrl, all: bool, charm_urls: &[String]) -> Result<()> {
        self.suspend_resume("resume", url, all, charm_urls).await
    }

    async fn release(&self, id: &PlanId) -> Result<Plan> {
        id.validate()?;
        let revision = id.revision().to_string();
        let endpoint = self.endpoint(&["p", id.owner(), id.name(), revision.as_str(), "release"]);
        self.send_json("release the plan", self.request(Method::POST, endpoint))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> HttpPlanClient {
        HttpPlanClient::new(&ClientConfig::new(url)).expect("client builds")
    }

    #[test]
    fn endpoints_extend_the_base_path() {
        let c = client("http://localhost:9080/v1/");
        assert_eq!(
            c.endpoint(&["p", "testisv", "default"]).as_str(),
            "http://localhost:9080/v1/p/testisv/default"
        );

        let c = client("http://localhost:9080");
        assert_eq!(c.endpoint(&["charm"]).as_str(), "http://localhost:9080/charm");
    }

    #[test]
    fn endpoint_segments_are_escaped() {
        let c = client("http://localhost:9080/v1");
        let url = c.endpoint(&["p", "bob@external"]);
        assert_eq!(url.path(), "/v1/p/bob@external");
        let url = c.endpoint(&["p", "a b"]);
        assert_eq!(url.path(), "/v1/p/a%20b");
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = HttpPlanClient::new(&ClientConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn debug_redacts_token() {
        let mut config = ClientConfig::new("http://localhost:9080/v1");
        config.token = Some("secret".to_string());
        let c = HttpPlanClient::new(&config).unwrap();
        assert!(!format!("{c:?}").contains("secret"));
    }
}
