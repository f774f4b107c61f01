//! HTTP client for the Schematics REST API
//!
//! Every operation takes the endpoint (base URL) explicitly, so calls that
//! target different regions never share mutable client state.

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use schematics_core::provider::{ProviderError, ProviderResult};

use crate::config::ProviderConfig;
use crate::models::{
    Action, Agent, AgentJob, AgentJobKind, Inventory, Job, Policy, PolicyList, ResourceQuery,
    Workspace, WorkspaceInputs,
};

/// Maximum length of a response body kept in errors and logs
const MAX_LOG_BODY_LENGTH: usize = 200;

const REFRESH_TOKEN_HEADER: &str = "refresh_token";

const GITHUB_TOKEN_HEADER: &str = "X-Github-token";

/// Error returned by a single API call
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned HTTP {status}: {message}")]
    Status {
        status: u16,
        method: Method,
        url: String,
        message: String,
    },

    #[error("failed to decode response of {method} {url}: {source}")]
    Decode {
        method: Method,
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// 404 is the only status with special meaning
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Truncate a response body before it ends up in an error or a log line
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };
    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull a human readable message out of an error body
fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let message = json
            .get("message")
            .or_else(|| json.get("errors").and_then(|e| e.get(0)).and_then(|e| e.get("message")))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return sanitize_for_log(message);
        }
    }
    if body.is_empty() {
        "empty response".to_string()
    } else {
        sanitize_for_log(body)
    }
}

/// Schematics API client
#[derive(Clone)]
pub struct SchematicsClient {
    http: reqwest::Client,
    authorization: String,
    refresh_token: Option<String>,
}

impl std::fmt::Debug for SchematicsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchematicsClient").finish_non_exhaustive()
    }
}

impl SchematicsClient {
    /// Create a client from the configured IAM tokens
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let token = config
            .iam_access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::session("IAM access token is not configured"))?;

        let authorization = if token.starts_with("Bearer ") {
            token.to_string()
        } else {
            format!("Bearer {}", token)
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("schematics-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::session("failed to create HTTP client").with_cause(e))?;

        Ok(Self {
            http,
            authorization,
            refresh_token: config.iam_refresh_token.clone(),
        })
    }

    fn call(&self, method: Method, endpoint: &str, path: &str) -> Call<'_> {
        let url = format!("{}{}", endpoint, path);
        let builder = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, &self.authorization);
        Call {
            client: self,
            builder,
            method,
            url,
        }
    }

    // =========================================================================
    // Agents
    // =========================================================================

    pub async fn create_agent(&self, endpoint: &str, agent: &Agent) -> Result<Agent, ApiError> {
        self.call(Method::POST, endpoint, "/v2/agents")
            .json(agent)
            .send()
            .await
    }

    pub async fn get_agent(&self, endpoint: &str, agent_id: &str) -> Result<Agent, ApiError> {
        self.call(Method::GET, endpoint, &format!("/v2/agents/{}", agent_id))
            .query("profile", "detailed")
            .send()
            .await
    }

    pub async fn update_agent(
        &self,
        endpoint: &str,
        agent_id: &str,
        agent: &Agent,
    ) -> Result<Agent, ApiError> {
        self.call(Method::PUT, endpoint, &format!("/v2/agents/{}", agent_id))
            .with_refresh_token()
            .json(agent)
            .send()
            .await
    }

    pub async fn delete_agent(&self, endpoint: &str, agent_id: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, endpoint, &format!("/v2/agents/{}", agent_id))
            .with_refresh_token()
            .query("force", "true")
            .send_empty()
            .await
    }

    /// Start a job that destroys the resources created by an agent deployment
    pub async fn delete_agent_resources(
        &self,
        endpoint: &str,
        agent_id: &str,
    ) -> Result<(), ApiError> {
        self.call(
            Method::DELETE,
            endpoint,
            &format!("/v2/agents/{}/resources", agent_id),
        )
        .with_refresh_token()
        .send_empty()
        .await
    }

    /// Trigger a deploy (PUT), health check (PUT) or prerequisite scan (POST)
    pub async fn trigger_agent_job(
        &self,
        endpoint: &str,
        agent_id: &str,
        kind: AgentJobKind,
        force: Option<bool>,
    ) -> Result<AgentJob, ApiError> {
        let method = match kind {
            AgentJobKind::Deploy | AgentJobKind::Health => Method::PUT,
            AgentJobKind::Prs => Method::POST,
        };
        let mut call = self
            .call(
                method,
                endpoint,
                &format!("/v2/agents/{}/{}", agent_id, kind.segment()),
            )
            .with_refresh_token();
        if let Some(force) = force {
            call = call.query("force", if force { "true" } else { "false" });
        }
        call.send().await
    }

    pub async fn get_agent_job(
        &self,
        endpoint: &str,
        agent_id: &str,
        kind: AgentJobKind,
    ) -> Result<AgentJob, ApiError> {
        self.call(
            Method::GET,
            endpoint,
            &format!("/v2/agents/{}/{}", agent_id, kind.segment()),
        )
        .send()
        .await
    }

    // =========================================================================
    // Policies
    // =========================================================================

    pub async fn create_policy(&self, endpoint: &str, policy: &Policy) -> Result<Policy, ApiError> {
        self.call(Method::POST, endpoint, "/v2/settings/policies")
            .json(policy)
            .send()
            .await
    }

    pub async fn get_policy(&self, endpoint: &str, policy_id: &str) -> Result<Policy, ApiError> {
        self.call(
            Method::GET,
            endpoint,
            &format!("/v2/settings/policies/{}", policy_id),
        )
        .send()
        .await
    }

    pub async fn update_policy(
        &self,
        endpoint: &str,
        policy_id: &str,
        patch: &Policy,
    ) -> Result<Policy, ApiError> {
        self.call(
            Method::PATCH,
            endpoint,
            &format!("/v2/settings/policies/{}", policy_id),
        )
        .json(patch)
        .send()
        .await
    }

    pub async fn delete_policy(&self, endpoint: &str, policy_id: &str) -> Result<(), ApiError> {
        self.call(
            Method::DELETE,
            endpoint,
            &format!("/v2/settings/policies/{}", policy_id),
        )
        .send_empty()
        .await
    }

    pub async fn list_policies(
        &self,
        endpoint: &str,
        policy_kind: Option<&str>,
    ) -> Result<PolicyList, ApiError> {
        let mut call = self.call(Method::GET, endpoint, "/v2/settings/policies");
        if let Some(kind) = policy_kind {
            call = call.query("policy_kind", kind);
        }
        call.send().await
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    pub async fn create_job(&self, endpoint: &str, job: &Job) -> Result<Job, ApiError> {
        self.call(Method::POST, endpoint, "/v2/jobs")
            .with_refresh_token()
            .json(job)
            .send()
            .await
    }

    pub async fn get_job(&self, endpoint: &str, job_id: &str) -> Result<Job, ApiError> {
        self.call(Method::GET, endpoint, &format!("/v2/jobs/{}", job_id))
            .send()
            .await
    }

    pub async fn update_job(&self, endpoint: &str, job_id: &str, job: &Job) -> Result<Job, ApiError> {
        self.call(Method::PUT, endpoint, &format!("/v2/jobs/{}", job_id))
            .with_refresh_token()
            .json(job)
            .send()
            .await
    }

    pub async fn delete_job(&self, endpoint: &str, job_id: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, endpoint, &format!("/v2/jobs/{}", job_id))
            .with_refresh_token()
            .send_empty()
            .await
    }

    // =========================================================================
    // Inventories
    // =========================================================================

    pub async fn create_inventory(
        &self,
        endpoint: &str,
        inventory: &Inventory,
    ) -> Result<Inventory, ApiError> {
        self.call(Method::POST, endpoint, "/v2/inventories")
            .json(inventory)
            .send()
            .await
    }

    pub async fn get_inventory(
        &self,
        endpoint: &str,
        inventory_id: &str,
    ) -> Result<Inventory, ApiError> {
        self.call(
            Method::GET,
            endpoint,
            &format!("/v2/inventories/{}", inventory_id),
        )
        .send()
        .await
    }

    pub async fn update_inventory(
        &self,
        endpoint: &str,
        inventory_id: &str,
        patch: &Inventory,
    ) -> Result<Inventory, ApiError> {
        self.call(
            Method::PATCH,
            endpoint,
            &format!("/v2/inventories/{}", inventory_id),
        )
        .json(patch)
        .send()
        .await
    }

    pub async fn delete_inventory(&self, endpoint: &str, inventory_id: &str) -> Result<(), ApiError> {
        self.call(
            Method::DELETE,
            endpoint,
            &format!("/v2/inventories/{}", inventory_id),
        )
        .send_empty()
        .await
    }

    // =========================================================================
    // Resource queries
    // =========================================================================

    pub async fn create_resource_query(
        &self,
        endpoint: &str,
        query: &ResourceQuery,
    ) -> Result<ResourceQuery, ApiError> {
        self.call(Method::POST, endpoint, "/v2/resources_query")
            .json(query)
            .send()
            .await
    }

    pub async fn get_resource_query(
        &self,
        endpoint: &str,
        query_id: &str,
    ) -> Result<ResourceQuery, ApiError> {
        self.call(
            Method::GET,
            endpoint,
            &format!("/v2/resources_query/{}", query_id),
        )
        .send()
        .await
    }

    pub async fn replace_resource_query(
        &self,
        endpoint: &str,
        query_id: &str,
        query: &ResourceQuery,
    ) -> Result<ResourceQuery, ApiError> {
        self.call(
            Method::PUT,
            endpoint,
            &format!("/v2/resources_query/{}", query_id),
        )
        .json(query)
        .send()
        .await
    }

    pub async fn delete_resource_query(&self, endpoint: &str, query_id: &str) -> Result<(), ApiError> {
        self.call(
            Method::DELETE,
            endpoint,
            &format!("/v2/resources_query/{}", query_id),
        )
        .send_empty()
        .await
    }

    // =========================================================================
    // Actions
    // =========================================================================

    pub async fn create_action(
        &self,
        endpoint: &str,
        action: &Action,
        github_token: Option<&str>,
    ) -> Result<Action, ApiError> {
        self.call(Method::POST, endpoint, "/v2/actions")
            .with_github_token(github_token)
            .json(action)
            .send()
            .await
    }

    pub async fn get_action(&self, endpoint: &str, action_id: &str) -> Result<Action, ApiError> {
        self.call(Method::GET, endpoint, &format!("/v2/actions/{}", action_id))
            .send()
            .await
    }

    pub async fn update_action(
        &self,
        endpoint: &str,
        action_id: &str,
        patch: &Action,
    ) -> Result<Action, ApiError> {
        self.call(Method::PATCH, endpoint, &format!("/v2/actions/{}", action_id))
            .json(patch)
            .send()
            .await
    }

    pub async fn delete_action(&self, endpoint: &str, action_id: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, endpoint, &format!("/v2/actions/{}", action_id))
            .send_empty()
            .await
    }

    // =========================================================================
    // Workspaces
    // =========================================================================

    pub async fn create_workspace(
        &self,
        endpoint: &str,
        workspace: &Workspace,
        github_token: Option<&str>,
    ) -> Result<Workspace, ApiError> {
        self.call(Method::POST, endpoint, "/v1/workspaces")
            .with_github_token(github_token)
            .json(workspace)
            .send()
            .await
    }

    pub async fn get_workspace(
        &self,
        endpoint: &str,
        workspace_id: &str,
    ) -> Result<Workspace, ApiError> {
        self.call(Method::GET, endpoint, &format!("/v1/workspaces/{}", workspace_id))
            .send()
            .await
    }

    pub async fn replace_workspace(
        &self,
        endpoint: &str,
        workspace_id: &str,
        workspace: &Workspace,
    ) -> Result<Workspace, ApiError> {
        self.call(Method::PUT, endpoint, &format!("/v1/workspaces/{}", workspace_id))
            .json(workspace)
            .send()
            .await
    }

    pub async fn update_workspace(
        &self,
        endpoint: &str,
        workspace_id: &str,
        patch: &Workspace,
    ) -> Result<Workspace, ApiError> {
        self.call(Method::PATCH, endpoint, &format!("/v1/workspaces/{}", workspace_id))
            .json(patch)
            .send()
            .await
    }

    /// Replace the inputs of one template of a workspace
    pub async fn replace_workspace_inputs(
        &self,
        endpoint: &str,
        workspace_id: &str,
        template_id: &str,
        inputs: &WorkspaceInputs,
    ) -> Result<(), ApiError> {
        self.call(
            Method::PUT,
            endpoint,
            &format!("/v1/workspaces/{}/template_data/{}/values", workspace_id, template_id),
        )
        .json(inputs)
        .send_empty()
        .await
    }

    pub async fn delete_workspace(&self, endpoint: &str, workspace_id: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, endpoint, &format!("/v1/workspaces/{}", workspace_id))
            .with_refresh_token()
            .send_empty()
            .await
    }
}

/// A request being assembled
struct Call<'a> {
    client: &'a SchematicsClient,
    builder: RequestBuilder,
    method: Method,
    url: String,
}

impl Call<'_> {
    fn query(mut self, key: &str, value: &str) -> Self {
        self.builder = self.builder.query(&[(key, value)]);
        self
    }

    fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    fn with_refresh_token(mut self) -> Self {
        if let Some(ref token) = self.client.refresh_token {
            self.builder = self.builder.header(REFRESH_TOKEN_HEADER, token);
        }
        self
    }

    fn with_github_token(mut self, token: Option<&str>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.builder = self.builder.header(GITHUB_TOKEN_HEADER, token);
        }
        self
    }

    async fn execute(self) -> Result<(Method, String, String), ApiError> {
        let Call {
            builder,
            method,
            url,
            ..
        } = self;
        log::debug!("{} {}", method, url);

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => return Err(ApiError::Transport { method, url, source }),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(source) => return Err(ApiError::Transport { method, url, source }),
        };

        if !status.is_success() {
            log::debug!(
                "{} {} returned {}: {}",
                method,
                url,
                status,
                sanitize_for_log(&body)
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                method,
                url,
                message: error_message(&body),
            });
        }

        Ok((method, url, body))
    }

    async fn send<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let (method, url, body) = self.execute().await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            method,
            url,
            source,
        })
    }

    async fn send_empty(self) -> Result<(), ApiError> {
        self.execute().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(error_message(r#"{"message": "agent not found"}"#), "agent not found");
        assert_eq!(
            error_message(r#"{"errors": [{"code": "x", "message": "bad input"}]}"#),
            "bad input"
        );
        assert_eq!(error_message(""), "empty response");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn missing_token_is_a_session_error() {
        let err = SchematicsClient::new(&ProviderConfig::default()).unwrap_err();
        assert_eq!(err.kind, schematics_core::provider::ErrorKind::Session);
    }

    #[test]
    fn bearer_prefix_is_not_doubled() {
        let config = ProviderConfig::default().with_tokens("Bearer abc", None);
        let client = SchematicsClient::new(&config).unwrap();
        assert_eq!(client.authorization, "Bearer abc");

        let config = ProviderConfig::default().with_tokens("abc", None);
        let client = SchematicsClient::new(&config).unwrap();
        assert_eq!(client.authorization, "Bearer abc");
    }
}
