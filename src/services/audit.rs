use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RetracedConfig;
use crate::middleware::AuthUser;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Retraced request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Audited actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "degree.create")]
    DegreeCreate,
    #[serde(rename = "degree.update")]
    DegreeUpdate,
    #[serde(rename = "degree.delete")]
    DegreeDelete,
    #[serde(rename = "degree.delete_all")]
    DegreeDeleteAll,
    #[serde(rename = "degree.import")]
    DegreeImport,
}

impl AuditAction {
    pub fn crud(&self) -> Crud {
        match self {
            AuditAction::DegreeCreate => Crud::C,
            AuditAction::DegreeUpdate | AuditAction::DegreeImport => Crud::U,
            AuditAction::DegreeDelete | AuditAction::DegreeDeleteAll => Crud::D,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crud {
    C,
    U,
    D,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditGroup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditActor {
    pub id: String,
    pub name: String,
}

/// Event payload in the shape the Retraced publisher API accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub crud: Crud,
    pub group: AuditGroup,
    pub actor: AuditActor,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AuditEvent {
    /// Event performed by `user`, grouped under the user's tenant
    pub fn by(action: AuditAction, user: &AuthUser) -> Self {
        Self {
            action,
            crud: action.crud(),
            group: AuditGroup {
                id: user.database.clone(),
                name: user.tenant.clone(),
            },
            actor: AuditActor {
                id: user.user_id.to_string(),
                name: user.user.clone(),
            },
            created: Utc::now(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct ViewerTokenResponse {
    token: String,
}

/// Client for a Retraced audit-log project
#[derive(Debug, Clone)]
pub struct AuditClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    project_id: String,
}

impl AuditClient {
    /// `None` unless the endpoint, API key and project id are all configured
    pub fn from_config(config: &RetracedConfig) -> Option<Self> {
        match (&config.url, &config.api_key, &config.project_id) {
            (Some(url), Some(api_key), Some(project_id)) => Some(Self {
                client: reqwest::Client::new(),
                endpoint: url.trim_end_matches('/').to_string(),
                api_key: api_key.clone(),
                project_id: project_id.clone(),
            }),
            _ => None,
        }
    }

    fn project_url(&self, resource: &str) -> String {
        format!("{}/publisher/v1/project/{}/{}", self.endpoint, self.project_id, resource)
    }

    fn authorization(&self) -> String {
        format!("Token token={}", self.api_key)
    }

    pub async fn report_event(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.client
            .post(self.project_url("event"))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Token that lets `actor_id` browse the audit log of `group_id`
    pub async fn viewer_token(&self, group_id: &str, actor_id: &str) -> Result<String, AuditError> {
        let response: ViewerTokenResponse = self
            .client
            .get(self.project_url("viewertoken"))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .query(&[("group_id", group_id), ("actor_id", actor_id), ("is_admin", "true")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.token)
    }
}
