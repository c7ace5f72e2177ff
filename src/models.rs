use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifier::{IdentifierError, PlanUrl};

/// A rating plan as stored by the plan service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    #[serde(default)]
    pub id: String, // owner/name/revision
    #[serde(default)]
    pub url: String, // owner/name
    #[serde(rename = "plan", default)]
    pub definition: String, // plan definition YAML
    #[serde(rename = "created-on", default)]
    pub created_on: String, // RFC3339
    #[serde(rename = "description", default)]
    pub description: String,
    #[serde(rename = "price", default)]
    pub price: String,
    #[serde(default)]
    pub released: bool,
    #[serde(rename = "effective-time", default, skip_serializing_if = "Option::is_none")]
    pub effective_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("empty plan url")]
    EmptyUrl,
    #[error(transparent)]
    Url(#[from] IdentifierError),
    #[error("missing plan definition")]
    MissingDefinition,
}

impl Plan {
    /// New plan upload payload: only the url and definition are sent.
    pub fn upload(url: &PlanUrl, definition: impl Into<String>) -> Self {
        Plan {
            url: url.to_string(),
            definition: definition.into(),
            ..Plan::default()
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.url.is_empty() {
            return Err(PlanError::EmptyUrl);
        }
        PlanUrl::parse(&self.url)?;
        if self.definition.is_empty() {
            return Err(PlanError::MissingDefinition);
        }
        Ok(())
    }
}

/// A lifecycle event: who did what, and when.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub user: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub time: DateTime<Utc>,
}

/// A charm a plan is attached to, with its attach history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CharmPlanDetail {
    #[serde(rename = "charm")]
    pub charm_url: String,
    pub attached: Event,
    #[serde(rename = "effective-since", default, skip_serializing_if = "Option::is_none")]
    pub effective_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A plan together with its history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlanDetails {
    pub plan: Plan,
    #[serde(rename = "created-event")]
    pub created: Event,
    #[serde(rename = "released-event", default, skip_serializing_if = "Option::is_none")]
    pub released: Option<Event>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charms: Vec<CharmPlanDetail>,
}

/// Body of a suspend or resume request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SuspendResumeRequest {
    pub all: bool,
    pub charms: Vec<String>,
}

/// Body of an attach (add charm) request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddCharmRequest {
    #[serde(rename = "plan-url")]
    pub plan_url: String,
    #[serde(rename = "charm-url")]
    pub charm_url: String,
    pub default: bool,
}
