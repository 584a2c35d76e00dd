//! Append-only audit trail entries attached to a certificate.

use crate::domain::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Issued,
    Updated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Issued => "issued",
            AuditAction::Updated => "updated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issued" => Some(AuditAction::Issued),
            "updated" => Some(AuditAction::Updated),
            _ => None,
        }
    }
}

/// Who performed an action.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: Option<Role>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub certificate_id: String,
    pub action: AuditAction,
    pub actor: Actor,
    #[schema(value_type = Object)]
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(certificate_id: &str, action: AuditAction, actor: Actor, details: JsonValue) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            certificate_id: certificate_id.to_string(),
            action,
            actor,
            details,
            created_at: Utc::now(),
        }
    }
}
