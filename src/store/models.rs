use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::access::{Role, Visibility};

/// Registered account. Credential material never serializes into responses.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One login. The uuid doubles as the JWT `sid` claim; a protected request
/// is only honored while the matching session is live.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_fingerprint: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Archived,
    Completed,
}

impl ProjectStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProjectStatus::Active),
            "archived" => Some(ProjectStatus::Archived),
            "completed" => Some(ProjectStatus::Completed),
            _ => None,
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Active
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub uuid: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub uuid: Uuid,
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Free-form note, optionally pinned to a project. Content is HTML that
/// already passed the allowlist check.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: i64,
    pub uuid: Uuid,
    pub owner_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Declared value type of a setting. The value itself always travels as a
/// string; `kind` tells clients how to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    String,
    Number,
    Boolean,
    Json,
}

impl SettingKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(SettingKind::String),
            "number" => Some(SettingKind::Number),
            "boolean" => Some(SettingKind::Boolean),
            "json" => Some(SettingKind::Json),
            _ => None,
        }
    }
}

impl Default for SettingKind {
    fn default() -> Self {
        SettingKind::String
    }
}

/// Keyed configuration entry. `user_id` goes to `None` when the owning user
/// is deleted; the setting itself survives for the tiers that can reach it.
#[derive(Debug, Clone, Serialize)]
pub struct Setting {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: Option<Uuid>,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: SettingKind,
    pub category: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
