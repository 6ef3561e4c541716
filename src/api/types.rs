//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::user::{User, UserId, UserSettings};

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Whether subtask generation calls a model (otherwise fallback lists only)
    pub ai_generation_configured: bool,

    /// Whether tasks survive a restart
    pub persistent_store: bool,
}

/// Login request.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,
}

impl UserResponse {
    pub fn new(user: User, settings: Option<UserSettings>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            settings,
        }
    }
}

/// Login response with both tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Body of `POST /tasks/:id/generate-subtasks`. The whole body is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateSubtasksRequest {
    pub num_subtasks: Option<usize>,
}

/// Confirmation returned by delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: String,
    pub message: String,
}
