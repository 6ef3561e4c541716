//! HTTP API for TaskTune.
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message
//! - `GET /api/health` - Health check
//! - `POST /register`, `POST /login`, `POST /refresh` - Accounts and tokens
//! - `GET /me`, `PUT /me` - Current user profile
//! - `GET /tasks`, `POST /tasks` - List (filters `skip`, `limit`, `date`, `completed`) and create
//! - `GET /tasks/{id}`, `PUT /tasks/{id}`, `DELETE /tasks/{id}` - Read, patch, delete
//! - `POST /tasks/{id}/subtasks` - Add a subtask
//! - `POST /tasks/{id}/generate-subtasks` - Generate and store subtasks
//! - `PUT /subtasks/{id}`, `DELETE /subtasks/{id}` - Patch, delete a subtask

mod auth;
mod routes;
mod tasks;
pub mod types;

pub use routes::{build_router, serve, AppState};
pub use types::*;
