//! # TaskTune
//!
//! Task management backend with AI-assisted subtask planning.
//!
//! This library provides:
//! - Users, tasks and subtasks behind a bearer-token HTTP API
//! - Progress tracking derived from subtask completion
//! - Subtask generation through an OpenAI-compatible model, with fixed
//!   per-category lists when the model is unavailable
//!
//! ## Generation Flow
//! 1. Receive a generate request for a task via API
//! 2. Build a prompt from the task's title, notes, category and priority
//! 3. Ask the model, retrying transient failures with exponential backoff
//! 4. Fall back to the category list when unconfigured or out of attempts
//! 5. Store each title as a subtask and reconcile the task's progress
//!
//! ## Modules
//! - `planner`: prompt, fallback lists and the generation state machine
//! - `llm`: chat-completion client trait and the OpenAI adapter
//! - `task`: task/subtask types and progress reconciliation
//! - `store`: in-memory and SQLite persistence
//! - `service`: ownership-checked orchestration
//! - `auth`: password hashing and JWTs
//! - `api`: axum router and handlers

pub mod api;
pub mod auth;
pub mod config;
pub mod llm;
pub mod planner;
pub mod service;
pub mod store;
pub mod task;
pub mod user;

pub use config::Config;
pub use planner::{GenerationRequest, SubtaskGenerator};
pub use service::{ServiceError, TaskService};
