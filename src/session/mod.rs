//! Session module — short-lived credential exchange for the chat widget

pub mod client;

pub use client::{
    extract_error_detail, validate_workflow_id, SessionClient, CREATE_SESSION_PATH,
    WORKFLOW_PLACEHOLDER_PREFIX,
};
