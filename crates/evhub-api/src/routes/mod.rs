//! # API Route Modules
//!
//! - `events`: create, list, read, and update events.
//! - `files`: attach a file to an event or detach one.
//! - `assets`: the static front-end under `/` and `/assets/*`.

pub mod assets;
pub mod events;
pub mod files;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `{"result":"ok"}` acknowledgement for mutations without a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub result: String,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self {
            result: "ok".to_string(),
        }
    }
}
