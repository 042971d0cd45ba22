use axum::Json;
use serde::Serialize;

use crate::version::{GIT_VERSION, PKG_VERSION};

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    git_version: &'static str,
}

impl ServiceHealth {
    fn up() -> Self {
        Self {
            status: "ok",
            service: "fitos",
            version: PKG_VERSION,
            git_version: GIT_VERSION,
        }
    }
}

/// Liveness probe; answers without touching the store or the text generator.
pub async fn health_check() -> Json<ServiceHealth> {
    Json(ServiceHealth::up())
}
