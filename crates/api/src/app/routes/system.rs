use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::ActorContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<ActorContext>) -> impl IntoResponse {
    let actor = ctx.actor();
    Json(serde_json::json!({
        "actor": actor.to_string(),
        "role": actor.role().as_str(),
        "subject": actor.subject().to_string(),
    }))
}
