use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use gbau_core::{PageRequest, VariantId};
use gbau_infra::services::{VariantUpdate, VariantUpload};

use crate::app::dto::{self, ItemsKey, ListResponse, MessageResponse};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_variants).post(create_variant))
        .route("/:id", get(get_variant).patch(update_variant).delete(delete_variant))
}

pub async fn list_variants(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> axum::response::Response {
    let page = match dto::page(query) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.variants.list_variants(page).await {
        Ok(listing) => Json(ListResponse::new(listing, ItemsKey::Variants)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    payload: Result<Json<VariantUpload>, JsonRejection>,
) -> axum::response::Response {
    let input = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.variants.insert_variant(ctx.actor(), input).await {
        Ok(variant) => (StatusCode::CREATED, Json(variant)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: VariantId = match dto::parse_id(&id, "variant") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.variants.get_variant(id).await {
        Ok(variant) => Json(variant).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<VariantUpdate>, JsonRejection>,
) -> axum::response::Response {
    let id: VariantId = match dto::parse_id(&id, "variant") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let update = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.variants.update_variant(ctx.actor(), id, update).await {
        Ok(variant) => Json(variant).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: VariantId = match dto::parse_id(&id, "variant") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.variants.delete_variant(ctx.actor(), id).await {
        Ok(message) => Json(MessageResponse { message }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
