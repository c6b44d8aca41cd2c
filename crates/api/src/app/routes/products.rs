use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use gbau_core::{PageRequest, ProductId};
use gbau_products::{CatalogEdit, NewProduct};

use crate::app::dto::{self, ItemsKey, ListResponse, MessageResponse};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).patch(update_product).delete(remove_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> axum::response::Response {
    let page = match dto::page(query) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.products.list_products(page).await {
        Ok(listing) => Json(ListResponse::new(listing, ItemsKey::Products)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> axum::response::Response {
    let input = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.products.insert_product(ctx.actor(), input).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.products.get_product(id).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<CatalogEdit>, JsonRejection>,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let edit = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.products.update_product(ctx.actor(), id, edit).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.products.remove_product(ctx.actor(), id).await {
        Ok(message) => Json(MessageResponse { message }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
