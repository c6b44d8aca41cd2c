use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use gbau_core::{OrderId, PageRequest};

use crate::app::dto::{self, CreateOrderRequest, ItemsKey, ListResponse, MessageResponse, UpdateOrderRequest};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(find_orders).post(create_order))
        .route("/:id", get(get_order).patch(update_order).delete(cancel_order))
}

/// Orders visible to the caller: all for admins, own for buyers and sellers.
pub async fn find_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> axum::response::Response {
    let page = match dto::page(query) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.orders.find_orders(ctx.actor(), page).await {
        Ok(listing) => Json(ListResponse::new(listing, ItemsKey::Orders)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.insert_order(ctx.actor(), body.lines).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match dto::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.get_order(ctx.actor(), id).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: OrderId = match dto::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.update_order(ctx.actor(), id, body.status).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match dto::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.cancel_order(ctx.actor(), id).await {
        Ok(message) => Json(MessageResponse { message }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
