use std::str::FromStr;

use axum::Json;
use axum::extract::Query;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use gbau_core::{DomainError, PageRequest};
use gbau_infra::services::Listing;
use gbau_sales::LineRequest;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: String,
}

// -------------------------
// Response DTOs
// -------------------------

/// A listing page keyed by resource name, e.g. `{"products": [...], "pages": 2, ...}`.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    #[serde(flatten)]
    pub items: ItemsKey<T>,
    pub pages: u64,
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemsKey<T> {
    Products(Vec<T>),
    Variants(Vec<T>),
    Orders(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn new(listing: Listing<T>, key: fn(Vec<T>) -> ItemsKey<T>) -> Self {
        Self {
            items: key(listing.items),
            pages: listing.pages,
            prev: listing.prev,
            next: listing.next,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// -------------------------
// Extraction helpers
// -------------------------

pub fn parse_id<T>(raw: &str, what: &'static str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

/// Unwrap a JSON body, reporting every rejection as a 400 validation error.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text()))
}

pub fn page(query: Result<Query<PageRequest>, QueryRejection>) -> Result<PageRequest, axum::response::Response> {
    query
        .map(|Query(value)| value)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text()))
}
