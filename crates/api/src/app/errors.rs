use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gbau_core::DomainError;
use gbau_infra::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        ServiceError::Storage(e) => {
            tracing::error!(error = %e, "object storage failure");
            json_error(StatusCode::BAD_GATEWAY, "storage_error", e.to_string())
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized"),
        DomainError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbau_infra::repository::StoreError;
    use gbau_infra::storage::StorageError;

    fn status_of(err: ServiceError) -> StatusCode {
        service_error_to_response(err).status()
    }

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(status_of(DomainError::validation("x").into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::invalid_id("x").into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::not_found("x").into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::Unauthorized.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::forbidden("x").into()), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(DomainError::invariant("x").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn infrastructure_errors_map_to_server_statuses() {
        assert_eq!(status_of(StoreError::Poisoned.into()), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_of(StorageError::Upload("down".to_string()).into()),
            StatusCode::BAD_GATEWAY
        );
    }
}
