//! Mapping of invocation results to HTTP responses
//!
//! - success: the operation's success code with the output as JSON
//! - validation failure: 400 `ValidationException` with every violation
//! - typed error: the error shape's status with `__type` and its payload
//! - fault: 500 `InternalFailure`, no detail
//!
//! Every error response names its type in both the `__type` member and the
//! `x-amzn-errortype` header.

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use string_wizard_contract::StaticResponse;
use string_wizard_handlers::DispatchError;

use crate::error::RequestError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

const INTERNAL_MESSAGE: &str = "Internal server error";

fn base_headers(request_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    headers
}

fn error_response(status: StatusCode, error_type: &str, body: Value, request_id: &str) -> Response {
    let mut headers = base_headers(request_id);
    if let Ok(value) = HeaderValue::from_str(error_type) {
        headers.insert(ERROR_TYPE_HEADER, value);
    }
    (status, headers, Json(body)).into_response()
}

pub fn success(code: u16, output: Value, request_id: &str) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
    (status, base_headers(request_id), Json(output)).into_response()
}

pub fn dispatch_error(error: &DispatchError, request_id: &str) -> Response {
    match error {
        DispatchError::Validation(failure) => error_response(
            StatusCode::BAD_REQUEST,
            "ValidationException",
            json!({
                "__type": "ValidationException",
                "message": failure.to_string(),
                "violations": failure.violations,
            }),
            request_id,
        ),
        DispatchError::Typed(typed) => {
            let mut body = Map::new();
            body.insert("__type".into(), json!(typed.name));
            if let Value::Object(payload) = &typed.payload {
                for (key, value) in payload {
                    body.insert(key.clone(), value.clone());
                }
            }
            let status =
                StatusCode::from_u16(typed.http_status).unwrap_or(StatusCode::BAD_REQUEST);
            error_response(status, &typed.name, Value::Object(body), request_id)
        }
        DispatchError::Fault { .. } => fault(StatusCode::INTERNAL_SERVER_ERROR, request_id),
    }
}

pub fn request_error(error: &RequestError, request_id: &str) -> Response {
    if let RequestError::Timeout(_) = error {
        return fault(error.status_code(), request_id);
    }
    error_response(
        error.status_code(),
        error.error_type(),
        json!({
            "__type": error.error_type(),
            "message": error.public_message(),
        }),
        request_id,
    )
}

fn fault(status: StatusCode, request_id: &str) -> Response {
    error_response(
        status,
        "InternalFailure",
        json!({ "__type": "InternalFailure", "message": INTERNAL_MESSAGE }),
        request_id,
    )
}

/// Fixed response of a static route
pub fn static_route(response: &StaticResponse, request_id: &str) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let mut headers = base_headers(request_id);
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid static route header"),
        }
    }

    match &response.body {
        Some(body) => (status, headers, Json(body.clone())).into_response(),
        None => (status, headers).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use string_wizard_contract::{ValidationFailure, Violation, ViolationCode};
    use string_wizard_handlers::TypedError;

    #[test]
    fn test_typed_error_headers() {
        let error = DispatchError::Typed(TypedError {
            name: "PalindromeException".to_string(),
            http_status: 400,
            payload: json!({ "message": "Cannot handle palindrome" }),
        });
        let response = dispatch_error(&error, "req-1");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[ERROR_TYPE_HEADER], "PalindromeException");
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-1");
    }

    #[test]
    fn test_validation_status() {
        let error = DispatchError::Validation(ValidationFailure::new(
            "Echo",
            vec![Violation::new(
                "string",
                ViolationCode::RequiredMemberMissing,
                "missing",
            )],
        ));
        let response = dispatch_error(&error, "req-2");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[ERROR_TYPE_HEADER], "ValidationException");
    }

    #[test]
    fn test_fault_and_timeout() {
        let fault = dispatch_error(
            &DispatchError::Fault {
                fault_id: "f".to_string(),
            },
            "req-3",
        );
        assert_eq!(fault.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let timeout = request_error(&RequestError::Timeout(5), "req-4");
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.headers()[ERROR_TYPE_HEADER], "InternalFailure");
    }

    #[test]
    fn test_static_route_headers() {
        let mut response = StaticResponse {
            status: 204,
            headers: Default::default(),
            body: None,
        };
        response
            .headers
            .insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
        let http = static_route(&response, "req-5");
        assert_eq!(http.status(), StatusCode::NO_CONTENT);
        assert_eq!(http.headers()["access-control-allow-origin"], "*");
    }
}
