use std::borrow::Cow;

use cps_core::control::ControlError;
use cps_core::services::ServiceError;
use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use serde_json::json;

/// Builds an MCP error carrying a machine-readable `kind` alongside the
/// human-readable message.
pub(crate) fn mcp_err(
    code: ErrorCode,
    kind: &str,
    message: impl Into<Cow<'static, str>>,
) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: Some(json!({ "kind": kind })),
    }
}

pub(crate) fn invalid_params(message: impl Into<Cow<'static, str>>) -> ErrorData {
    mcp_err(ErrorCode::INVALID_PARAMS, "invalid_arguments", message)
}

pub(crate) fn map_err(err: ControlError) -> ErrorData {
    let (code, kind) = match &err {
        ControlError::QueryRejected(_) => (ErrorCode::INVALID_PARAMS, "query_rejected"),
        ControlError::QuerySyntax(_) => (ErrorCode::INVALID_PARAMS, "query_syntax_error"),
        ControlError::QueryTimeout(_) => (ErrorCode::INTERNAL_ERROR, "query_timeout"),
        ControlError::EmbeddingFailure(_) => (ErrorCode::INTERNAL_ERROR, "embedding_failure"),
        ControlError::EmbeddingDimensionMismatch { .. } => {
            (ErrorCode::INTERNAL_ERROR, "embedding_dimension_mismatch")
        }
        ControlError::IndexQueryFailure(_) => (ErrorCode::INTERNAL_ERROR, "index_query_failure"),
    };
    mcp_err(code, kind, err.to_string())
}

pub(crate) fn map_service_err(err: ServiceError) -> ErrorData {
    mcp_err(
        ErrorCode::INTERNAL_ERROR,
        "store_unavailable",
        err.to_string(),
    )
}
