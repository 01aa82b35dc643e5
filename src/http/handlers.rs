//! Request handlers.
//!
//! `/query` runs after `rate_limit_middleware`, which has already resolved
//! the client address and charged its bucket. From there a request moves
//! through method check → decode → validate → dispatch → response, and any
//! failed step ends it.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tower::{timeout::error::Elapsed, BoxError};

use crate::http::request::RequestIdExt;
use crate::http::response::{format_answer, ApiError, QueryResponse};
use crate::http::server::AppState;
use crate::lookup::RequestPayload;
use crate::observability::metrics;
use crate::resilience::timeouts::CallContext;
use crate::security::client_ip::{resolve_client_ip, ClientAddr};

/// `POST /query`.
pub async fn query_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let (status, response) = match handle_query(&state, addr, request).await {
        Ok(resp) => (resp.status_code(), resp.into_response()),
        Err(err) => (err.status_code(), err.into_response()),
    };
    metrics::record_request("query", status.as_u16(), start);
    response
}

async fn handle_query(
    state: &AppState,
    addr: SocketAddr,
    request: Request<Body>,
) -> Result<QueryResponse, ApiError> {
    let request_id = request.headers().request_id().to_string();
    let client = match request.extensions().get::<ClientAddr>() {
        Some(ClientAddr(client)) => client.clone(),
        None => resolve_client_ip(request.headers(), &addr.to_string(), &state.proxies),
    };

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        client = %client,
        "Query request received"
    );

    if request.method() != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let body = axum::body::to_bytes(request.into_body(), state.max_body_bytes)
        .await
        .map_err(|e| {
            tracing::info!(request_id = %request_id, client = %client, error = %e, "Unreadable request body");
            ApiError::undecodable(format!("failed to read request body: {}", e))
        })?;

    let payload: RequestPayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::info!(request_id = %request_id, client = %client, error = %e, "Undecodable request payload");
        ApiError::undecodable(e.to_string())
    })?;

    let lookup = match payload.validate() {
        Ok(lookup) => lookup,
        Err(e) => {
            tracing::info!(
                request_id = %request_id,
                nameserver = %payload.nameserver,
                name = %payload.name,
                transport = %payload.transport,
                client = %client,
                error = %e,
                "Rejected query payload"
            );
            return Err(ApiError::BadRequest {
                request: payload,
                message: e.to_string(),
            });
        }
    };

    tracing::info!(
        request_id = %request_id,
        nameserver = %lookup.nameserver,
        name = %lookup.name,
        record_type = %lookup.record_type,
        transport = %lookup.transport,
        dnssec = lookup.dnssec,
        short = lookup.short,
        json = lookup.json,
        client = %client,
        "Query payload"
    );

    // The guard cancels the lookup if this future is dropped (client gone,
    // outer timeout) before the tool finishes.
    let ctx = CallContext::with_timeout(state.dispatcher.timeout() + state.safety_margin);
    let _cancel_guard = ctx.cancel_on_drop();

    let invocation = state.commands.build(&lookup);
    let result = state.dispatcher.dispatch(&ctx, &invocation).await;

    if result.output.is_empty() {
        tracing::info!(
            request_id = %request_id,
            nameserver = %lookup.nameserver,
            name = %lookup.name,
            record_type = %lookup.record_type,
            transport = %lookup.transport,
            dnssec = lookup.dnssec,
            client = %client,
            error = ?result.error.as_ref().map(ToString::to_string),
            "Empty resolver response"
        );
    }

    if let Some(error) = result.error {
        tracing::error!(
            request_id = %request_id,
            nameserver = %lookup.nameserver,
            name = %lookup.name,
            transport = %lookup.transport,
            client = %client,
            command = %result.command,
            error = %error,
            "Lookup execution failed"
        );
        return Ok(QueryResponse::dispatch_failed(
            payload,
            result.command,
            error.to_string(),
        ));
    }

    let answer = format_answer(&result.output, lookup.json);
    Ok(QueryResponse::answered(payload, result.command, answer))
}

/// `GET /healthz`, `GET /health`.
pub async fn health_handler(request: Request<Body>) -> Json<Value> {
    tracing::debug!(
        request_id = %request.headers().request_id(),
        method = %request.method(),
        path = %request.uri().path(),
        "Health check"
    );
    Json(json!({ "status": "ok" }))
}

/// Turn a failure from the timeout middleware into a JSON error response.
///
/// Dropping the handler future cancels its lookup context, so the tool
/// process is already being killed when this runs.
pub async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request exceeded the whole-request timeout");
        ApiError::TimedOut
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::Internal(format!("internal error: {}", err))
    }
}
