//! Axum router and all HTTP handlers for lgk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers validate transport concerns (headers, path
//! ids) and delegate everything else to `WaiverService`. The caller identity
//! comes from `X-User-Id`, the idempotency key from `Idempotency-Key` —
//! authentication itself lives upstream of this daemon.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use lgk_waivers::{SubmitClaimInput, UpdateClaimInput, WaiverError};
use tokio_stream::wrappers::BroadcastStream;
use tracing::error;

use crate::{
    api_types::{
        BudgetListResponse, ClaimResponse, ClaimsResponse, ErrorResponse, HealthResponse,
        InitializeResponse, LeagueClaimsResponse, PriorityListResponse, ProcessResponse,
        ReorderClaimsRequest, SubmitClaimRequest, UpdateClaimRequest, WireListResponse,
    },
    state::AppState,
};

pub const USER_HEADER: &str = "x-user-id";
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route(
            "/v1/leagues/:league_id/waivers/claims",
            post(submit_claim).get(my_claims),
        )
        .route(
            "/v1/leagues/:league_id/waivers/claims/all",
            get(league_claims),
        )
        .route(
            "/v1/leagues/:league_id/waivers/claims/reorder",
            post(reorder_claims),
        )
        .route(
            "/v1/leagues/:league_id/waivers/claims/:claim_id",
            axum::routing::put(update_claim).delete(cancel_claim),
        )
        .route("/v1/leagues/:league_id/waivers/priority", get(priority_list))
        .route("/v1/leagues/:league_id/waivers/faab", get(budget_list))
        .route("/v1/leagues/:league_id/waivers/wire", get(wire_list))
        .route(
            "/v1/leagues/:league_id/waivers/initialize",
            post(initialize_league),
        )
        .route("/v1/leagues/:league_id/waivers/process", post(process_league))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Transport helpers
// ---------------------------------------------------------------------------

fn user_id_from(headers: &HeaderMap) -> Result<i64, WaiverError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| WaiverError::forbidden("missing or invalid X-User-Id header"))
}

fn idempotency_key_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn error_status(err: &WaiverError) -> StatusCode {
    match err {
        WaiverError::Forbidden(_) => StatusCode::FORBIDDEN,
        WaiverError::NotFound(_) => StatusCode::NOT_FOUND,
        WaiverError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WaiverError::Conflict(_) => StatusCode::CONFLICT,
        WaiverError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: WaiverError) -> Response {
    if let WaiverError::Internal(inner) = &err {
        error!(error = %inner, "request failed");
    }
    (
        error_status(&err),
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/stream — SSE over the broadcast bus
// ---------------------------------------------------------------------------

async fn stream(
    State(st): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = st.bus.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| async move {
        let event = msg.ok()?;
        let sse = Event::default()
            .event(event.payload.kind())
            .json_data(&event)
            .ok()?;
        Some(Ok(sse))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ---------------------------------------------------------------------------
// Claim lifecycle
// ---------------------------------------------------------------------------

async fn submit_claim(
    State(st): State<Arc<AppState>>,
    Path(league_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<SubmitClaimRequest>,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };

    let input = SubmitClaimInput {
        player_id: body.player_id,
        drop_player_id: body.drop_player_id,
        bid_amount: body.bid_amount,
        idempotency_key: idempotency_key_from(&headers),
    };

    match st.service.submit_claim(league_id, user_id, input).await {
        Ok(claim) => (StatusCode::CREATED, Json(ClaimResponse { claim })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn my_claims(
    State(st): State<Arc<AppState>>,
    Path(league_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };

    match st.service.my_claims(league_id, user_id).await {
        Ok(claims) => (StatusCode::OK, Json(ClaimsResponse { claims })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn league_claims(State(st): State<Arc<AppState>>, Path(league_id): Path<i64>) -> Response {
    match st.service.league_claims(league_id).await {
        Ok(claims) => (StatusCode::OK, Json(LeagueClaimsResponse { claims })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_claim(
    State(st): State<Arc<AppState>>,
    Path((league_id, claim_id)): Path<(i64, i64)>,
    headers: HeaderMap,
    Json(body): Json<UpdateClaimRequest>,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };

    let input = UpdateClaimInput {
        bid_amount: body.bid_amount,
        drop_player_id: body.drop_player_id,
        clear_drop: body.clear_drop,
    };

    match st
        .service
        .update_claim(league_id, user_id, claim_id, input)
        .await
    {
        Ok(claim) => (StatusCode::OK, Json(ClaimResponse { claim })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn cancel_claim(
    State(st): State<Arc<AppState>>,
    Path((league_id, claim_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };

    match st.service.cancel_claim(league_id, user_id, claim_id).await {
        Ok(claim) => (StatusCode::OK, Json(ClaimResponse { claim })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn reorder_claims(
    State(st): State<Arc<AppState>>,
    Path(league_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<ReorderClaimsRequest>,
) -> Response {
    let user_id = match user_id_from(&headers) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };

    match st
        .service
        .reorder_claims(league_id, user_id, body.claim_ids)
        .await
    {
        Ok(claims) => (StatusCode::OK, Json(ClaimsResponse { claims })).into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// Reads, initialization, processing
// ---------------------------------------------------------------------------

async fn priority_list(State(st): State<Arc<AppState>>, Path(league_id): Path<i64>) -> Response {
    match st.service.priority_list(league_id).await {
        Ok(priorities) => {
            (StatusCode::OK, Json(PriorityListResponse { priorities })).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn budget_list(State(st): State<Arc<AppState>>, Path(league_id): Path<i64>) -> Response {
    match st.service.budget_list(league_id).await {
        Ok(budgets) => (StatusCode::OK, Json(BudgetListResponse { budgets })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn wire_list(State(st): State<Arc<AppState>>, Path(league_id): Path<i64>) -> Response {
    match st.service.wire_list(league_id).await {
        Ok(entries) => (StatusCode::OK, Json(WireListResponse { entries })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn initialize_league(
    State(st): State<Arc<AppState>>,
    Path(league_id): Path<i64>,
) -> Response {
    match st.service.initialize_league(league_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(InitializeResponse {
                priorities_created: outcome.priorities_created,
                budgets_created: outcome.budgets_created,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn process_league(State(st): State<Arc<AppState>>, Path(league_id): Path<i64>) -> Response {
    match st
        .service
        .process_league_claims(league_id, Utc::now())
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(ProcessResponse { summary })).into_response(),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_the_documented_status_codes() {
        assert_eq!(
            error_status(&WaiverError::forbidden("x")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_status(&WaiverError::not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&WaiverError::validation("x")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            error_status(&WaiverError::conflict("x")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&WaiverError::Internal(anyhow::anyhow!("x"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
