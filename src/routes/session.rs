use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::session_dto::{
    AnswerRequest, AnswerResponse, CreateSessionResponse, FinishRequest, FlagResponse,
    SessionSnapshot, VerifyRequest,
};
use crate::error::{Error, Result};
use crate::services::session_service::FinishOutcome;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/sessions",
    responses(
        (status = 201, description = "Session created in the login step", body = Json<CreateSessionResponse>)
    )
)]
#[axum::debug_handler]
pub async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let handle = state.registry.create().await;
    let snapshot = handle.snapshot().await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: handle.id(),
            step: snapshot.step,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Current session state", body = Json<SessionSnapshot>),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>> {
    let handle = state.registry.get(id).await?;
    Ok(Json(handle.snapshot().await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/verify",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Candidate verified, session in the reminder step", body = Json<SessionSnapshot>),
        (status = 404, description = "Identity not registered")
    )
)]
#[axum::debug_handler]
pub async fn verify_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<SessionSnapshot>> {
    req.validate()?;
    let handle = state.registry.get(id).await?;
    handle.verify(&req.identity).await?;
    Ok(Json(handle.snapshot().await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/start",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "First test started", body = Json<SessionSnapshot>),
        (status = 409, description = "Session is not in the reminder step"),
        (status = 422, description = "No tests assigned")
    )
)]
#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>> {
    let handle = state.registry.get(id).await?;
    handle.start().await?;
    Ok(Json(handle.snapshot().await?))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}/answers",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = Json<AnswerResponse>),
        (status = 400, description = "Unknown question or option"),
        (status = 409, description = "Session is not in the quiz step")
    )
)]
#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>> {
    req.validate()?;
    let handle = state.registry.get(id).await?;
    handle.answer(req.question_index, &req.option).await?;
    Ok(Json(AnswerResponse {
        saved: true,
        question_index: req.question_index,
        option: req.option,
    }))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/flags/{index}",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("index" = usize, Path, description = "Question index within the current test")
    ),
    responses(
        (status = 200, description = "Flag toggled", body = Json<FlagResponse>)
    )
)]
#[axum::debug_handler]
pub async fn toggle_flag(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<FlagResponse>> {
    let handle = state.registry.get(id).await?;
    let flagged = handle.toggle_flag(index).await?;
    Ok(Json(FlagResponse {
        question_index: index,
        flagged,
    }))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/finish",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = FinishRequest,
    responses(
        (status = 200, description = "Test finished", body = Json<SessionSnapshot>),
        (status = 400, description = "Malformed request body"),
        (status = 409, description = "Unanswered questions need confirmation, or wrong step")
    )
)]
#[axum::debug_handler]
pub async fn finish_test(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: std::result::Result<Json<FinishRequest>, JsonRejection>,
) -> Result<Response> {
    // A bodiless POST means no confirmation; anything sent must parse.
    let req = match body {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => FinishRequest::default(),
        Err(rejection) => return Err(Error::BadRequest(rejection.body_text())),
    };
    let handle = state.registry.get(id).await?;
    match handle.finish(req.confirm_unanswered).await? {
        FinishOutcome::NeedsConfirmation { unanswered } => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "unanswered_questions",
                "message": "Some questions have not been answered yet",
                "unanswered": unanswered,
            })),
        )
            .into_response()),
        FinishOutcome::Finished(_) => Ok(Json(handle.snapshot().await?).into_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/next",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Next test started or session completed", body = Json<SessionSnapshot>),
        (status = 409, description = "Session is not in the finished step")
    )
)]
#[axum::debug_handler]
pub async fn next_test(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>> {
    let handle = state.registry.get(id).await?;
    handle.next().await?;
    Ok(Json(handle.snapshot().await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/reset",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session back in the login step", body = Json<SessionSnapshot>)
    )
)]
#[axum::debug_handler]
pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>> {
    let handle = state.registry.get(id).await?;
    handle.reset().await?;
    Ok(Json(handle.snapshot().await?))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.registry.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
