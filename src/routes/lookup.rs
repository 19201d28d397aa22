use axum::{
    extract::{Path, State},
    response::Json,
};
use validator::Validate;

use crate::dto::session_dto::{QuestionsResponse, VerifyRequest};
use crate::error::Result;
use crate::models::candidate::VerifiedCandidate;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Candidate and assigned tests", body = Json<VerifiedCandidate>),
        (status = 404, description = "Identity not registered")
    )
)]
#[axum::debug_handler]
pub async fn verify_identity(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifiedCandidate>> {
    req.validate()?;
    let verified = state.session_service.lookup(&req.identity).await?;
    Ok(Json(verified))
}

#[utoipa::path(
    get,
    path = "/api/tests/{test_id}/questions",
    params(("test_id" = String, Path, description = "Test identifier, e.g. disc")),
    responses(
        (status = 200, description = "Questions of the test; empty for unknown ids", body = Json<QuestionsResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<QuestionsResponse>> {
    let questions = state.session_service.questions(&test_id).await?;
    Ok(Json(QuestionsResponse {
        test_id,
        total_questions: questions.len(),
        questions,
    }))
}
