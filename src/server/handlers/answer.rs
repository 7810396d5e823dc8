use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::rag::Answer;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

pub async fn answer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let top_k = request.top_k.unwrap_or(state.default_top_k);

    let answer = state.pipeline.answer(&request.query, top_k).await?;
    Ok(Json(answer))
}
