use crate::{
    types::{AppError, ChatRequest, ChatResponse, Result},
    AppState,
};
use axum::{extract::State, Json};

/// Answer a question about the documentation.
///
/// When `selection` is present it is used as the only context and the index
/// is not searched.
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if payload.question.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "question must not be empty".to_string(),
        ));
    }

    tracing::debug!(
        has_selection = payload.selection.is_some(),
        "Answering chat request"
    );

    let answer = state
        .rag
        .answer_with_sources(&payload.question, payload.selection.as_deref())
        .await;

    Ok(Json(ChatResponse {
        answer: answer.text,
        sources: answer.sources,
    }))
}
