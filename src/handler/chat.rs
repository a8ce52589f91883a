// handler/chat.rs
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{chatdtos::*, requestdtos::ApiResponse},
    error::HttpError,
    extractors::{JsonBody, PathParam},
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/", post(send_message))
        .route(
            "/:other_user_id",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/:other_user_id/authorized", get(get_messaging_authorization))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    JsonBody(body): JsonBody<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let message = app_state
        .messaging_service
        .send_message(&auth.user, body.receiver, &body.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Message sent successfully", message)),
    ))
}

pub async fn get_conversation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(other_user_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let messages = app_state
        .messaging_service
        .list_conversation(auth.user.id, other_user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Messages retrieved successfully",
        messages,
    )))
}

pub async fn delete_conversation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(other_user_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted_count = app_state
        .messaging_service
        .delete_conversation(auth.user.id, other_user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Conversation deleted successfully",
        DeletedConversationDto { deleted_count },
    )))
}

pub async fn get_messaging_authorization(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(other_user_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let authorized = app_state
        .messaging_service
        .is_authorized(auth.user.id, other_user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Messaging authorization checked",
        MessagingAuthorizationDto { authorized },
    )))
}
