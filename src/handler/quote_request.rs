// handler/quote_request.rs
use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::requestdtos::*,
    error::HttpError,
    extractors::{JsonBody, PathParam},
    middleware::{client_only, technician_only, JWTAuthMiddeware},
    AppState,
};

pub fn quote_request_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_quote_request)
                .layer(middleware::from_fn(client_only))
                .get(list_quote_requests),
        )
        .route("/:request_id", get(get_quote_request))
        .route(
            "/:request_id/review",
            put(review_quote_request).layer(middleware::from_fn(technician_only)),
        )
        .route(
            "/:request_id/quote",
            put(submit_quote).layer(middleware::from_fn(technician_only)),
        )
        .route("/:request_id/status", put(update_quote_status))
}

pub async fn create_quote_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    JsonBody(body): JsonBody<CreateQuoteRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let request = app_state
        .lifecycle_service
        .create_quote_request(&auth.user.actor(), body.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Quote request created successfully", request)),
    ))
}

pub async fn list_quote_requests(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let requests = app_state
        .lifecycle_service
        .list_quote_requests(&auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Quote requests retrieved successfully",
        requests,
    )))
}

pub async fn get_quote_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .lifecycle_service
        .get_quote_request(request_id, &auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Quote request retrieved successfully",
        request,
    )))
}

pub async fn review_quote_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .lifecycle_service
        .review_quote_request(request_id, &auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Quote request claimed for review",
        request,
    )))
}

pub async fn submit_quote(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<SubmitQuoteDto>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .lifecycle_service
        .quote_request(request_id, &auth.user.actor(), body.quoted_price)
        .await?;

    Ok(Json(ApiResponse::success(
        "Quote submitted successfully",
        request,
    )))
}

pub async fn update_quote_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateQuoteStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .lifecycle_service
        .resolve_quote_request(request_id, &auth.user.actor(), body.status.trim(), body.quoted_price)
        .await?;

    Ok(Json(ApiResponse::success(
        "Quote request updated successfully",
        request,
    )))
}
