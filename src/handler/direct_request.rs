// handler/direct_request.rs
use std::sync::Arc;

use axum::{
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

pub fn direct_request_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_direct_request)
                .layer(middleware::from_fn(client_only))
                .get(list_direct_requests),
        )
        .route(
            "/available",
            get(available_direct_requests).layer(middleware::from_fn(technician_only)),
        )
        .route("/:request_id", get(get_direct_request))
        .route(
            "/:request_id/accept",
            post(accept_direct_request).layer(middleware::from_fn(technician_only)),
        )
        .route(
            "/:request_id/start",
            put(start_direct_request).layer(middleware::from_fn(technician_only)),
        )
        .route("/:request_id/cancel", put(cancel_direct_request))
        .route(
            "/:request_id/complete",
            put(complete_direct_request).layer(middleware::from_fn(technician_only)),
        )
}

pub async fn create_direct_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    JsonBody(body): JsonBody<CreateDirectRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let request = app_state
        .lifecycle_service
        .create_direct_request(&auth.user.actor(), body.into())
        .await?;

    Ok(Json(ApiResponse::success(
        "Request created successfully",
        request,
    )))
}

pub async fn list_direct_requests(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let requests = app_state
        .lifecycle_service
        .list_direct_requests(&auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Requests retrieved successfully",
        requests,
    )))
}

pub async fn available_direct_requests(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let requests = app_state
        .lifecycle_service
        .available_direct_requests(&auth.user)
        .await?;

    Ok(Json(ApiResponse::success(
        "Available requests retrieved successfully",
        requests,
    )))
}

pub async fn get_direct_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let details = app_state
        .lifecycle_service
        .get_direct_request(request_id, &auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Request retrieved successfully",
        details,
    )))
}

pub async fn accept_direct_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .lifecycle_service
        .accept_direct_request(request_id, &auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Request accepted successfully",
        request,
    )))
}

pub async fn start_direct_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .lifecycle_service
        .start_direct_request(request_id, &auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Work on the request has started",
        request,
    )))
}

pub async fn cancel_direct_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .lifecycle_service
        .cancel_direct_request(request_id, &auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Request cancelled successfully",
        request,
    )))
}

pub async fn complete_direct_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    PathParam(request_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .lifecycle_service
        .complete_direct_request(request_id, &auth.user.actor())
        .await?;

    Ok(Json(ApiResponse::success(
        "Request completed successfully",
        request,
    )))
}
