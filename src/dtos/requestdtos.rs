use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    requestmodel::*,
    usermodel::{ParticipantSummary, ServiceSummary},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

//Direct request DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectRequestDto {
    #[validate(length(min = 1, max = 2000, message = "Description must be between 1 and 2000 characters"))]
    pub description: String,

    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    pub request_date: DateTime<Utc>,

    #[validate(length(min = 1, message = "Urgency cannot be empty"))]
    pub urgency: Option<String>,

    #[validate(range(min = 0.0, message = "Client budget must be positive"))]
    pub client_budget: Option<f64>,

    #[validate(range(min = 0.0, message = "Final price must be positive"))]
    pub final_price: Option<f64>,

    pub service_id: Option<Uuid>,
}

impl From<CreateDirectRequestDto> for NewDirectRequest {
    fn from(dto: CreateDirectRequestDto) -> Self {
        NewDirectRequest {
            description: dto.description.trim().to_string(),
            category: dto.category.trim().to_string(),
            address: dto.address.trim().to_string(),
            requested_at: dto.request_date,
            urgency: dto.urgency.unwrap_or_else(|| "normal".to_string()),
            client_budget: dto.client_budget,
            final_price: dto.final_price,
            service_id: dto.service_id,
        }
    }
}

/// A direct request with its participants and catalog entry resolved.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DirectRequestDetails {
    #[serde(flatten)]
    pub request: DirectRequest,
    pub client: Option<ParticipantSummary>,
    pub technician: Option<ParticipantSummary>,
    pub service: Option<ServiceSummary>,
}

//Quote request DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequestDto {
    #[validate(length(min = 1, max = 2000, message = "Description must be between 1 and 2000 characters"))]
    pub description: String,

    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,

    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
}

impl From<CreateQuoteRequestDto> for NewQuoteRequest {
    fn from(dto: CreateQuoteRequestDto) -> Self {
        NewQuoteRequest {
            description: dto.description.trim().to_string(),
            category: dto.category.trim().to_string(),
            location: dto.location.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuoteDto {
    pub quoted_price: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuoteStatusDto {
    // Free text: targets outside the lifecycle are refused by the service
    pub status: String,
    pub quoted_price: Option<f64>,
}
