// models/requestmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "direct_request_status", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum DirectRequestStatus {
    Pending,
    Assigned,
    InProcess,
    Completed,
    Cancelled,
}

impl DirectRequestStatus {
    pub fn to_str(&self) -> &str {
        match self {
            DirectRequestStatus::Pending => "pending",
            DirectRequestStatus::Assigned => "assigned",
            DirectRequestStatus::InProcess => "in_process",
            DirectRequestStatus::Completed => "completed",
            DirectRequestStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses under which the client and technician may message each other.
    pub fn engaged() -> &'static [DirectRequestStatus] {
        &[
            DirectRequestStatus::Assigned,
            DirectRequestStatus::InProcess,
            DirectRequestStatus::Completed,
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "quote_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Reviewed,
    Quoted,
    Accepted,
    Rejected,
}

impl QuoteStatus {
    pub fn to_str(&self) -> &str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Reviewed => "reviewed",
            QuoteStatus::Quoted => "quoted",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QuoteStatus::Accepted | QuoteStatus::Rejected)
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuoteStatus::Pending),
            "reviewed" => Ok(QuoteStatus::Reviewed),
            "quoted" => Ok(QuoteStatus::Quoted),
            "accepted" => Ok(QuoteStatus::Accepted),
            "rejected" => Ok(QuoteStatus::Rejected),
            other => Err(format!("unknown quote status {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub technician_id: Option<Uuid>,
    pub description: String,
    pub category: String,
    pub address: String,
    pub requested_at: DateTime<Utc>,
    pub urgency: String,
    pub client_budget: Option<f64>,
    pub final_price: Option<f64>,
    pub service_id: Option<Uuid>,
    pub status: DirectRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DirectRequest {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.technician_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub technician_id: Option<Uuid>,
    pub description: String,
    pub category: String,
    pub location: String,
    pub status: QuoteStatus,
    // Only meaningful once quoted or accepted
    pub quoted_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a direct request as submitted by the client.
#[derive(Debug, Clone)]
pub struct NewDirectRequest {
    pub description: String,
    pub category: String,
    pub address: String,
    pub requested_at: DateTime<Utc>,
    pub urgency: String,
    pub client_budget: Option<f64>,
    pub final_price: Option<f64>,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewQuoteRequest {
    pub description: String,
    pub category: String,
    pub location: String,
}

/// A conditional status update on a direct request. Applied atomically: the
/// store only writes when the current row still satisfies every guard.
#[derive(Debug, Clone)]
pub struct DirectTransition {
    pub from: &'static [DirectRequestStatus],
    pub to: DirectRequestStatus,
    pub require_client: Option<Uuid>,
    pub require_technician: Option<Uuid>,
    pub assign_technician: Option<Uuid>,
}

impl DirectTransition {
    pub fn admits(&self, record: &DirectRequest) -> bool {
        self.from.contains(&record.status)
            && self.require_client.map_or(true, |id| record.client_id == id)
            && self
                .require_technician
                .map_or(true, |id| record.technician_id == Some(id))
    }
}

#[derive(Debug, Clone)]
pub struct QuoteTransition {
    pub from: &'static [QuoteStatus],
    pub to: QuoteStatus,
    pub require_client: Option<Uuid>,
    pub require_technician: Option<Uuid>,
    pub bind_technician: Option<Uuid>,
    pub quoted_price: Option<f64>,
}

impl QuoteTransition {
    pub fn admits(&self, record: &QuoteRequest) -> bool {
        self.from.contains(&record.status)
            && self.require_client.map_or(true, |id| record.client_id == id)
            && self
                .require_technician
                .map_or(true, |id| record.technician_id == Some(id))
    }
}
