// db/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    chatdb::ChatExt,
    requestdb::EngagementExt,
    userdb::{CatalogExt, ParticipantExt},
};
use crate::models::{
    chatmodels::Message,
    requestmodel::*,
    usermodel::{Participant, ServiceSummary, UserRole},
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, Participant>,
    services: HashMap<Uuid, ServiceSummary>,
    direct_requests: HashMap<Uuid, DirectRequest>,
    quote_requests: HashMap<Uuid, QuoteRequest>,
    messages: Vec<Message>,
}

/// In-process stand-in for Postgres. Each conditional write runs under one
/// write lock, which gives it the same all-or-nothing behaviour as a single
/// `UPDATE … WHERE` statement.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_participant(&self, name: &str, role: UserRole, specialties: &[&str]) -> Participant {
        let participant = Participant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            role,
            avatar_url: None,
            specialties: specialties.iter().map(|s| s.to_string()).collect(),
        };
        self.tables
            .write()
            .await
            .users
            .insert(participant.id, participant.clone());
        participant
    }

    pub async fn add_service(&self, name: &str, category: &str) -> ServiceSummary {
        let service = ServiceSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
        };
        self.tables
            .write()
            .await
            .services
            .insert(service.id, service.clone());
        service
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

#[async_trait]
impl ParticipantExt for MemoryStore {
    async fn get_participant(&self, user_id: Uuid) -> Result<Option<Participant>, Error> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl CatalogExt for MemoryStore {
    async fn get_service_summary(&self, service_id: Uuid) -> Result<Option<ServiceSummary>, Error> {
        Ok(self.tables.read().await.services.get(&service_id).cloned())
    }
}

#[async_trait]
impl EngagementExt for MemoryStore {
    async fn create_direct_request(
        &self,
        client_id: Uuid,
        fields: NewDirectRequest,
    ) -> Result<DirectRequest, Error> {
        let now = Utc::now();
        let request = DirectRequest {
            id: Uuid::new_v4(),
            client_id,
            technician_id: None,
            description: fields.description,
            category: fields.category,
            address: fields.address,
            requested_at: fields.requested_at,
            urgency: fields.urgency,
            client_budget: fields.client_budget,
            final_price: fields.final_price,
            service_id: fields.service_id,
            status: DirectRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .direct_requests
            .insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_direct_request(&self, request_id: Uuid) -> Result<Option<DirectRequest>, Error> {
        Ok(self.tables.read().await.direct_requests.get(&request_id).cloned())
    }

    async fn get_client_direct_requests(&self, client_id: Uuid) -> Result<Vec<DirectRequest>, Error> {
        let tables = self.tables.read().await;
        let rows = tables
            .direct_requests
            .values()
            .filter(|r| r.client_id == client_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| r.created_at))
    }

    async fn get_technician_direct_requests(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<DirectRequest>, Error> {
        let tables = self.tables.read().await;
        let rows = tables
            .direct_requests
            .values()
            .filter(|r| r.technician_id == Some(technician_id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| r.created_at))
    }

    async fn get_available_direct_requests(
        &self,
        categories: &[String],
    ) -> Result<Vec<DirectRequest>, Error> {
        let tables = self.tables.read().await;
        let rows = tables
            .direct_requests
            .values()
            .filter(|r| {
                r.status == DirectRequestStatus::Pending
                    && r.technician_id.is_none()
                    && categories.contains(&r.category)
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| r.created_at))
    }

    async fn transition_direct_request(
        &self,
        request_id: Uuid,
        transition: &DirectTransition,
    ) -> Result<Option<DirectRequest>, Error> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.direct_requests.get_mut(&request_id) else {
            return Ok(None);
        };
        if !transition.admits(record) {
            return Ok(None);
        }

        record.status = transition.to;
        if let Some(technician_id) = transition.assign_technician {
            record.technician_id = Some(technician_id);
        }
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn has_engaged_direct_request(&self, user_a: Uuid, user_b: Uuid) -> Result<bool, Error> {
        let tables = self.tables.read().await;
        Ok(tables.direct_requests.values().any(|r| {
            let pair = (r.client_id == user_a && r.technician_id == Some(user_b))
                || (r.client_id == user_b && r.technician_id == Some(user_a));
            pair && DirectRequestStatus::engaged().contains(&r.status)
        }))
    }

    async fn create_quote_request(
        &self,
        client_id: Uuid,
        fields: NewQuoteRequest,
    ) -> Result<QuoteRequest, Error> {
        let now = Utc::now();
        let request = QuoteRequest {
            id: Uuid::new_v4(),
            client_id,
            technician_id: None,
            description: fields.description,
            category: fields.category,
            location: fields.location,
            status: QuoteStatus::Pending,
            quoted_price: None,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .quote_requests
            .insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_quote_request(&self, request_id: Uuid) -> Result<Option<QuoteRequest>, Error> {
        Ok(self.tables.read().await.quote_requests.get(&request_id).cloned())
    }

    async fn get_client_quote_requests(&self, client_id: Uuid) -> Result<Vec<QuoteRequest>, Error> {
        let tables = self.tables.read().await;
        let rows = tables
            .quote_requests
            .values()
            .filter(|r| r.client_id == client_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| r.created_at))
    }

    async fn get_technician_quote_requests(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<QuoteRequest>, Error> {
        let tables = self.tables.read().await;
        let rows = tables
            .quote_requests
            .values()
            .filter(|r| r.technician_id == Some(technician_id) || r.status == QuoteStatus::Pending)
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| r.created_at))
    }

    async fn transition_quote_request(
        &self,
        request_id: Uuid,
        transition: &QuoteTransition,
    ) -> Result<Option<QuoteRequest>, Error> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.quote_requests.get_mut(&request_id) else {
            return Ok(None);
        };
        if !transition.admits(record) {
            return Ok(None);
        }

        record.status = transition.to;
        if let Some(technician_id) = transition.bind_technician {
            record.technician_id = Some(technician_id);
        }
        if let Some(price) = transition.quoted_price {
            record.quoted_price = Some(price);
        }
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }
}

#[async_trait]
impl ChatExt for MemoryStore {
    async fn save_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message, Error> {
        let message = Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content,
            sent_at: Utc::now(),
        };
        self.tables.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn get_conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>, Error> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| in_pair(m, user_a, user_b))
            .cloned()
            .collect();
        // stable: insertion order breaks timestamp ties
        rows.sort_by_key(|m| m.sent_at);
        Ok(rows)
    }

    async fn delete_conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<u64, Error> {
        let mut tables = self.tables.write().await;
        let before = tables.messages.len();
        tables.messages.retain(|m| !in_pair(m, user_a, user_b));
        Ok((before - tables.messages.len()) as u64)
    }
}

fn in_pair(message: &Message, user_a: Uuid, user_b: Uuid) -> bool {
    (message.sender_id == user_a && message.receiver_id == user_b)
        || (message.sender_id == user_b && message.receiver_id == user_a)
}
