// db/userdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::{Participant, ServiceSummary};

/// Read access to the accounts service's user records.
#[async_trait]
pub trait ParticipantExt: Send + Sync {
    async fn get_participant(&self, user_id: Uuid) -> Result<Option<Participant>, Error>;
}

/// Read access to the service catalog.
#[async_trait]
pub trait CatalogExt: Send + Sync {
    async fn get_service_summary(&self, service_id: Uuid) -> Result<Option<ServiceSummary>, Error>;
}

#[async_trait]
impl ParticipantExt for DBClient {
    async fn get_participant(&self, user_id: Uuid) -> Result<Option<Participant>, Error> {
        sqlx::query_as::<_, Participant>(
            r#"
            SELECT id, name, role, avatar_url,
                   COALESCE(specialties, '{}'::text[]) AS specialties
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait]
impl CatalogExt for DBClient {
    async fn get_service_summary(&self, service_id: Uuid) -> Result<Option<ServiceSummary>, Error> {
        sqlx::query_as::<_, ServiceSummary>(
            r#"
            SELECT id, name, category
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
    }
}
