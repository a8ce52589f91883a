// db/requestdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::requestmodel::*;

/// Persistence for direct requests and quote requests.
///
/// Status changes go through `transition_*` only. Each one is a single
/// conditional write: it returns `None` when the row no longer satisfies
/// the transition's guards, so concurrent callers get exactly one winner.
#[async_trait]
pub trait EngagementExt: Send + Sync {
    async fn create_direct_request(
        &self,
        client_id: Uuid,
        fields: NewDirectRequest,
    ) -> Result<DirectRequest, Error>;

    async fn get_direct_request(&self, request_id: Uuid) -> Result<Option<DirectRequest>, Error>;

    async fn get_client_direct_requests(&self, client_id: Uuid) -> Result<Vec<DirectRequest>, Error>;

    async fn get_technician_direct_requests(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<DirectRequest>, Error>;

    async fn get_available_direct_requests(
        &self,
        categories: &[String],
    ) -> Result<Vec<DirectRequest>, Error>;

    async fn transition_direct_request(
        &self,
        request_id: Uuid,
        transition: &DirectTransition,
    ) -> Result<Option<DirectRequest>, Error>;

    /// True when a direct request links the two users, in either role, with
    /// an engaged status.
    async fn has_engaged_direct_request(&self, user_a: Uuid, user_b: Uuid) -> Result<bool, Error>;

    async fn create_quote_request(
        &self,
        client_id: Uuid,
        fields: NewQuoteRequest,
    ) -> Result<QuoteRequest, Error>;

    async fn get_quote_request(&self, request_id: Uuid) -> Result<Option<QuoteRequest>, Error>;

    async fn get_client_quote_requests(&self, client_id: Uuid) -> Result<Vec<QuoteRequest>, Error>;

    /// Quote requests bound to the technician plus those still open for review.
    async fn get_technician_quote_requests(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<QuoteRequest>, Error>;

    async fn transition_quote_request(
        &self,
        request_id: Uuid,
        transition: &QuoteTransition,
    ) -> Result<Option<QuoteRequest>, Error>;
}

fn status_names<S, F>(statuses: &[S], name: F) -> Vec<String>
where
    F: Fn(&S) -> &str,
{
    statuses.iter().map(|s| name(s).to_string()).collect()
}

#[async_trait]
impl EngagementExt for DBClient {
    async fn create_direct_request(
        &self,
        client_id: Uuid,
        fields: NewDirectRequest,
    ) -> Result<DirectRequest, Error> {
        sqlx::query_as::<_, DirectRequest>(
            r#"
            INSERT INTO direct_requests
            (client_id, description, category, address, requested_at, urgency,
             client_budget, final_price, service_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(fields.description)
        .bind(fields.category)
        .bind(fields.address)
        .bind(fields.requested_at)
        .bind(fields.urgency)
        .bind(fields.client_budget)
        .bind(fields.final_price)
        .bind(fields.service_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_direct_request(&self, request_id: Uuid) -> Result<Option<DirectRequest>, Error> {
        sqlx::query_as::<_, DirectRequest>(
            r#"
            SELECT * FROM direct_requests WHERE id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_client_direct_requests(&self, client_id: Uuid) -> Result<Vec<DirectRequest>, Error> {
        sqlx::query_as::<_, DirectRequest>(
            r#"
            SELECT * FROM direct_requests
            WHERE client_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_technician_direct_requests(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<DirectRequest>, Error> {
        sqlx::query_as::<_, DirectRequest>(
            r#"
            SELECT * FROM direct_requests
            WHERE technician_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_available_direct_requests(
        &self,
        categories: &[String],
    ) -> Result<Vec<DirectRequest>, Error> {
        sqlx::query_as::<_, DirectRequest>(
            r#"
            SELECT * FROM direct_requests
            WHERE status = 'pending'::direct_request_status
              AND technician_id IS NULL
              AND category = ANY($1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(categories.to_vec())
        .fetch_all(&self.pool)
        .await
    }

    async fn transition_direct_request(
        &self,
        request_id: Uuid,
        transition: &DirectTransition,
    ) -> Result<Option<DirectRequest>, Error> {
        sqlx::query_as::<_, DirectRequest>(
            r#"
            UPDATE direct_requests
            SET status = $2,
                technician_id = COALESCE($3, technician_id),
                updated_at = NOW()
            WHERE id = $1
              AND status::text = ANY($4)
              AND ($5::uuid IS NULL OR client_id = $5)
              AND ($6::uuid IS NULL OR technician_id = $6)
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(transition.to)
        .bind(transition.assign_technician)
        .bind(status_names(transition.from, DirectRequestStatus::to_str))
        .bind(transition.require_client)
        .bind(transition.require_technician)
        .fetch_optional(&self.pool)
        .await
    }

    async fn has_engaged_direct_request(&self, user_a: Uuid, user_b: Uuid) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM direct_requests
                WHERE ((client_id = $1 AND technician_id = $2)
                    OR (client_id = $2 AND technician_id = $1))
                  AND status::text = ANY($3)
            )
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(status_names(DirectRequestStatus::engaged(), DirectRequestStatus::to_str))
        .fetch_one(&self.pool)
        .await
    }

    async fn create_quote_request(
        &self,
        client_id: Uuid,
        fields: NewQuoteRequest,
    ) -> Result<QuoteRequest, Error> {
        sqlx::query_as::<_, QuoteRequest>(
            r#"
            INSERT INTO quote_requests (client_id, description, category, location)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(fields.description)
        .bind(fields.category)
        .bind(fields.location)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_quote_request(&self, request_id: Uuid) -> Result<Option<QuoteRequest>, Error> {
        sqlx::query_as::<_, QuoteRequest>(
            r#"
            SELECT * FROM quote_requests WHERE id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_client_quote_requests(&self, client_id: Uuid) -> Result<Vec<QuoteRequest>, Error> {
        sqlx::query_as::<_, QuoteRequest>(
            r#"
            SELECT * FROM quote_requests
            WHERE client_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_technician_quote_requests(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<QuoteRequest>, Error> {
        sqlx::query_as::<_, QuoteRequest>(
            r#"
            SELECT * FROM quote_requests
            WHERE technician_id = $1
               OR status = 'pending'::quote_status
            ORDER BY created_at DESC
            "#,
        )
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn transition_quote_request(
        &self,
        request_id: Uuid,
        transition: &QuoteTransition,
    ) -> Result<Option<QuoteRequest>, Error> {
        sqlx::query_as::<_, QuoteRequest>(
            r#"
            UPDATE quote_requests
            SET status = $2,
                technician_id = COALESCE($3, technician_id),
                quoted_price = COALESCE($4, quoted_price),
                updated_at = NOW()
            WHERE id = $1
              AND status::text = ANY($5)
              AND ($6::uuid IS NULL OR client_id = $6)
              AND ($7::uuid IS NULL OR technician_id = $7)
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(transition.to)
        .bind(transition.bind_technician)
        .bind(transition.quoted_price)
        .bind(status_names(transition.from, QuoteStatus::to_str))
        .bind(transition.require_client)
        .bind(transition.require_technician)
        .fetch_optional(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    const PENDING: &[DirectRequestStatus] = &[DirectRequestStatus::Pending];
    const CANCELLABLE: &[DirectRequestStatus] =
        &[DirectRequestStatus::Pending, DirectRequestStatus::Assigned];

    /// Postgres-backed client, or `None` when `DATABASE_URL` is not set.
    async fn database() -> Option<DBClient> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .unwrap();
        let client = DBClient::new(pool);
        client.migrate().await.unwrap();
        Some(client)
    }

    async fn insert_user(db: &DBClient, role: &str) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (name, role) VALUES ($1, $2::user_role) RETURNING id",
        )
        .bind(format!("{role}-{}", Uuid::new_v4()))
        .bind(role)
        .fetch_one(&db.pool)
        .await
        .unwrap()
    }

    fn job() -> NewDirectRequest {
        NewDirectRequest {
            description: "Leaking kitchen sink".to_string(),
            category: "plumbing".to_string(),
            address: "12 Harbour Road".to_string(),
            requested_at: Utc::now(),
            urgency: "normal".to_string(),
            client_budget: None,
            final_price: None,
            service_id: None,
        }
    }

    #[tokio::test]
    async fn concurrent_accepts_update_one_row() {
        let Some(db) = database().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let db = Arc::new(db);
        let client_id = insert_user(&db, "client").await;
        let request = db.create_direct_request(client_id, job()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let technician_id = insert_user(&db, "technician").await;
            let db = db.clone();
            let request_id = request.id;
            handles.push(tokio::spawn(async move {
                let accept = DirectTransition {
                    from: PENDING,
                    to: DirectRequestStatus::Assigned,
                    require_client: None,
                    require_technician: None,
                    assign_technician: Some(technician_id),
                };
                db.transition_direct_request(request_id, &accept)
                    .await
                    .unwrap()
                    .map(|_| technician_id)
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            if let Some(technician_id) = handle.await.unwrap() {
                winners.push(technician_id);
            }
        }
        assert_eq!(winners.len(), 1);

        let stored = db.get_direct_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DirectRequestStatus::Assigned);
        assert_eq!(stored.technician_id, Some(winners[0]));
    }

    #[tokio::test]
    async fn owner_guard_is_part_of_the_update() {
        let Some(db) = database().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let owner = insert_user(&db, "client").await;
        let stranger = insert_user(&db, "client").await;
        let request = db.create_direct_request(owner, job()).await.unwrap();

        let cancel_as = |client_id| DirectTransition {
            from: CANCELLABLE,
            to: DirectRequestStatus::Cancelled,
            require_client: Some(client_id),
            require_technician: None,
            assign_technician: None,
        };

        let refused = db
            .transition_direct_request(request.id, &cancel_as(stranger))
            .await
            .unwrap();
        assert!(refused.is_none());

        let cancelled = db
            .transition_direct_request(request.id, &cancel_as(owner))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, DirectRequestStatus::Cancelled);

        // terminal: a second cancel matches no row
        let again = db
            .transition_direct_request(request.id, &cancel_as(owner))
            .await
            .unwrap();
        assert!(again.is_none());
    }
}
