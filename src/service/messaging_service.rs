// service/messaging_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, requestdb::EngagementExt, userdb::ParticipantExt},
    models::{
        chatmodels::{Message, MessageView},
        usermodel::Participant,
    },
    realtime::{events::ServerEvent, registry::RoomRegistry},
    service::error::ServiceError,
};

pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Conversations between a client and a technician, gated on their
/// engagement and pushed to the pair's realtime room once stored.
#[derive(Clone)]
pub struct MessagingService {
    engagements: Arc<dyn EngagementExt>,
    messages: Arc<dyn ChatExt>,
    directory: Arc<dyn ParticipantExt>,
    rooms: Arc<dyn RoomRegistry>,
}

impl std::fmt::Debug for MessagingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingService").finish_non_exhaustive()
    }
}

impl MessagingService {
    pub fn new(
        engagements: Arc<dyn EngagementExt>,
        messages: Arc<dyn ChatExt>,
        directory: Arc<dyn ParticipantExt>,
        rooms: Arc<dyn RoomRegistry>,
    ) -> Self {
        Self {
            engagements,
            messages,
            directory,
            rooms,
        }
    }

    /// True iff a direct request links the two users, in either direction,
    /// and is assigned, in process or completed.
    pub async fn is_authorized(&self, sender_id: Uuid, receiver_id: Uuid) -> Result<bool, ServiceError> {
        if sender_id == receiver_id {
            return Ok(false);
        }
        Ok(self
            .engagements
            .has_engaged_direct_request(sender_id, receiver_id)
            .await?)
    }

    pub async fn send_message(
        &self,
        sender: &Participant,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<MessageView, ServiceError> {
        if sender.id == receiver_id {
            return Err(ServiceError::InvalidInput(
                "You cannot send a message to yourself".to_string(),
            ));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::InvalidInput("Message content is required".to_string()));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ServiceError::InvalidInput(format!(
                "Message content must be at most {MAX_MESSAGE_LENGTH} characters"
            )));
        }

        let receiver = self
            .directory
            .get_participant(receiver_id)
            .await?
            .ok_or(ServiceError::UserNotFound(receiver_id))?;

        if !self.is_authorized(sender.id, receiver_id).await? {
            return Err(ServiceError::NoQualifyingEngagement);
        }

        let message = self
            .messages
            .save_message(sender.id, receiver_id, content.to_string())
            .await?;

        let view = MessageView {
            message,
            sender: sender.summary(),
            receiver: receiver.summary(),
        };

        let room = view.message.room();
        let delivered = self
            .rooms
            .publish(&room, ServerEvent::NewMessage(view.clone()))
            .await;
        tracing::debug!(message_id = %view.message.id, room = %room, delivered, "message published");

        Ok(view)
    }

    pub async fn list_conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>, ServiceError> {
        Ok(self.messages.get_conversation(user_a, user_b).await?)
    }

    pub async fn delete_conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<u64, ServiceError> {
        let deleted = self.messages.delete_conversation(user_a, user_b).await?;
        tracing::info!(user_a = %user_a, user_b = %user_b, deleted, "conversation deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        db::memory::MemoryStore,
        models::{
            chatmodels::RoomId,
            requestmodel::NewDirectRequest,
            usermodel::UserRole,
        },
        realtime::registry::InMemoryRoomRegistry,
        service::lifecycle_service::LifecycleService,
    };

    struct Fixture {
        store: Arc<MemoryStore>,
        rooms: Arc<InMemoryRoomRegistry>,
        lifecycle: LifecycleService,
        messaging: MessagingService,
        client: Participant,
        tech: Participant,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let rooms = Arc::new(InMemoryRoomRegistry::new());
        let lifecycle = LifecycleService::new(store.clone(), store.clone(), store.clone());
        let messaging = MessagingService::new(store.clone(), store.clone(), store.clone(), rooms.clone());
        let client = store.add_participant("Ada", UserRole::Client, &[]).await;
        let tech = store.add_participant("Tomi", UserRole::Technician, &["plumbing"]).await;
        Fixture {
            store,
            rooms,
            lifecycle,
            messaging,
            client,
            tech,
        }
    }

    async fn engage(f: &Fixture) -> Uuid {
        let request = f
            .lifecycle
            .create_direct_request(
                &f.client.actor(),
                NewDirectRequest {
                    description: "Leaking kitchen sink".to_string(),
                    category: "plumbing".to_string(),
                    address: "12 Harbour Road".to_string(),
                    requested_at: Utc::now(),
                    urgency: "normal".to_string(),
                    client_budget: None,
                    final_price: None,
                    service_id: None,
                },
            )
            .await
            .unwrap();
        f.lifecycle
            .accept_direct_request(request.id, &f.tech.actor())
            .await
            .unwrap();
        request.id
    }

    #[tokio::test]
    async fn gate_opens_once_a_request_is_accepted() {
        let f = fixture().await;
        assert!(!f.messaging.is_authorized(f.client.id, f.tech.id).await.unwrap());

        let err = f
            .messaging
            .send_message(&f.client, f.tech.id, "hello?")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoQualifyingEngagement));

        engage(&f).await;
        assert!(f.messaging.is_authorized(f.client.id, f.tech.id).await.unwrap());
        assert!(f.messaging.is_authorized(f.tech.id, f.client.id).await.unwrap());
    }

    #[tokio::test]
    async fn gate_stays_open_through_start_and_completion() {
        let f = fixture().await;
        let request_id = engage(&f).await;

        f.lifecycle
            .start_direct_request(request_id, &f.tech.actor())
            .await
            .unwrap();
        assert!(f.messaging.is_authorized(f.client.id, f.tech.id).await.unwrap());
        f.messaging.send_message(&f.client, f.tech.id, "still on for today?").await.unwrap();

        f.lifecycle
            .complete_direct_request(request_id, &f.tech.actor())
            .await
            .unwrap();
        assert!(f.messaging.is_authorized(f.tech.id, f.client.id).await.unwrap());
        f.messaging.send_message(&f.tech, f.client.id, "all done").await.unwrap();

        let conversation = f.messaging.list_conversation(f.client.id, f.tech.id).await.unwrap();
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn cancelling_closes_the_gate() {
        let f = fixture().await;
        let request_id = engage(&f).await;
        assert!(f.messaging.is_authorized(f.client.id, f.tech.id).await.unwrap());

        f.lifecycle
            .cancel_direct_request(request_id, &f.client.actor())
            .await
            .unwrap();

        assert!(!f.messaging.is_authorized(f.client.id, f.tech.id).await.unwrap());
        assert!(!f.messaging.is_authorized(f.tech.id, f.client.id).await.unwrap());
        let err = f
            .messaging
            .send_message(&f.tech, f.client.id, "are we still on?")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoQualifyingEngagement));
    }

    #[tokio::test]
    async fn pending_request_does_not_open_the_gate() {
        let f = fixture().await;
        f.lifecycle
            .create_direct_request(
                &f.client.actor(),
                NewDirectRequest {
                    description: "Broken tap".to_string(),
                    category: "plumbing".to_string(),
                    address: "3 Mill Lane".to_string(),
                    requested_at: Utc::now(),
                    urgency: "urgent".to_string(),
                    client_budget: None,
                    final_price: None,
                    service_id: None,
                },
            )
            .await
            .unwrap();
        assert!(!f.messaging.is_authorized(f.client.id, f.tech.id).await.unwrap());
    }

    #[tokio::test]
    async fn conversation_is_symmetric() {
        let f = fixture().await;
        engage(&f).await;

        let sent = f.messaging.send_message(&f.client, f.tech.id, "  hi ").await.unwrap();
        assert_eq!(sent.message.content, "hi");
        assert_eq!(sent.sender.id, f.client.id);
        assert_eq!(sent.receiver.id, f.tech.id);
        f.messaging.send_message(&f.tech, f.client.id, "on my way").await.unwrap();

        let from_client = f.messaging.list_conversation(f.client.id, f.tech.id).await.unwrap();
        let from_tech = f.messaging.list_conversation(f.tech.id, f.client.id).await.unwrap();
        assert_eq!(from_client, from_tech);
        let contents: Vec<&str> = from_client.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "on my way"]);
    }

    #[tokio::test]
    async fn delete_empties_the_conversation() {
        let f = fixture().await;
        engage(&f).await;
        f.messaging.send_message(&f.client, f.tech.id, "hi").await.unwrap();
        f.messaging.send_message(&f.tech, f.client.id, "hello").await.unwrap();

        let deleted = f.messaging.delete_conversation(f.tech.id, f.client.id).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(f
            .messaging
            .list_conversation(f.client.id, f.tech.id)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(f.messaging.delete_conversation(f.client.id, f.tech.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stored_message_is_pushed_to_the_pair_room() {
        let f = fixture().await;
        engage(&f).await;

        let connection = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        f.rooms.register(connection, tx).await;
        assert!(f.rooms.join(connection, RoomId::for_pair(f.tech.id, f.client.id)).await);

        let sent = f.messaging.send_message(&f.client, f.tech.id, "hi").await.unwrap();

        match rx.try_recv() {
            Ok(ServerEvent::NewMessage(view)) => assert_eq!(view, sent),
            other => panic!("expected a new message event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_bad_recipients_and_content() {
        let f = fixture().await;
        engage(&f).await;

        let err = f.messaging.send_message(&f.client, f.client.id, "me").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(!f.messaging.is_authorized(f.client.id, f.client.id).await.unwrap());

        let nobody = Uuid::new_v4();
        let err = f.messaging.send_message(&f.client, nobody, "hi").await.unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound(id) if id == nobody));

        let err = f.messaging.send_message(&f.client, f.tech.id, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let long = "x".repeat(MAX_MESSAGE_LENGTH + 1);
        let err = f.messaging.send_message(&f.client, f.tech.id, &long).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        assert!(f.store.get_conversation(f.client.id, f.tech.id).await.unwrap().is_empty());
    }
}
