use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SendMessageDto {
    pub receiver: Uuid,

    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedConversationDto {
    pub deleted_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagingAuthorizationDto {
    pub authorized: bool,
}
