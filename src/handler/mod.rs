pub mod chat;
pub mod direct_request;
pub mod quote_request;
