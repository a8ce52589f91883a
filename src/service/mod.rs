pub mod error;
pub mod lifecycle_service;
pub mod messaging_service;
pub mod permissions;
