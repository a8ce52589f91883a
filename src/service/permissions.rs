//! Who may drive which lifecycle transition.
//!
//! Role permissions live in one table keyed by record kind, transition and
//! role. Ownership (is this *your* request?) and status guards are checked
//! separately by the lifecycle service.

use std::fmt;

use crate::{
    models::usermodel::{Actor, UserRole},
    service::error::ServiceError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    DirectRequest,
    QuoteRequest,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::DirectRequest => f.write_str("Direct request"),
            RecordKind::QuoteRequest => f.write_str("Quote request"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Create,
    Accept,
    Start,
    Complete,
    Cancel,
    Review,
    Quote,
    Reject,
}

impl Transition {
    pub fn to_str(&self) -> &str {
        match self {
            Transition::Create => "create",
            Transition::Accept => "accept",
            Transition::Start => "start",
            Transition::Complete => "complete",
            Transition::Cancel => "cancel",
            Transition::Review => "review",
            Transition::Quote => "quote",
            Transition::Reject => "reject",
        }
    }
}

use RecordKind::*;
use Transition::*;
use UserRole::*;

const PERMISSIONS: &[(RecordKind, Transition, UserRole)] = &[
    (DirectRequest, Create, Client),
    (DirectRequest, Accept, Technician),
    (DirectRequest, Start, Technician),
    (DirectRequest, Complete, Technician),
    (DirectRequest, Cancel, Client),
    (QuoteRequest, Create, Client),
    (QuoteRequest, Review, Technician),
    (QuoteRequest, Quote, Technician),
    (QuoteRequest, Accept, Client),
    // only the bound technician; the service checks the binding
    (QuoteRequest, Accept, Technician),
    (QuoteRequest, Reject, Client),
];

pub fn is_permitted(kind: RecordKind, transition: Transition, role: UserRole) -> bool {
    PERMISSIONS.contains(&(kind, transition, role))
}

pub fn require(kind: RecordKind, transition: Transition, actor: &Actor) -> Result<(), ServiceError> {
    if is_permitted(kind, transition, actor.role) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "A {} cannot {} a {}",
            actor.role.to_str(),
            transition.to_str(),
            kind.to_string().to_lowercase(),
        )))
    }
}
