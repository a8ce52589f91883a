// service/lifecycle_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        requestdb::EngagementExt,
        userdb::{CatalogExt, ParticipantExt},
    },
    dtos::requestdtos::DirectRequestDetails,
    models::{
        requestmodel::*,
        usermodel::{Actor, Participant, UserRole},
    },
    service::{
        error::ServiceError,
        permissions::{self, RecordKind, Transition},
    },
};

const PENDING: &[DirectRequestStatus] = &[DirectRequestStatus::Pending];
const ASSIGNED: &[DirectRequestStatus] = &[DirectRequestStatus::Assigned];
const CANCELLABLE: &[DirectRequestStatus] = &[DirectRequestStatus::Pending, DirectRequestStatus::Assigned];
const COMPLETABLE: &[DirectRequestStatus] = &[DirectRequestStatus::Assigned, DirectRequestStatus::InProcess];

const QUOTE_PENDING: &[QuoteStatus] = &[QuoteStatus::Pending];
const QUOTE_REVIEWED: &[QuoteStatus] = &[QuoteStatus::Reviewed];
const QUOTE_REPRICEABLE: &[QuoteStatus] = &[QuoteStatus::Reviewed, QuoteStatus::Quoted];
const QUOTE_QUOTED: &[QuoteStatus] = &[QuoteStatus::Quoted];
const QUOTE_OPEN: &[QuoteStatus] = &[QuoteStatus::Pending, QuoteStatus::Reviewed, QuoteStatus::Quoted];

/// Guarded state transitions for direct requests and quote requests.
///
/// Every mutation reads the record to classify failures (missing, wrong
/// caller, wrong state) and then issues one conditional write. A write that
/// matches no row means another caller got there first.
#[derive(Clone)]
pub struct LifecycleService {
    engagements: Arc<dyn EngagementExt>,
    directory: Arc<dyn ParticipantExt>,
    catalog: Arc<dyn CatalogExt>,
}

impl std::fmt::Debug for LifecycleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleService").finish_non_exhaustive()
    }
}

impl LifecycleService {
    pub fn new(
        engagements: Arc<dyn EngagementExt>,
        directory: Arc<dyn ParticipantExt>,
        catalog: Arc<dyn CatalogExt>,
    ) -> Self {
        Self {
            engagements,
            directory,
            catalog,
        }
    }

    // Direct requests

    pub async fn create_direct_request(
        &self,
        actor: &Actor,
        fields: NewDirectRequest,
    ) -> Result<DirectRequest, ServiceError> {
        permissions::require(RecordKind::DirectRequest, Transition::Create, actor)?;

        require_text("description", &fields.description)?;
        require_text("category", &fields.category)?;
        require_text("address", &fields.address)?;
        require_amount("clientBudget", fields.client_budget)?;
        require_amount("finalPrice", fields.final_price)?;

        let request = self
            .engagements
            .create_direct_request(actor.id, fields)
            .await?;

        tracing::info!(request_id = %request.id, client_id = %actor.id, "direct request created");
        Ok(request)
    }

    pub async fn accept_direct_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
    ) -> Result<DirectRequest, ServiceError> {
        let request = self.load_direct_request(request_id).await?;
        permissions::require(RecordKind::DirectRequest, Transition::Accept, actor)?;

        if request.status != DirectRequestStatus::Pending {
            return Err(ServiceError::InvalidState("Request is no longer pending".to_string()));
        }

        self.apply_direct(
            request_id,
            actor,
            DirectTransition {
                from: PENDING,
                to: DirectRequestStatus::Assigned,
                require_client: None,
                require_technician: None,
                assign_technician: Some(actor.id),
            },
            "Request is no longer pending",
        )
        .await
    }

    pub async fn start_direct_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
    ) -> Result<DirectRequest, ServiceError> {
        let request = self.load_direct_request(request_id).await?;
        permissions::require(RecordKind::DirectRequest, Transition::Start, actor)?;

        if request.technician_id != Some(actor.id) {
            return Err(ServiceError::Forbidden(
                "Only the assigned technician can start this request".to_string(),
            ));
        }
        if request.status != DirectRequestStatus::Assigned {
            return Err(ServiceError::InvalidState(
                "Only assigned requests can be started".to_string(),
            ));
        }

        self.apply_direct(
            request_id,
            actor,
            DirectTransition {
                from: ASSIGNED,
                to: DirectRequestStatus::InProcess,
                require_client: None,
                require_technician: Some(actor.id),
                assign_technician: None,
            },
            "Only assigned requests can be started",
        )
        .await
    }

    pub async fn cancel_direct_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
    ) -> Result<DirectRequest, ServiceError> {
        let request = self.load_direct_request(request_id).await?;
        permissions::require(RecordKind::DirectRequest, Transition::Cancel, actor)?;

        if request.client_id != actor.id {
            return Err(ServiceError::Forbidden(
                "Only the client who created this request can cancel it".to_string(),
            ));
        }
        if !CANCELLABLE.contains(&request.status) {
            return Err(ServiceError::InvalidState(format!(
                "A {} request can no longer be cancelled",
                request.status.to_str()
            )));
        }

        self.apply_direct(
            request_id,
            actor,
            DirectTransition {
                from: CANCELLABLE,
                to: DirectRequestStatus::Cancelled,
                require_client: Some(actor.id),
                require_technician: None,
                assign_technician: None,
            },
            "Request can no longer be cancelled",
        )
        .await
    }

    pub async fn complete_direct_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
    ) -> Result<DirectRequest, ServiceError> {
        let request = self.load_direct_request(request_id).await?;
        permissions::require(RecordKind::DirectRequest, Transition::Complete, actor)?;

        if request.technician_id != Some(actor.id) {
            return Err(ServiceError::Forbidden(
                "Only the assigned technician can complete this request".to_string(),
            ));
        }
        if !COMPLETABLE.contains(&request.status) {
            return Err(ServiceError::InvalidState(format!(
                "A {} request cannot be completed",
                request.status.to_str()
            )));
        }

        self.apply_direct(
            request_id,
            actor,
            DirectTransition {
                from: COMPLETABLE,
                to: DirectRequestStatus::Completed,
                require_client: None,
                require_technician: Some(actor.id),
                assign_technician: None,
            },
            "Request can no longer be completed",
        )
        .await
    }

    pub async fn list_direct_requests(&self, actor: &Actor) -> Result<Vec<DirectRequest>, ServiceError> {
        let requests = match actor.role {
            UserRole::Client => self.engagements.get_client_direct_requests(actor.id).await?,
            UserRole::Technician => self.engagements.get_technician_direct_requests(actor.id).await?,
        };
        Ok(requests)
    }

    /// Pending, unassigned requests in one of the technician's specialties.
    pub async fn available_direct_requests(
        &self,
        technician: &Participant,
    ) -> Result<Vec<DirectRequest>, ServiceError> {
        if technician.role != UserRole::Technician {
            return Err(ServiceError::Forbidden(
                "Only technicians can browse available requests".to_string(),
            ));
        }
        if technician.specialties.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .engagements
            .get_available_direct_requests(&technician.specialties)
            .await?)
    }

    pub async fn get_direct_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
    ) -> Result<DirectRequestDetails, ServiceError> {
        let request = self.load_direct_request(request_id).await?;

        let open_to_technicians = actor.role == UserRole::Technician
            && request.status == DirectRequestStatus::Pending
            && request.technician_id.is_none();
        if !request.involves(actor.id) && !open_to_technicians {
            return Err(ServiceError::Forbidden(
                "You are not a participant in this request".to_string(),
            ));
        }

        let client = self
            .directory
            .get_participant(request.client_id)
            .await?
            .map(|p| p.summary());
        let technician = match request.technician_id {
            Some(id) => self.directory.get_participant(id).await?.map(|p| p.summary()),
            None => None,
        };
        let service = match request.service_id {
            Some(id) => self.catalog.get_service_summary(id).await?,
            None => None,
        };

        Ok(DirectRequestDetails {
            request,
            client,
            technician,
            service,
        })
    }

    // Quote requests

    pub async fn create_quote_request(
        &self,
        actor: &Actor,
        fields: NewQuoteRequest,
    ) -> Result<QuoteRequest, ServiceError> {
        permissions::require(RecordKind::QuoteRequest, Transition::Create, actor)?;

        require_text("description", &fields.description)?;
        require_text("category", &fields.category)?;
        require_text("location", &fields.location)?;

        let request = self.engagements.create_quote_request(actor.id, fields).await?;

        tracing::info!(request_id = %request.id, client_id = %actor.id, "quote request created");
        Ok(request)
    }

    pub async fn review_quote_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
    ) -> Result<QuoteRequest, ServiceError> {
        let request = self.load_quote_request(request_id).await?;
        permissions::require(RecordKind::QuoteRequest, Transition::Review, actor)?;

        if request.status != QuoteStatus::Pending {
            return Err(ServiceError::InvalidState(
                "Quote request is no longer pending".to_string(),
            ));
        }

        self.apply_quote(
            request_id,
            actor,
            QuoteTransition {
                from: QUOTE_PENDING,
                to: QuoteStatus::Reviewed,
                require_client: None,
                require_technician: None,
                bind_technician: Some(actor.id),
                quoted_price: None,
            },
            "Quote request is no longer pending",
        )
        .await
    }

    /// Prices a reviewed request. Only the technician who reviewed it may
    /// quote; anything else, including a request that has moved on, is
    /// refused as forbidden.
    pub async fn quote_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
        price: Option<f64>,
    ) -> Result<QuoteRequest, ServiceError> {
        let request = self.load_quote_request(request_id).await?;
        permissions::require(RecordKind::QuoteRequest, Transition::Quote, actor)?;

        if request.status != QuoteStatus::Reviewed || request.technician_id != Some(actor.id) {
            return Err(ServiceError::Forbidden(
                "Only the technician who reviewed this request can quote it, and only once".to_string(),
            ));
        }
        let price = require_price(price)?;

        self.apply_quote(
            request_id,
            actor,
            QuoteTransition {
                from: QUOTE_REVIEWED,
                to: QuoteStatus::Quoted,
                require_client: None,
                require_technician: Some(actor.id),
                bind_technician: None,
                quoted_price: Some(price),
            },
            "Quote request is no longer awaiting a quote",
        )
        .await
    }

    /// Moves a quote request to `desired` on behalf of either party.
    ///
    /// Technicians may quote (binding themselves if the request is still
    /// unclaimed) or accept a request bound to them. Clients may accept a
    /// quoted request or reject any open one.
    pub async fn resolve_quote_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
        desired: &str,
        price: Option<f64>,
    ) -> Result<QuoteRequest, ServiceError> {
        let request = self.load_quote_request(request_id).await?;

        let transition = match desired.parse::<QuoteStatus>() {
            Ok(QuoteStatus::Quoted) => Transition::Quote,
            Ok(QuoteStatus::Accepted) => Transition::Accept,
            Ok(QuoteStatus::Rejected) => Transition::Reject,
            Ok(QuoteStatus::Pending | QuoteStatus::Reviewed) | Err(_) => {
                return Err(ServiceError::Forbidden(format!(
                    "A quote request cannot be set to {desired}"
                )));
            }
        };
        permissions::require(RecordKind::QuoteRequest, transition, actor)?;

        if request.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "Quote request has already been {}",
                request.status.to_str()
            )));
        }

        let update = match actor.role {
            UserRole::Technician => technician_resolution(&request, actor, transition, price)?,
            UserRole::Client => client_resolution(&request, actor, transition)?,
        };

        self.apply_quote(request_id, actor, update, "Quote request has changed, please reload")
            .await
    }

    pub async fn list_quote_requests(&self, actor: &Actor) -> Result<Vec<QuoteRequest>, ServiceError> {
        let requests = match actor.role {
            UserRole::Client => self.engagements.get_client_quote_requests(actor.id).await?,
            UserRole::Technician => self.engagements.get_technician_quote_requests(actor.id).await?,
        };
        Ok(requests)
    }

    pub async fn get_quote_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
    ) -> Result<QuoteRequest, ServiceError> {
        let request = self.load_quote_request(request_id).await?;

        let visible = request.client_id == actor.id
            || request.technician_id == Some(actor.id)
            || (actor.role == UserRole::Technician && request.status == QuoteStatus::Pending);
        if !visible {
            return Err(ServiceError::Forbidden(
                "You are not a participant in this quote request".to_string(),
            ));
        }

        Ok(request)
    }

    async fn load_direct_request(&self, request_id: Uuid) -> Result<DirectRequest, ServiceError> {
        self.engagements
            .get_direct_request(request_id)
            .await?
            .ok_or(ServiceError::NotFound(RecordKind::DirectRequest, request_id))
    }

    async fn load_quote_request(&self, request_id: Uuid) -> Result<QuoteRequest, ServiceError> {
        self.engagements
            .get_quote_request(request_id)
            .await?
            .ok_or(ServiceError::NotFound(RecordKind::QuoteRequest, request_id))
    }

    async fn apply_direct(
        &self,
        request_id: Uuid,
        actor: &Actor,
        transition: DirectTransition,
        lost_race: &str,
    ) -> Result<DirectRequest, ServiceError> {
        match self
            .engagements
            .transition_direct_request(request_id, &transition)
            .await?
        {
            Some(request) => {
                tracing::info!(
                    request_id = %request_id,
                    actor_id = %actor.id,
                    status = request.status.to_str(),
                    "direct request transitioned"
                );
                Ok(request)
            }
            None => {
                tracing::warn!(
                    request_id = %request_id,
                    actor_id = %actor.id,
                    target = transition.to.to_str(),
                    "direct request changed concurrently"
                );
                Err(ServiceError::InvalidState(lost_race.to_string()))
            }
        }
    }

    async fn apply_quote(
        &self,
        request_id: Uuid,
        actor: &Actor,
        transition: QuoteTransition,
        lost_race: &str,
    ) -> Result<QuoteRequest, ServiceError> {
        match self
            .engagements
            .transition_quote_request(request_id, &transition)
            .await?
        {
            Some(request) => {
                tracing::info!(
                    request_id = %request_id,
                    actor_id = %actor.id,
                    status = request.status.to_str(),
                    "quote request transitioned"
                );
                Ok(request)
            }
            None => {
                tracing::warn!(
                    request_id = %request_id,
                    actor_id = %actor.id,
                    target = transition.to.to_str(),
                    "quote request changed concurrently"
                );
                Err(ServiceError::InvalidState(lost_race.to_string()))
            }
        }
    }
}

fn technician_resolution(
    request: &QuoteRequest,
    actor: &Actor,
    transition: Transition,
    price: Option<f64>,
) -> Result<QuoteTransition, ServiceError> {
    let bound_to_caller = request.technician_id == Some(actor.id);

    match transition {
        Transition::Quote => {
            let price = require_price(price)?;
            let (from, require_technician, bind_technician) = match request.technician_id {
                None => (QUOTE_PENDING, None, Some(actor.id)),
                Some(_) if bound_to_caller => (QUOTE_REPRICEABLE, Some(actor.id), None),
                Some(_) => {
                    return Err(ServiceError::Forbidden(
                        "Another technician is already handling this request".to_string(),
                    ))
                }
            };
            if !from.contains(&request.status) {
                return Err(ServiceError::InvalidState(format!(
                    "A {} quote request cannot be quoted",
                    request.status.to_str()
                )));
            }
            Ok(QuoteTransition {
                from,
                to: QuoteStatus::Quoted,
                require_client: None,
                require_technician,
                bind_technician,
                quoted_price: Some(price),
            })
        }
        Transition::Accept => {
            if !bound_to_caller {
                return Err(ServiceError::Forbidden(
                    "Only the technician bound to this request can accept it".to_string(),
                ));
            }
            if request.status != QuoteStatus::Quoted {
                return Err(ServiceError::InvalidState(
                    "Only quoted requests can be accepted".to_string(),
                ));
            }
            Ok(QuoteTransition {
                from: QUOTE_QUOTED,
                to: QuoteStatus::Accepted,
                require_client: None,
                require_technician: Some(actor.id),
                bind_technician: None,
                quoted_price: None,
            })
        }
        other => Err(ServiceError::Forbidden(format!(
            "A technician cannot {} a quote request",
            other.to_str()
        ))),
    }
}

fn client_resolution(
    request: &QuoteRequest,
    actor: &Actor,
    transition: Transition,
) -> Result<QuoteTransition, ServiceError> {
    if request.client_id != actor.id {
        return Err(ServiceError::Forbidden(
            "Only the client who created this request can resolve it".to_string(),
        ));
    }

    let (from, to) = match transition {
        Transition::Accept => {
            if request.status != QuoteStatus::Quoted {
                return Err(ServiceError::InvalidState(
                    "Only quoted requests can be accepted".to_string(),
                ));
            }
            (QUOTE_QUOTED, QuoteStatus::Accepted)
        }
        Transition::Reject => (QUOTE_OPEN, QuoteStatus::Rejected),
        other => {
            return Err(ServiceError::Forbidden(format!(
                "A client cannot {} a quote request",
                other.to_str()
            )))
        }
    };

    Ok(QuoteTransition {
        from,
        to,
        require_client: Some(actor.id),
        require_technician: None,
        bind_technician: None,
        quoted_price: None,
    })
}

fn require_text(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

fn require_amount(field: &str, value: Option<f64>) -> Result<(), ServiceError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ServiceError::InvalidInput(format!(
            "{field} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

fn require_price(price: Option<f64>) -> Result<f64, ServiceError> {
    match price {
        Some(p) if p.is_finite() && p > 0.0 => Ok(p),
        Some(_) => Err(ServiceError::InvalidInput(
            "quotedPrice must be a positive number".to_string(),
        )),
        None => Err(ServiceError::InvalidInput("quotedPrice is required".to_string())),
    }
}
