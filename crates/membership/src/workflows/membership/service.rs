use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::billing::{cycle_reference, BillEmail, BillingConfig, BillingPolicy};
use super::diff::{change_message, field_diff};
use super::domain::{
    ApplicationSubmission, Comment, ContactRole, LogAction, LogEntry, Membership,
    MembershipFields, MembershipId, MembershipStatus, NewBill,
};
use super::forms::{validate_application, FormErrors, MembershipForm};
use super::repository::{
    AuditError, AuditLog, BillFilter, BillMailer, MailError, MembershipFilter,
    MembershipRepository, RepositoryError,
};
use super::views::{Approval, BillView, MembershipDetail, MembershipView};

/// Settings shared by every membership operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipConfig {
    pub site_id: u32,
    pub billing: BillingConfig,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            site_id: 1,
            billing: BillingConfig::default(),
        }
    }
}

/// Staff edit payload. `status` is applied as given; no transition rules apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipUpdate {
    #[serde(flatten)]
    pub fields: MembershipFields,
    #[serde(default)]
    pub status: Option<MembershipStatus>,
}

/// JSON dispatch envelope: `{"requestType": "PREAPPROVE", "payload": [1, 2]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "requestType", content = "payload")]
pub enum JsonRequest {
    #[serde(rename = "PREAPPROVE")]
    Preapprove(Vec<MembershipId>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "requestType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonResponse {
    Preapprove { memberships: Vec<MembershipView> },
}

/// Service composing the repository, audit trail and bill mailer.
pub struct MembershipService<R, L, M> {
    repository: Arc<R>,
    audit: Arc<L>,
    mailer: Arc<M>,
    billing: Arc<BillingPolicy>,
    site_id: u32,
}

impl<R, L, M> MembershipService<R, L, M>
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    pub fn new(repository: Arc<R>, audit: Arc<L>, mailer: Arc<M>, config: MembershipConfig) -> Self {
        Self {
            repository,
            audit,
            mailer,
            billing: Arc::new(BillingPolicy::from(&config.billing)),
            site_id: config.site_id,
        }
    }

    /// Validate and store a new application. Nothing is written unless every form validates.
    pub fn submit_application(
        &self,
        submission: ApplicationSubmission,
        remote_addr: Option<&str>,
    ) -> Result<Membership, MembershipServiceError> {
        let remote_addr = remote_addr.unwrap_or("unknown");
        let application = match validate_application(&submission, Utc::now()) {
            Ok(application) => application,
            Err(errors) => {
                warn!(%remote_addr, fields = %errors, "membership application rejected");
                return Err(MembershipServiceError::Validation(errors));
            }
        };

        let membership = self.repository.insert_application(application)?;
        info!(
            membership_id = membership.id.0,
            membership_type = membership.fields.membership_type.label(),
            %remote_addr,
            "new membership application received"
        );
        Ok(membership)
    }

    pub fn memberships(
        &self,
        filter: MembershipFilter,
    ) -> Result<Vec<MembershipView>, MembershipServiceError> {
        let memberships = self.repository.memberships(filter)?;
        Ok(memberships.iter().map(MembershipView::from).collect())
    }

    pub fn membership(&self, id: MembershipId) -> Result<MembershipDetail, MembershipServiceError> {
        let membership = self.fetch(id)?;

        let mut contacts = BTreeMap::new();
        for role in ContactRole::ALL {
            if let Some(contact_id) = membership.contact_id(role) {
                if let Some(contact) = self.repository.fetch_contact(contact_id)? {
                    contacts.insert(role, contact);
                }
            }
        }

        Ok(MembershipDetail {
            membership: MembershipView::from(&membership),
            contacts,
            comments: self.audit.comments_for(id)?,
            changes: self.audit.changes_for(id)?,
        })
    }

    /// Apply a staff edit and record the changed fields in the change log.
    pub fn edit_membership(
        &self,
        id: MembershipId,
        update: MembershipUpdate,
        user: &str,
    ) -> Result<Membership, MembershipServiceError> {
        let before = self.fetch(id)?;
        let fields = MembershipForm.validate(&update.fields)?;

        let mut after = before.clone();
        after.fields = fields;
        if let Some(status) = update.status {
            after.status = status;
        }

        let diff = field_diff(&before, &after)?;
        if diff.is_empty() {
            return Ok(before);
        }

        after.last_changed = Utc::now();
        self.repository.update_membership(after.clone())?;
        self.audit.log_change(LogEntry {
            user: user.to_string(),
            object_id: id,
            object_repr: after.repr(),
            action: LogAction::Change,
            change_message: change_message(&diff),
            action_time: after.last_changed,
        })?;

        info!(membership_id = id.0, %user, changed = diff.len(), "membership edited");
        Ok(after)
    }

    pub fn preapprove(
        &self,
        id: MembershipId,
        user: &str,
    ) -> Result<Membership, MembershipServiceError> {
        self.set_status(id, MembershipStatus::Preapproved, "Preapproved", user)
    }

    /// Preapprove every listed membership. Unknown IDs abort the batch before anything changes.
    pub fn preapprove_many(
        &self,
        ids: &[MembershipId],
        user: &str,
    ) -> Result<Vec<Membership>, MembershipServiceError> {
        for id in ids {
            self.fetch(*id)?;
        }

        ids.iter().map(|id| self.preapprove(*id, user)).collect()
    }

    /// Approve a membership, open its first billing cycle and e-mail the bill.
    pub fn approve(&self, id: MembershipId, user: &str) -> Result<Approval, MembershipServiceError> {
        // Resolved before any write so a missing address leaves nothing behind.
        let recipient = self.bill_recipient(&self.fetch(id)?)?;
        let membership = self.set_status(id, MembershipStatus::Approved, "Approved", user)?;

        let now = Utc::now();
        let cycle = self
            .repository
            .insert_billing_cycle(self.billing.cycle_for(&membership, now.date_naive()))?;
        let bill = self.repository.insert_bill(NewBill {
            cycle_id: cycle.id,
            created: now,
            due_date: self.billing.due_date(now),
            reference_number: cycle_reference(&cycle),
        })?;

        let email = BillEmail::compose(&self.billing, &bill, &cycle, &membership, &recipient);
        self.mailer.send(email.clone())?;

        info!(
            membership_id = id.0,
            bill_id = bill.id.0,
            sum = cycle.sum,
            "membership approved and billed"
        );

        Ok(Approval {
            membership,
            cycle,
            bill,
            email,
        })
    }

    pub fn bills(&self, filter: BillFilter) -> Result<Vec<BillView>, MembershipServiceError> {
        let bills = self.repository.bills(filter)?;
        let mut views = Vec::with_capacity(bills.len());
        for bill in &bills {
            let cycle = self.repository.fetch_billing_cycle(bill.cycle_id)?;
            views.push(BillView::new(bill, cycle.as_ref()));
        }
        Ok(views)
    }

    /// Route a JSON request to the operation named by its request type.
    pub fn dispatch(
        &self,
        request: JsonRequest,
        user: &str,
    ) -> Result<JsonResponse, MembershipServiceError> {
        match request {
            JsonRequest::Preapprove(ids) => {
                let memberships = self.preapprove_many(&ids, user)?;
                Ok(JsonResponse::Preapprove {
                    memberships: memberships.iter().map(MembershipView::from).collect(),
                })
            }
        }
    }

    fn fetch(&self, id: MembershipId) -> Result<Membership, MembershipServiceError> {
        self.repository
            .fetch_membership(id)?
            .ok_or(MembershipServiceError::MembershipNotFound(id))
    }

    fn set_status(
        &self,
        id: MembershipId,
        status: MembershipStatus,
        note: &str,
        user: &str,
    ) -> Result<Membership, MembershipServiceError> {
        let mut membership = self.fetch(id)?;
        let now = Utc::now();
        membership.status = status;
        membership.last_changed = now;
        self.repository.update_membership(membership.clone())?;

        self.audit.add_comment(Comment {
            membership_id: id,
            user: user.to_string(),
            comment: note.to_string(),
            site_id: self.site_id,
            submit_date: now,
        })?;

        info!(membership_id = id.0, status = status.label(), %user, "membership status set");
        Ok(membership)
    }

    fn bill_recipient(&self, membership: &Membership) -> Result<String, MembershipServiceError> {
        for role in [ContactRole::Billing, ContactRole::Administrative] {
            let Some(contact_id) = membership.contact_id(role) else {
                continue;
            };
            if let Some(contact) = self.repository.fetch_contact(contact_id)? {
                if !contact.details.email.is_empty() {
                    return Ok(contact.details.email);
                }
            }
        }

        Err(MailError::NoRecipient(membership.id).into())
    }
}

/// Error raised by the membership service.
#[derive(Debug, thiserror::Error)]
pub enum MembershipServiceError {
    #[error(transparent)]
    Validation(#[from] FormErrors),
    #[error("membership {0} not found")]
    MembershipNotFound(MembershipId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error("failed to compute change log: {0}")]
    Diff(#[from] serde_json::Error),
}
