use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::membership::billing::BillEmail;
use crate::workflows::membership::domain::{
    ApplicationSubmission, Bill, BillId, BillingCycle, BillingCycleId, Comment, Contact,
    ContactDetails, ContactId, LogEntry, Membership, MembershipFields, MembershipId,
    MembershipStatus, MembershipType, NewApplication, NewBill, NewBillingCycle,
};
use crate::workflows::membership::repository::{
    AuditError, AuditLog, BillFilter, BillMailer, MailError, MembershipFilter,
    MembershipRepository, RepositoryError,
};
use crate::workflows::membership::{membership_router, MembershipConfig, MembershipService};

pub(super) type TestService = MembershipService<MemoryRepository, MemoryAudit, MemoryMailer>;

pub(super) fn contact(first_name: &str, email: &str) -> ContactDetails {
    ContactDetails {
        first_name: first_name.to_string(),
        given_names: format!("{first_name} Maria"),
        last_name: "Virtanen".to_string(),
        organization_name: String::new(),
        street_address: "Mannerheimintie 1".to_string(),
        postal_code: "00100".to_string(),
        post_office: "Helsinki".to_string(),
        country: "Finland".to_string(),
        phone: "+358 40 123 4567".to_string(),
        sms: String::new(),
        email: email.to_string(),
        homepage: String::new(),
    }
}

pub(super) fn membership_fields() -> MembershipFields {
    MembershipFields {
        membership_type: MembershipType::Personal,
        municipality: "Helsinki".to_string(),
        nationality: "Finnish".to_string(),
        public_memberlist: true,
        extra_info: "Found you through a friend".to_string(),
    }
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        membership: membership_fields(),
        administrative_contact: contact("Anna", "anna@example.org"),
        technical_contact: contact("Teemu", "teemu@example.org"),
        billing_contact: contact("Bertta", "laskut@example.org"),
    }
}

pub(super) fn invalid_submission() -> ApplicationSubmission {
    let mut submission = submission();
    submission.membership.nationality.clear();
    submission.administrative_contact.email = "not-an-address".to_string();
    submission.billing_contact.postal_code.clear();
    submission
}

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryAudit>, Arc<MemoryMailer>) {
    let repository = Arc::new(MemoryRepository::default());
    let audit = Arc::new(MemoryAudit::default());
    let mailer = Arc::new(MemoryMailer::default());
    let service = MembershipService::new(
        repository.clone(),
        audit.clone(),
        mailer.clone(),
        MembershipConfig::default(),
    );
    (service, repository, audit, mailer)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    membership_router(Arc::new(service))
}

#[derive(Default)]
pub(super) struct Tables {
    pub(super) memberships: BTreeMap<MembershipId, Membership>,
    pub(super) contacts: BTreeMap<ContactId, Contact>,
    pub(super) cycles: BTreeMap<BillingCycleId, BillingCycle>,
    pub(super) bills: BTreeMap<BillId, Bill>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) tables: Arc<Mutex<Tables>>,
}

impl MemoryRepository {
    pub(super) fn contact_count(&self) -> usize {
        self.tables.lock().expect("repository mutex poisoned").contacts.len()
    }

    pub(super) fn cycle_count(&self) -> usize {
        self.tables.lock().expect("repository mutex poisoned").cycles.len()
    }

    pub(super) fn bill_count(&self) -> usize {
        self.tables.lock().expect("repository mutex poisoned").bills.len()
    }

    pub(super) fn mark_paid(&self, id: BillId) {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        if let Some(bill) = guard.bills.get_mut(&id) {
            bill.is_paid = true;
        }
    }
}

impl MembershipRepository for MemoryRepository {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Membership, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        let mut membership = Membership {
            id: MembershipId(guard.next_id()),
            fields: application.fields,
            status: MembershipStatus::New,
            created: application.received_at,
            last_changed: application.received_at,
            administrative_contact: None,
            technical_contact: None,
            billing_contact: None,
        };

        for (role, details) in application.contacts {
            let id = ContactId(guard.next_id());
            guard.contacts.insert(id, Contact { id, details });
            membership.link_contact(role, id);
        }

        guard.memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }

    fn update_membership(&self, membership: Membership) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        guard.memberships.insert(membership.id, membership);
        Ok(())
    }

    fn fetch_membership(&self, id: MembershipId) -> Result<Option<Membership>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.memberships.get(&id).cloned())
    }

    fn memberships(&self, filter: MembershipFilter) -> Result<Vec<Membership>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard
            .memberships
            .values()
            .filter(|membership| filter.matches(membership))
            .cloned()
            .collect())
    }

    fn fetch_contact(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.contacts.get(&id).cloned())
    }

    fn insert_billing_cycle(
        &self,
        cycle: NewBillingCycle,
    ) -> Result<BillingCycle, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        let cycle = BillingCycle {
            id: BillingCycleId(guard.next_id()),
            membership_id: cycle.membership_id,
            start: cycle.start,
            end: cycle.end,
            sum: cycle.sum,
            is_paid: false,
        };
        guard.cycles.insert(cycle.id, cycle.clone());
        Ok(cycle)
    }

    fn fetch_billing_cycle(
        &self,
        id: BillingCycleId,
    ) -> Result<Option<BillingCycle>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.cycles.get(&id).cloned())
    }

    fn insert_bill(&self, bill: NewBill) -> Result<Bill, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        let bill = Bill {
            id: BillId(guard.next_id()),
            cycle_id: bill.cycle_id,
            created: bill.created,
            due_date: bill.due_date,
            reference_number: bill.reference_number,
            is_paid: false,
        };
        guard.bills.insert(bill.id, bill.clone());
        Ok(bill)
    }

    fn bills(&self, filter: BillFilter) -> Result<Vec<Bill>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard
            .bills
            .values()
            .filter(|bill| filter.matches(bill))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAudit {
    comments: Arc<Mutex<Vec<Comment>>>,
    changes: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryAudit {
    pub(super) fn comments(&self) -> Vec<Comment> {
        self.comments.lock().expect("audit mutex poisoned").clone()
    }

    pub(super) fn changes(&self) -> Vec<LogEntry> {
        self.changes.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditLog for MemoryAudit {
    fn add_comment(&self, comment: Comment) -> Result<(), AuditError> {
        self.comments
            .lock()
            .expect("audit mutex poisoned")
            .push(comment);
        Ok(())
    }

    fn log_change(&self, entry: LogEntry) -> Result<(), AuditError> {
        self.changes
            .lock()
            .expect("audit mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn comments_for(&self, membership: MembershipId) -> Result<Vec<Comment>, AuditError> {
        Ok(self
            .comments()
            .into_iter()
            .filter(|comment| comment.membership_id == membership)
            .collect())
    }

    fn changes_for(&self, membership: MembershipId) -> Result<Vec<LogEntry>, AuditError> {
        Ok(self
            .changes()
            .into_iter()
            .filter(|entry| entry.object_id == membership)
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryMailer {
    sent: Arc<Mutex<Vec<BillEmail>>>,
}

impl MemoryMailer {
    pub(super) fn sent(&self) -> Vec<BillEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl BillMailer for MemoryMailer {
    fn send(&self, email: BillEmail) -> Result<(), MailError> {
        self.sent.lock().expect("mailer mutex poisoned").push(email);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl MembershipRepository for UnavailableRepository {
    fn insert_application(
        &self,
        _application: NewApplication,
    ) -> Result<Membership, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_membership(&self, _membership: Membership) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_membership(&self, _id: MembershipId) -> Result<Option<Membership>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn memberships(&self, _filter: MembershipFilter) -> Result<Vec<Membership>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_contact(&self, _id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_billing_cycle(
        &self,
        _cycle: NewBillingCycle,
    ) -> Result<BillingCycle, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_billing_cycle(
        &self,
        _id: BillingCycleId,
    ) -> Result<Option<BillingCycle>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_bill(&self, _bill: NewBill) -> Result<Bill, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn bills(&self, _filter: BillFilter) -> Result<Vec<Bill>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
