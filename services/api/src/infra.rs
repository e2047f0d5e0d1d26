use metrics_exporter_prometheus::PrometheusHandle;
use membership::workflows::membership::{
    AuditError, AuditLog, Bill, BillEmail, BillFilter, BillId, BillMailer, BillingCycle,
    BillingCycleId, Comment, Contact, ContactId, LogEntry, MailError, Membership,
    MembershipFilter, MembershipId, MembershipRepository, MembershipStatus, NewApplication,
    NewBill, NewBillingCycle, RepositoryError,
};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Tables {
    memberships: BTreeMap<MembershipId, Membership>,
    contacts: BTreeMap<ContactId, Contact>,
    cycles: BTreeMap<BillingCycleId, BillingCycle>,
    bills: BTreeMap<BillId, Bill>,
    sequence: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// Process-local store. All tables sit behind one lock, so an application and its contacts are
/// written together or not at all.
#[derive(Default, Clone)]
pub(crate) struct InMemoryMembershipRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryMembershipRepository {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }
}

impl MembershipRepository for InMemoryMembershipRepository {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Membership, RepositoryError> {
        let mut tables = self.tables()?;

        let id = MembershipId(tables.next_id());
        let mut membership = Membership {
            id,
            fields: application.fields,
            status: MembershipStatus::New,
            created: application.received_at,
            last_changed: application.received_at,
            administrative_contact: None,
            technical_contact: None,
            billing_contact: None,
        };

        let mut staged = Vec::with_capacity(application.contacts.len());
        for (role, details) in application.contacts {
            let contact_id = ContactId(tables.next_id());
            membership.link_contact(role, contact_id);
            staged.push(Contact {
                id: contact_id,
                details,
            });
        }

        for contact in staged {
            tables.contacts.insert(contact.id, contact);
        }
        tables.memberships.insert(id, membership.clone());
        Ok(membership)
    }

    fn update_membership(&self, membership: Membership) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.memberships.get_mut(&membership.id) {
            Some(slot) => {
                *slot = membership;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_membership(&self, id: MembershipId) -> Result<Option<Membership>, RepositoryError> {
        Ok(self.tables()?.memberships.get(&id).cloned())
    }

    fn memberships(&self, filter: MembershipFilter) -> Result<Vec<Membership>, RepositoryError> {
        Ok(self
            .tables()?
            .memberships
            .values()
            .filter(|membership| filter.matches(membership))
            .cloned()
            .collect())
    }

    fn fetch_contact(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        Ok(self.tables()?.contacts.get(&id).cloned())
    }

    fn insert_billing_cycle(
        &self,
        cycle: NewBillingCycle,
    ) -> Result<BillingCycle, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.memberships.contains_key(&cycle.membership_id) {
            return Err(RepositoryError::NotFound);
        }

        let cycle = BillingCycle {
            id: BillingCycleId(tables.next_id()),
            membership_id: cycle.membership_id,
            start: cycle.start,
            end: cycle.end,
            sum: cycle.sum,
            is_paid: false,
        };
        tables.cycles.insert(cycle.id, cycle.clone());
        Ok(cycle)
    }

    fn fetch_billing_cycle(
        &self,
        id: BillingCycleId,
    ) -> Result<Option<BillingCycle>, RepositoryError> {
        Ok(self.tables()?.cycles.get(&id).cloned())
    }

    fn insert_bill(&self, bill: NewBill) -> Result<Bill, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.cycles.contains_key(&bill.cycle_id) {
            return Err(RepositoryError::NotFound);
        }

        let bill = Bill {
            id: BillId(tables.next_id()),
            cycle_id: bill.cycle_id,
            created: bill.created,
            due_date: bill.due_date,
            reference_number: bill.reference_number,
            is_paid: false,
        };
        tables.bills.insert(bill.id, bill.clone());
        Ok(bill)
    }

    fn bills(&self, filter: BillFilter) -> Result<Vec<Bill>, RepositoryError> {
        Ok(self
            .tables()?
            .bills
            .values()
            .filter(|bill| filter.matches(bill))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditLog {
    comments: Arc<Mutex<Vec<Comment>>>,
    changes: Arc<Mutex<Vec<LogEntry>>>,
}

fn poisoned<T>(_: T) -> AuditError {
    AuditError::Unavailable("audit lock poisoned".to_string())
}

impl AuditLog for InMemoryAuditLog {
    fn add_comment(&self, comment: Comment) -> Result<(), AuditError> {
        self.comments.lock().map_err(poisoned)?.push(comment);
        Ok(())
    }

    fn log_change(&self, entry: LogEntry) -> Result<(), AuditError> {
        self.changes.lock().map_err(poisoned)?.push(entry);
        Ok(())
    }

    fn comments_for(&self, membership: MembershipId) -> Result<Vec<Comment>, AuditError> {
        let comments = self.comments.lock().map_err(poisoned)?;
        Ok(comments
            .iter()
            .filter(|comment| comment.membership_id == membership)
            .cloned()
            .collect())
    }

    fn changes_for(&self, membership: MembershipId) -> Result<Vec<LogEntry>, AuditError> {
        let changes = self.changes.lock().map_err(poisoned)?;
        Ok(changes
            .iter()
            .filter(|entry| entry.object_id == membership)
            .cloned()
            .collect())
    }
}

/// Mailer that logs each bill and keeps it in an outbox instead of talking to SMTP.
#[derive(Default, Clone)]
pub(crate) struct OutboxMailer {
    outbox: Arc<Mutex<Vec<BillEmail>>>,
}

impl OutboxMailer {
    pub(crate) fn sent(&self) -> Vec<BillEmail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

impl BillMailer for OutboxMailer {
    fn send(&self, email: BillEmail) -> Result<(), MailError> {
        info!(
            bill_id = email.bill_id.0,
            recipient = %email.recipient,
            subject = %email.subject,
            "bill e-mail queued"
        );
        self.outbox
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?
            .push(email);
        Ok(())
    }
}
