use serde::{Deserialize, Serialize};

use super::billing::BillEmail;
use super::domain::{
    Bill, BillingCycle, BillingCycleId, Comment, Contact, ContactId, LogEntry, Membership,
    MembershipId, MembershipStatus, NewApplication, NewBill, NewBillingCycle,
};

/// Which memberships a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipFilter {
    #[default]
    All,
    New,
}

impl MembershipFilter {
    pub fn matches(self, membership: &Membership) -> bool {
        match self {
            MembershipFilter::All => true,
            MembershipFilter::New => membership.status == MembershipStatus::New,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillFilter {
    #[default]
    All,
    Unpaid,
}

impl BillFilter {
    pub fn matches(self, bill: &Bill) -> bool {
        match self {
            BillFilter::All => true,
            BillFilter::Unpaid => !bill.is_paid,
        }
    }
}

/// Storage abstraction for memberships, contacts and billing records.
pub trait MembershipRepository: Send + Sync {
    /// Persist the membership and its contacts as one unit. Either every record is written and
    /// linked, or nothing is.
    fn insert_application(&self, application: NewApplication)
        -> Result<Membership, RepositoryError>;
    fn update_membership(&self, membership: Membership) -> Result<(), RepositoryError>;
    fn fetch_membership(&self, id: MembershipId) -> Result<Option<Membership>, RepositoryError>;
    fn memberships(&self, filter: MembershipFilter) -> Result<Vec<Membership>, RepositoryError>;
    fn fetch_contact(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError>;
    fn insert_billing_cycle(&self, cycle: NewBillingCycle)
        -> Result<BillingCycle, RepositoryError>;
    fn fetch_billing_cycle(
        &self,
        id: BillingCycleId,
    ) -> Result<Option<BillingCycle>, RepositoryError>;
    fn insert_bill(&self, bill: NewBill) -> Result<Bill, RepositoryError>;
    fn bills(&self, filter: BillFilter) -> Result<Vec<Bill>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Comment and change-log sink backing the staff audit trail.
pub trait AuditLog: Send + Sync {
    fn add_comment(&self, comment: Comment) -> Result<(), AuditError>;
    fn log_change(&self, entry: LogEntry) -> Result<(), AuditError>;
    fn comments_for(&self, membership: MembershipId) -> Result<Vec<Comment>, AuditError>;
    fn changes_for(&self, membership: MembershipId) -> Result<Vec<LogEntry>, AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Unavailable(String),
}

/// Outbound e-mail hook for bills.
pub trait BillMailer: Send + Sync {
    fn send(&self, email: BillEmail) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("no e-mail address for membership {0}")]
    NoRecipient(MembershipId),
}
