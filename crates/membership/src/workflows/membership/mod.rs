//! Membership application intake, staff review and billing.
//!
//! Applications arrive as a membership form plus one contact sub-form per role. Staff move a
//! membership through new, preapproved and approved; approval opens a billing cycle and mails the
//! first bill. Storage, the audit trail and mail delivery sit behind traits so the HTTP layer and
//! tests can plug in their own adapters.

pub mod billing;
pub mod diff;
pub mod domain;
pub mod forms;
pub mod repository;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use billing::{reference_number, BillEmail, BillingConfig, BillingPolicy};
pub use domain::{
    ApplicationSubmission, Bill, BillId, BillingCycle, BillingCycleId, Comment, Contact,
    ContactDetails, ContactId, ContactRole, LogAction, LogEntry, Membership, MembershipFields,
    MembershipId, MembershipStatus, MembershipType, NewApplication, NewBill, NewBillingCycle,
};
pub use forms::{validate_application, ContactForm, FormErrors, MembershipForm};
pub use repository::{
    AuditError, AuditLog, BillFilter, BillMailer, MailError, MembershipFilter,
    MembershipRepository, RepositoryError,
};
pub use router::{membership_router, StaffUser, STAFF_USER_HEADER};
pub use service::{
    JsonRequest, JsonResponse, MembershipConfig, MembershipService, MembershipServiceError,
    MembershipUpdate,
};
pub use views::{Approval, BillView, MembershipDetail, MembershipView};
