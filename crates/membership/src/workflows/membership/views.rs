use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::billing::BillEmail;
use super::domain::{
    Bill, BillId, BillingCycle, BillingCycleId, Comment, Contact, ContactRole, LogEntry,
    Membership, MembershipId,
};

/// Listing row for a membership, the data a list template would render.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipView {
    pub id: MembershipId,
    pub status: &'static str,
    pub status_code: char,
    pub membership_type: &'static str,
    pub municipality: String,
    pub nationality: String,
    pub public_memberlist: bool,
    pub extra_info: String,
    pub created: DateTime<Utc>,
    pub last_changed: DateTime<Utc>,
    pub linked_contacts: usize,
}

impl From<&Membership> for MembershipView {
    fn from(membership: &Membership) -> Self {
        Self {
            id: membership.id,
            status: membership.status.label(),
            status_code: membership.status.code(),
            membership_type: membership.fields.membership_type.label(),
            municipality: membership.fields.municipality.clone(),
            nationality: membership.fields.nationality.clone(),
            public_memberlist: membership.fields.public_memberlist,
            extra_info: membership.fields.extra_info.clone(),
            created: membership.created,
            last_changed: membership.last_changed,
            linked_contacts: membership.linked_contacts(),
        }
    }
}

/// Full membership page: record, resolved contacts and the staff audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipDetail {
    pub membership: MembershipView,
    pub contacts: BTreeMap<ContactRole, Contact>,
    pub comments: Vec<Comment>,
    pub changes: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillView {
    pub id: BillId,
    pub cycle_id: BillingCycleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_id: Option<MembershipId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<u32>,
    pub created: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub reference_number: String,
    pub is_paid: bool,
}

impl BillView {
    pub fn new(bill: &Bill, cycle: Option<&BillingCycle>) -> Self {
        Self {
            id: bill.id,
            cycle_id: bill.cycle_id,
            membership_id: cycle.map(|cycle| cycle.membership_id),
            sum: cycle.map(|cycle| cycle.sum),
            created: bill.created,
            due_date: bill.due_date,
            reference_number: bill.reference_number.clone(),
            is_paid: bill.is_paid,
        }
    }
}

/// Result of approving a membership.
#[derive(Debug, Clone, Serialize)]
pub struct Approval {
    pub membership: Membership,
    pub cycle: BillingCycle,
    pub bill: Bill,
    pub email: BillEmail,
}
