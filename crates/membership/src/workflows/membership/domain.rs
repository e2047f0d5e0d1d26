use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for membership records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipId(pub u64);

impl fmt::Display for MembershipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillingCycleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillId(pub u64);

/// Review flag carried by every membership. Any value may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    New,
    Preapproved,
    Approved,
}

impl MembershipStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MembershipStatus::New => "new",
            MembershipStatus::Preapproved => "preapproved",
            MembershipStatus::Approved => "approved",
        }
    }

    /// Single-letter code used by older exports.
    pub const fn code(self) -> char {
        match self {
            MembershipStatus::New => 'N',
            MembershipStatus::Preapproved => 'P',
            MembershipStatus::Approved => 'A',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipType {
    Personal,
    Supporting,
    Organization,
    Honorary,
}

impl MembershipType {
    pub const fn label(self) -> &'static str {
        match self {
            MembershipType::Personal => "personal",
            MembershipType::Supporting => "supporting",
            MembershipType::Organization => "organization",
            MembershipType::Honorary => "honorary",
        }
    }
}

/// Role a contact plays for its membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    Administrative,
    Technical,
    Billing,
}

impl ContactRole {
    pub const ALL: [ContactRole; 3] = [
        ContactRole::Administrative,
        ContactRole::Technical,
        ContactRole::Billing,
    ];

    /// Field prefix used when reporting validation errors for this role's sub-form.
    pub const fn prefix(self) -> &'static str {
        match self {
            ContactRole::Administrative => "adm",
            ContactRole::Technical => "tech",
            ContactRole::Billing => "billing",
        }
    }
}

/// Contact fields as entered on an application or edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    pub first_name: String,
    pub given_names: String,
    pub last_name: String,
    pub organization_name: String,
    pub street_address: String,
    pub postal_code: String,
    pub post_office: String,
    pub country: String,
    pub phone: String,
    pub sms: String,
    pub email: String,
    pub homepage: String,
}

impl ContactDetails {
    pub fn display_name(&self) -> String {
        if !self.organization_name.trim().is_empty() {
            return self.organization_name.trim().to_string();
        }

        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Persisted contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(flatten)]
    pub details: ContactDetails,
}

/// Membership fields staff and applicants are allowed to edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipFields {
    pub membership_type: MembershipType,
    #[serde(default)]
    pub municipality: String,
    #[serde(default)]
    pub nationality: String,
    #[serde(default)]
    pub public_memberlist: bool,
    #[serde(default)]
    pub extra_info: String,
}

/// Application payload: membership fields plus one contact sub-form per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub membership: MembershipFields,
    #[serde(default)]
    pub administrative_contact: ContactDetails,
    #[serde(default)]
    pub technical_contact: ContactDetails,
    #[serde(default)]
    pub billing_contact: ContactDetails,
}

impl ApplicationSubmission {
    pub fn contact(&self, role: ContactRole) -> &ContactDetails {
        match role {
            ContactRole::Administrative => &self.administrative_contact,
            ContactRole::Technical => &self.technical_contact,
            ContactRole::Billing => &self.billing_contact,
        }
    }
}

/// Validated application ready to be written in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub fields: MembershipFields,
    pub contacts: Vec<(ContactRole, ContactDetails)>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    #[serde(flatten)]
    pub fields: MembershipFields,
    pub status: MembershipStatus,
    pub created: DateTime<Utc>,
    pub last_changed: DateTime<Utc>,
    pub administrative_contact: Option<ContactId>,
    pub technical_contact: Option<ContactId>,
    pub billing_contact: Option<ContactId>,
}

impl Membership {
    pub fn contact_id(&self, role: ContactRole) -> Option<ContactId> {
        match role {
            ContactRole::Administrative => self.administrative_contact,
            ContactRole::Technical => self.technical_contact,
            ContactRole::Billing => self.billing_contact,
        }
    }

    pub fn link_contact(&mut self, role: ContactRole, contact: ContactId) {
        match role {
            ContactRole::Administrative => self.administrative_contact = Some(contact),
            ContactRole::Technical => self.technical_contact = Some(contact),
            ContactRole::Billing => self.billing_contact = Some(contact),
        }
    }

    /// Number of contact slots that are filled.
    pub fn linked_contacts(&self) -> usize {
        ContactRole::ALL
            .iter()
            .filter(|role| self.contact_id(**role).is_some())
            .count()
    }

    /// Short human-readable representation used in audit entries.
    pub fn repr(&self) -> String {
        format!(
            "membership {} ({}, {})",
            self.id,
            self.fields.membership_type.label(),
            self.status.label()
        )
    }
}

/// Billing period opened once a membership is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCycle {
    pub id: BillingCycleId,
    pub membership_id: MembershipId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub sum: u32,
    pub is_paid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBillingCycle {
    pub membership_id: MembershipId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub sum: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub cycle_id: BillingCycleId,
    pub created: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub reference_number: String,
    pub is_paid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBill {
    pub cycle_id: BillingCycleId,
    pub created: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub reference_number: String,
}

/// Staff comment attached to a membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub membership_id: MembershipId,
    pub user: String,
    pub comment: String,
    pub site_id: u32,
    pub submit_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Change,
}

/// Admin change-log record written after an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub user: String,
    pub object_id: MembershipId,
    pub object_repr: String,
    pub action: LogAction,
    pub change_message: String,
    pub action_time: DateTime<Utc>,
}
