use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Bill, BillId, BillingCycle, Membership, MembershipType, NewBillingCycle};

const DEFAULT_DUE_DAYS: u32 = 14;
const DEFAULT_CYCLE_MONTHS: u32 = 12;
const REFERENCE_BASE_OFFSET: u64 = 1000;

/// Billing dials supplied through configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub personal_fee: u32,
    pub supporting_fee: u32,
    pub organization_fee: u32,
    pub due_days: u32,
    pub sender: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            personal_fee: 30,
            supporting_fee: 100,
            organization_fee: 250,
            due_days: DEFAULT_DUE_DAYS,
            sender: "billing@localhost".to_string(),
        }
    }
}

/// Pricing and scheduling rules applied when a membership is approved.
#[derive(Debug, Clone)]
pub struct BillingPolicy {
    config: BillingConfig,
    cycle_months: u32,
}

impl BillingPolicy {
    pub fn new(config: BillingConfig) -> Self {
        let mut config = config;
        if config.due_days == 0 {
            config.due_days = DEFAULT_DUE_DAYS;
        }

        Self {
            config,
            cycle_months: DEFAULT_CYCLE_MONTHS,
        }
    }

    pub fn sender(&self) -> &str {
        &self.config.sender
    }

    pub fn fee_for(&self, membership_type: MembershipType) -> u32 {
        match membership_type {
            MembershipType::Personal => self.config.personal_fee,
            MembershipType::Supporting => self.config.supporting_fee,
            MembershipType::Organization => self.config.organization_fee,
            MembershipType::Honorary => 0,
        }
    }

    /// Cycle starting on `start` and covering one billing period.
    pub fn cycle_for(&self, membership: &Membership, start: NaiveDate) -> NewBillingCycle {
        let end = start
            .checked_add_months(Months::new(self.cycle_months))
            .unwrap_or(NaiveDate::MAX);

        NewBillingCycle {
            membership_id: membership.id,
            start,
            end,
            sum: self.fee_for(membership.fields.membership_type),
        }
    }

    pub fn due_date(&self, created: DateTime<Utc>) -> NaiveDate {
        let created = created.date_naive();
        created
            .checked_add_signed(Duration::days(i64::from(self.config.due_days)))
            .unwrap_or(created)
    }
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self::new(BillingConfig::default())
    }
}

impl From<&BillingConfig> for BillingPolicy {
    fn from(config: &BillingConfig) -> Self {
        Self::new(config.clone())
    }
}

/// Reference number for a billing cycle.
pub fn cycle_reference(cycle: &BillingCycle) -> String {
    reference_number(cycle.id.0 + REFERENCE_BASE_OFFSET)
}

/// Finnish bank reference: base digits followed by a 7-3-1 weighted check digit.
pub fn reference_number(base: u64) -> String {
    let digits = base.to_string();
    let sum: u32 = digits
        .bytes()
        .rev()
        .zip([7u32, 3, 1].into_iter().cycle())
        .map(|(digit, weight)| u32::from(digit - b'0') * weight)
        .sum();
    let check = (10 - sum % 10) % 10;
    format!("{digits}{check}")
}

/// Outbound bill e-mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillEmail {
    pub bill_id: BillId,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl BillEmail {
    pub fn compose(
        policy: &BillingPolicy,
        bill: &Bill,
        cycle: &BillingCycle,
        membership: &Membership,
        recipient: &str,
    ) -> Self {
        let subject = format!("Membership bill #{} for membership #{}", bill.id.0, membership.id.0);
        let body = format!(
            "Your membership application has been approved.\n\n\
             Membership: #{membership_id} ({membership_type})\n\
             Billing period: {start} - {end}\n\
             Amount: {sum} EUR\n\
             Due date: {due}\n\
             Reference number: {reference}\n",
            membership_id = membership.id.0,
            membership_type = membership.fields.membership_type.label(),
            start = cycle.start,
            end = cycle.end,
            sum = cycle.sum,
            due = bill.due_date,
            reference = bill.reference_number,
        );

        Self {
            bill_id: bill.id,
            sender: policy.sender().to_string(),
            recipient: recipient.to_string(),
            subject,
            body,
        }
    }
}
