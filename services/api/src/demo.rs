use crate::infra::{InMemoryAuditLog, InMemoryMembershipRepository, OutboxMailer};
use clap::Args;
use membership::error::AppError;
use membership::workflows::membership::{
    ApplicationSubmission, BillFilter, ContactDetails, MembershipConfig, MembershipFields,
    MembershipFilter, MembershipService, MembershipType,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Membership type to apply for (personal, supporting, organization, honorary)
    #[arg(long, default_value = "personal", value_parser = parse_membership_type)]
    pub(crate) membership_type: MembershipType,
    /// Staff user recorded on comments and change log entries
    #[arg(long, default_value = "demo")]
    pub(crate) staff_user: String,
    /// Stop after preapproval, before any bill is created
    #[arg(long)]
    pub(crate) skip_approval: bool,
}

fn parse_membership_type(value: &str) -> Result<MembershipType, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "personal" => Ok(MembershipType::Personal),
        "supporting" => Ok(MembershipType::Supporting),
        "organization" => Ok(MembershipType::Organization),
        "honorary" => Ok(MembershipType::Honorary),
        other => Err(format!("unknown membership type '{other}'")),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        membership_type,
        staff_user,
        skip_approval,
    } = args;

    let mailer = Arc::new(OutboxMailer::default());
    let service = MembershipService::new(
        Arc::new(InMemoryMembershipRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
        mailer.clone(),
        MembershipConfig::default(),
    );

    println!("Membership workflow demo");
    let membership = match service.submit_application(demo_submission(membership_type), None) {
        Ok(membership) => membership,
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Received application {} -> status {} ({} contacts linked)",
        membership.id,
        membership.status.label(),
        membership.linked_contacts()
    );

    let preapproved = service.preapprove(membership.id, &staff_user)?;
    println!(
        "- Preapproved by {} -> status {}",
        staff_user,
        preapproved.status.label()
    );
    println!(
        "  Still new after preapproval: {}",
        service.memberships(MembershipFilter::New)?.len()
    );

    if skip_approval {
        return Ok(());
    }

    let approval = service.approve(membership.id, &staff_user)?;
    println!(
        "- Approved -> billing cycle {} to {} for {} EUR",
        approval.cycle.start, approval.cycle.end, approval.cycle.sum
    );
    println!(
        "  Bill {} due {} (reference {})",
        approval.bill.id.0, approval.bill.due_date, approval.bill.reference_number
    );

    let unpaid = service.bills(BillFilter::Unpaid)?;
    println!("  Unpaid bills: {}", unpaid.len());

    for email in mailer.sent() {
        println!("\nOutgoing e-mail to {}", email.recipient);
        println!("Subject: {}\n", email.subject);
        println!("{}", email.body);
    }

    let detail = service.membership(membership.id)?;
    match serde_json::to_string_pretty(&detail.membership) {
        Ok(json) => println!("\nMembership view:\n{}", json),
        Err(err) => println!("\nMembership view unavailable: {}", err),
    }
    println!("Staff comments:");
    for comment in &detail.comments {
        println!(
            "  - {} by {} at {}",
            comment.comment,
            comment.user,
            comment.submit_date.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

fn demo_contact(first_name: &str, email: &str) -> ContactDetails {
    ContactDetails {
        first_name: first_name.to_string(),
        last_name: "Nieminen".to_string(),
        street_address: "Aleksanterinkatu 15".to_string(),
        postal_code: "00100".to_string(),
        post_office: "Helsinki".to_string(),
        country: "Finland".to_string(),
        phone: "+358 40 555 0101".to_string(),
        email: email.to_string(),
        ..ContactDetails::default()
    }
}

fn demo_submission(membership_type: MembershipType) -> ApplicationSubmission {
    let mut billing = demo_contact("Liisa", "liisa@example.org");
    if membership_type == MembershipType::Organization {
        billing.organization_name = "Esimerkki Oy".to_string();
    }

    ApplicationSubmission {
        membership: MembershipFields {
            membership_type,
            municipality: "Helsinki".to_string(),
            nationality: "Finnish".to_string(),
            public_memberlist: true,
            extra_info: String::new(),
        },
        administrative_contact: demo_contact("Matti", "matti@example.org"),
        technical_contact: demo_contact("Ville", "ville@example.org"),
        billing_contact: billing,
    }
}
