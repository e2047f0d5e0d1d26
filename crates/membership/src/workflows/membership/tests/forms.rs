use super::common::*;
use chrono::Utc;

use crate::workflows::membership::domain::{ContactRole, MembershipType};
use crate::workflows::membership::forms::{validate_application, ContactForm, MembershipForm};

#[test]
fn valid_application_yields_one_contact_per_role() {
    let application =
        validate_application(&submission(), Utc::now()).expect("application validates");

    let roles: Vec<ContactRole> = application.contacts.iter().map(|(role, _)| *role).collect();
    assert_eq!(roles, ContactRole::ALL.to_vec());
    assert_eq!(application.fields.membership_type, MembershipType::Personal);
}

#[test]
fn application_errors_are_collected_across_sub_forms() {
    let errors = validate_application(&invalid_submission(), Utc::now())
        .expect_err("invalid application rejected");

    let fields: Vec<&str> = errors.fields().collect();
    assert_eq!(fields, vec!["adm-email", "billing-postal_code", "nationality"]);
    assert_eq!(
        errors.get("adm-email"),
        Some(&["Enter a valid e-mail address.".to_string()][..])
    );
}

#[test]
fn first_name_is_optional_when_last_name_is_given() {
    let mut details = contact("", "teemu@example.org");
    details.given_names.clear();

    let cleaned = ContactForm::new(ContactRole::Technical)
        .validate(&details)
        .expect("contact without first name validates");
    assert_eq!(cleaned.last_name, "Virtanen");
    assert!(cleaned.first_name.is_empty());
}

#[test]
fn organization_contacts_do_not_need_personal_names() {
    let mut details = contact("", "info@yhdistys.fi");
    details.last_name.clear();
    details.organization_name = "Yhdistys ry".to_string();

    let cleaned = ContactForm::new(ContactRole::Technical)
        .validate(&details)
        .expect("organization contact validates");
    assert_eq!(cleaned.display_name(), "Yhdistys ry");
}

#[test]
fn only_administrative_contact_requires_phone() {
    let mut details = contact("Anna", "anna@example.org");
    details.phone.clear();

    assert!(ContactForm::new(ContactRole::Billing).validate(&details).is_ok());
    let errors = ContactForm::new(ContactRole::Administrative)
        .validate(&details)
        .expect_err("phone required");
    assert!(errors.get("adm-phone").is_some());
}

#[test]
fn membership_form_trims_and_bounds_fields() {
    let mut fields = membership_fields();
    fields.municipality = "  Espoo ".to_string();
    let cleaned = MembershipForm.validate(&fields).expect("fields validate");
    assert_eq!(cleaned.municipality, "Espoo");

    fields.extra_info = "x".repeat(1001);
    let errors = MembershipForm.validate(&fields).expect_err("extra info too long");
    assert!(errors.get("extra_info").is_some());
}
