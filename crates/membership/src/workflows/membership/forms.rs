use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicationSubmission, ContactDetails, ContactRole, MembershipFields, NewApplication};

const MAX_EXTRA_INFO: usize = 1000;
const MAX_FIELD: usize = 128;

/// Field errors keyed by (optionally prefixed) field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for FormErrors {}

/// Validates the membership part of an application or edit.
#[derive(Debug, Clone, Copy, Default)]
pub struct MembershipForm;

impl MembershipForm {
    pub fn validate(&self, fields: &MembershipFields) -> Result<MembershipFields, FormErrors> {
        let mut errors = FormErrors::default();

        required(&mut errors, "nationality", &fields.nationality);
        required(&mut errors, "municipality", &fields.municipality);
        bounded(&mut errors, "nationality", &fields.nationality, MAX_FIELD);
        bounded(&mut errors, "municipality", &fields.municipality, MAX_FIELD);
        bounded(&mut errors, "extra_info", &fields.extra_info, MAX_EXTRA_INFO);

        let cleaned = MembershipFields {
            membership_type: fields.membership_type,
            municipality: fields.municipality.trim().to_string(),
            nationality: fields.nationality.trim().to_string(),
            public_memberlist: fields.public_memberlist,
            extra_info: fields.extra_info.trim().to_string(),
        };
        errors.into_result(cleaned)
    }
}

/// Validates one contact sub-form. Errors carry the role prefix, e.g. `adm-email`.
#[derive(Debug, Clone, Copy)]
pub struct ContactForm {
    role: ContactRole,
}

impl ContactForm {
    pub fn new(role: ContactRole) -> Self {
        Self { role }
    }

    pub fn prefix(&self) -> &'static str {
        self.role.prefix()
    }

    fn field(&self, name: &str) -> String {
        format!("{}-{}", self.prefix(), name)
    }

    pub fn validate(&self, details: &ContactDetails) -> Result<ContactDetails, FormErrors> {
        let mut errors = FormErrors::default();
        let cleaned = trimmed(details);

        if cleaned.organization_name.is_empty() {
            required(&mut errors, &self.field("last_name"), &cleaned.last_name);
        }
        required(&mut errors, &self.field("street_address"), &cleaned.street_address);
        required(&mut errors, &self.field("postal_code"), &cleaned.postal_code);
        required(&mut errors, &self.field("post_office"), &cleaned.post_office);
        required(&mut errors, &self.field("country"), &cleaned.country);

        if cleaned.email.is_empty() {
            errors.add(self.field("email"), "This field is required.");
        } else if !looks_like_email(&cleaned.email) {
            errors.add(self.field("email"), "Enter a valid e-mail address.");
        }

        if self.role == ContactRole::Administrative {
            required(&mut errors, &self.field("phone"), &cleaned.phone);
        }

        for (name, value) in [
            ("first_name", &cleaned.first_name),
            ("given_names", &cleaned.given_names),
            ("last_name", &cleaned.last_name),
            ("organization_name", &cleaned.organization_name),
            ("street_address", &cleaned.street_address),
            ("homepage", &cleaned.homepage),
        ] {
            bounded(&mut errors, &self.field(name), value, MAX_FIELD);
        }

        errors.into_result(cleaned)
    }
}

/// Validates a whole application: membership form plus every contact sub-form.
/// All forms are checked so the caller receives every error at once.
pub fn validate_application(
    submission: &ApplicationSubmission,
    received_at: DateTime<Utc>,
) -> Result<NewApplication, FormErrors> {
    let mut errors = FormErrors::default();

    let fields = match MembershipForm.validate(&submission.membership) {
        Ok(fields) => Some(fields),
        Err(err) => {
            errors.merge(err);
            None
        }
    };

    let mut contacts = Vec::with_capacity(ContactRole::ALL.len());
    for role in ContactRole::ALL {
        match ContactForm::new(role).validate(submission.contact(role)) {
            Ok(details) => contacts.push((role, details)),
            Err(err) => errors.merge(err),
        }
    }

    match fields {
        Some(fields) if errors.is_empty() => Ok(NewApplication {
            fields,
            contacts,
            received_at,
        }),
        _ => Err(errors),
    }
}

fn required(errors: &mut FormErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
    }
}

fn bounded(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let length = value.chars().count();
    if length > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {length})."),
        );
    }
}

fn trimmed(details: &ContactDetails) -> ContactDetails {
    ContactDetails {
        first_name: details.first_name.trim().to_string(),
        given_names: details.given_names.trim().to_string(),
        last_name: details.last_name.trim().to_string(),
        organization_name: details.organization_name.trim().to_string(),
        street_address: details.street_address.trim().to_string(),
        postal_code: details.postal_code.trim().to_string(),
        post_office: details.post_office.trim().to_string(),
        country: details.country.trim().to_string(),
        phone: details.phone.trim().to_string(),
        sms: details.sms.trim().to_string(),
        email: details.email.trim().to_string(),
        homepage: details.homepage.trim().to_string(),
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_checks() {
        assert!(looks_like_email("hallitus@example.org"));
        assert!(!looks_like_email("hallitus@example"));
        assert!(!looks_like_email("@example.org"));
        assert!(!looks_like_email("a@b@example.org"));
        assert!(!looks_like_email("a b@example.org"));
    }

    #[test]
    fn form_errors_display_lists_fields() {
        let mut errors = FormErrors::default();
        errors.add("adm-email", "Enter a valid e-mail address.");
        errors.add("nationality", "This field is required.");
        assert_eq!(errors.to_string(), "invalid fields: adm-email, nationality");
        assert_eq!(errors.len(), 2);
    }
}
