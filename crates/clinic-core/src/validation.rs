//! Registration profile validation.
//!
//! Validation runs before any row is written; a failed registration must
//! leave no partial state behind, including an unconsumed token.

use chrono::{NaiveDate, Utc};

use crate::models::{DoctorProfile, PatientProfile};

/// One field-level problem found in a submitted profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

impl FieldIssue {
    fn required(field: &'static str) -> Self {
        Self {
            field,
            message: "is required".into(),
        }
    }

    fn invalid(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Render issues as a single human-readable line for error messages.
pub fn describe_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{} {}", i.field, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a doctor registration profile. Empty result means valid.
pub fn validate_doctor_profile(profile: &DoctorProfile) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    check_required(&mut issues, "first_name", &profile.personal.first_name);
    check_required(&mut issues, "last_name", &profile.personal.last_name);
    check_email(&mut issues, "email", &profile.personal.email);
    check_phone(&mut issues, "phone", &profile.personal.phone);
    check_required(&mut issues, "qualification", &profile.professional.qualification);
    check_required(
        &mut issues,
        "registration_number",
        &profile.professional.registration_number,
    );
    check_required(&mut issues, "clinic_name", &profile.practice.clinic_name);

    issues
}

/// Validate a patient registration profile. Empty result means valid.
pub fn validate_patient_profile(profile: &PatientProfile) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    check_required(&mut issues, "first_name", &profile.personal.first_name);
    check_required(&mut issues, "last_name", &profile.personal.last_name);
    check_email(&mut issues, "email", &profile.personal.email);
    check_phone(&mut issues, "phone", &profile.personal.phone);
    check_birth_date(&mut issues, "date_of_birth", &profile.personal.date_of_birth);
    check_required(&mut issues, "city", &profile.address.city);
    check_required(
        &mut issues,
        "emergency_contact_name",
        &profile.emergency_contact.name,
    );
    check_phone(
        &mut issues,
        "emergency_contact_phone",
        &profile.emergency_contact.phone,
    );

    issues
}

fn check_required(issues: &mut Vec<FieldIssue>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        issues.push(FieldIssue::required(field));
    }
}

fn check_email(issues: &mut Vec<FieldIssue>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        issues.push(FieldIssue::required(field));
    } else if !is_well_formed_email(value) {
        issues.push(FieldIssue::invalid(field, "is not a valid email address"));
    }
}

fn check_phone(issues: &mut Vec<FieldIssue>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        issues.push(FieldIssue::required(field));
    } else if !is_well_formed_phone(value) {
        issues.push(FieldIssue::invalid(field, "is not a valid phone number"));
    }
}

fn check_birth_date(issues: &mut Vec<FieldIssue>, field: &'static str, value: &str) {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) if date > Utc::now().date_naive() => {
            issues.push(FieldIssue::invalid(field, "is in the future"));
        }
        Ok(_) => {}
        Err(_) => issues.push(FieldIssue::invalid(field, "must be YYYY-MM-DD")),
    }
}

/// Structural email check: one `@`, non-empty local part, dotted domain.
pub fn is_well_formed_email(value: &str) -> bool {
    let value = value.trim();
    let mut parts = value.splitn(2, '@');
    let (local, domain) = match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => (local, domain),
        _ => return false,
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

/// Phone check: 7 to 15 digits after stripping separators and a leading `+`.
pub fn is_well_formed_phone(value: &str) -> bool {
    let trimmed = value.trim();
    let digits: String = trimmed
        .strip_prefix('+')
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{sample_doctor_profile, sample_patient_profile};

    #[test]
    fn test_sample_profiles_are_valid() {
        assert!(validate_doctor_profile(&sample_doctor_profile()).is_empty());
        assert!(validate_patient_profile(&sample_patient_profile()).is_empty());
    }

    #[test]
    fn test_missing_required_fields_reported() {
        let mut profile = sample_doctor_profile();
        profile.personal.first_name = "  ".into();
        profile.professional.registration_number = String::new();

        let issues = validate_doctor_profile(&profile);
        let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["first_name", "registration_number"]);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_well_formed_email("kavitha@example.org"));
        assert!(is_well_formed_email("a.b+tag@clinic.co.in"));
        assert!(!is_well_formed_email("no-at-sign"));
        assert!(!is_well_formed_email("@example.org"));
        assert!(!is_well_formed_email("user@nodot"));
        assert!(!is_well_formed_email("user@.org"));
        assert!(!is_well_formed_email("user name@example.org"));
    }

    #[test]
    fn test_phone_validation() {
        assert!(is_well_formed_phone("+91 98765 43210"));
        assert!(is_well_formed_phone("044-2345-6789"));
        assert!(!is_well_formed_phone("12345"));
        assert!(!is_well_formed_phone("not-a-number"));
        assert!(!is_well_formed_phone("1234567890123456"));
    }

    #[test]
    fn test_future_birth_date_rejected() {
        let mut profile = sample_patient_profile();
        profile.personal.date_of_birth = "2999-01-01".into();
        let issues = validate_patient_profile(&profile);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "date_of_birth");

        profile.personal.date_of_birth = "12/04/1990".into();
        let issues = validate_patient_profile(&profile);
        assert_eq!(issues[0].message, "must be YYYY-MM-DD");
    }

    #[test]
    fn test_describe_issues_joins_fields() {
        let issues = vec![
            FieldIssue::required("first_name"),
            FieldIssue::invalid("email", "is not a valid email address"),
        ];
        assert_eq!(
            describe_issues(&issues),
            "first_name is required; email is not a valid email address"
        );
    }
}
