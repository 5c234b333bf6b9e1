//! Validation of body-bound DTOs.

use crate::dto::{Constraint, Dto};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Field name to error message. Empty means valid.
pub type ValidationErrors = BTreeMap<String, String>;

pub trait Validator {
    fn validate(&self, dto: &dyn Dto) -> ValidationErrors;
}

pub type ValidatorPtr = Arc<dyn Validator + Send + Sync>;

const NOT_BLANK_MESSAGE: &str = "This value should not be blank.";
const EMAIL_MESSAGE: &str = "This value is not a valid email address.";
const REGEX_MESSAGE: &str = "This value does not match the required format.";

// dot-atom local part, dot-separated hostname labels
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$";

// constraints are applied in this order, regardless of declaration order
fn precedence(constraint: &Constraint) -> u8 {
    match constraint {
        Constraint::NotBlank => 0,
        Constraint::Email => 1,
        Constraint::Length { .. } => 2,
        Constraint::Regex(_) => 3,
    }
}

/// Applies the [Constraint]s declared by DTOs. Every failing field is reported. Constraints of a
/// field are checked in a fixed order: not blank, email, length, regex. If a field fails multiple
/// constraints, the message of the last failing one is kept.
#[derive(Default)]
pub struct ConstraintValidator {
    // compiled Regex constraint patterns, None for invalid ones
    patterns: RwLock<FxHashMap<String, Option<Regex>>>,
}

impl ConstraintValidator {
    fn matches(&self, pattern: &str, value: &str) -> bool {
        if let Some(regex) = self.patterns.read().get(pattern) {
            return regex.as_ref().map(|regex| regex.is_match(value)).unwrap_or(false);
        }

        let regex = Regex::new(pattern)
            .map_err(|error| warn!(pattern, %error, "Invalid constraint pattern."))
            .ok();
        let matched = regex
            .as_ref()
            .map(|regex| regex.is_match(value))
            .unwrap_or(false);

        self.patterns.write().insert(pattern.to_string(), regex);
        matched
    }

    fn check(&self, constraint: &Constraint, value: Option<&str>) -> Option<String> {
        match (constraint, value) {
            (Constraint::NotBlank, None) => Some(NOT_BLANK_MESSAGE.to_string()),
            (Constraint::NotBlank, Some(value)) if value.trim().is_empty() => {
                Some(NOT_BLANK_MESSAGE.to_string())
            }
            (Constraint::Email, Some(value)) if !self.matches(EMAIL_PATTERN, value) => {
                Some(EMAIL_MESSAGE.to_string())
            }
            (Constraint::Length { min, max }, value) => {
                let length = value.map(|value| value.chars().count()).unwrap_or(0);
                if length < *min {
                    Some(format!(
                        "This value is too short. Minimum length is {min}."
                    ))
                } else if length > *max {
                    Some(format!("This value is too long. Maximum length is {max}."))
                } else {
                    None
                }
            }
            (Constraint::Regex(pattern), Some(value)) if !self.matches(pattern, value) => {
                Some(REGEX_MESSAGE.to_string())
            }
            _ => None,
        }
    }
}

impl Validator for ConstraintValidator {
    fn validate(&self, dto: &dyn Dto) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for field in dto.constraints() {
            let mut constraints: Vec<_> = field.constraints.iter().collect();
            constraints.sort_by_key(|constraint| precedence(constraint));

            for constraint in constraints {
                if let Some(message) = self.check(constraint, field.value.as_deref()) {
                    errors.insert(field.field.to_string(), message);
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use crate::dto::{Constraint, Dto, FieldConstraints};
    use crate::validation::{ConstraintValidator, Validator};

    #[derive(Debug, Default)]
    struct Signup {
        name: Option<String>,
        email: String,
        code: String,
    }

    impl Dto for Signup {
        fn constraints(&self) -> Vec<FieldConstraints> {
            vec![
                FieldConstraints {
                    field: "name",
                    value: self.name.clone(),
                    constraints: vec![Constraint::NotBlank, Constraint::min_length(3)],
                },
                FieldConstraints {
                    field: "email",
                    value: Some(self.email.clone()),
                    constraints: vec![Constraint::Email],
                },
                FieldConstraints {
                    field: "code",
                    value: Some(self.code.clone()),
                    constraints: vec![Constraint::Regex("^[A-Z]{3}$".to_string())],
                },
            ]
        }
    }

    #[test]
    fn should_accept_valid_dto() {
        let dto = Signup {
            name: Some("Ann".to_string()),
            email: "ann@example.com".to_string(),
            code: "ABC".to_string(),
        };

        assert!(ConstraintValidator::default().validate(&dto).is_empty());
    }

    #[test]
    fn should_report_every_failing_field() {
        let dto = Signup {
            name: None,
            email: "not-an-email".to_string(),
            code: "abc".to_string(),
        };

        let errors = ConstraintValidator::default().validate(&dto);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["email"], "This value is not a valid email address.");
        assert_eq!(errors["code"], "This value does not match the required format.");
    }

    #[test]
    fn should_keep_last_failing_constraint_message() {
        let dto = Signup {
            name: Some(" ".to_string()),
            email: "ann@example.com".to_string(),
            code: "ABC".to_string(),
        };

        let errors = ConstraintValidator::default().validate(&dto);
        assert_eq!(
            errors["name"],
            "This value is too short. Minimum length is 3."
        );
    }

    #[derive(Debug)]
    struct Contact(&'static str);

    impl Dto for Contact {
        fn constraints(&self) -> Vec<FieldConstraints> {
            vec![FieldConstraints {
                field: "email",
                value: Some(self.0.to_string()),
                constraints: vec![Constraint::Email],
            }]
        }
    }

    #[test]
    fn should_recognize_email_addresses() {
        let validator = ConstraintValidator::default();
        let is_valid = |email| validator.validate(&Contact(email)).is_empty();

        for email in [
            "a@b.io",
            "first.last@mail.example.com",
            "o'hara+tag@x-y.example.org",
        ] {
            assert!(is_valid(email), "{email}");
        }

        for email in [
            "a@b",
            "@b.io",
            "a@.io",
            "a@b.io.",
            "a b@c.io",
            "a@b@c.io",
            "a,b@c.d",
            "a@b.c,",
            "<x>@y.z",
            "a..b@c.d",
            ".a@b.io",
            "a@b.c;rm",
            "\"@a.b",
            "a@-b.io",
        ] {
            assert!(!is_valid(email), "{email}");
        }
    }

    #[test]
    fn should_apply_constraints_in_fixed_order() {
        #[derive(Debug)]
        struct Nickname(&'static str);

        impl Dto for Nickname {
            fn constraints(&self) -> Vec<FieldConstraints> {
                vec![FieldConstraints {
                    field: "nickname",
                    value: Some(self.0.to_string()),
                    constraints: vec![
                        Constraint::Regex("^[a-z]+$".to_string()),
                        Constraint::min_length(3),
                        Constraint::NotBlank,
                    ],
                }]
            }
        }

        let validator = ConstraintValidator::default();
        assert_eq!(
            validator.validate(&Nickname(" "))["nickname"],
            "This value does not match the required format."
        );
        assert_eq!(
            validator.validate(&Nickname("ab"))["nickname"],
            "This value is too short. Minimum length is 3."
        );
    }

    #[test]
    fn should_check_maximum_length() {
        struct Short(String);

        impl std::fmt::Debug for Short {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("Short")
            }
        }

        impl Dto for Short {
            fn constraints(&self) -> Vec<FieldConstraints> {
                vec![FieldConstraints {
                    field: "value",
                    value: Some(self.0.clone()),
                    constraints: vec![Constraint::max_length(2)],
                }]
            }
        }

        assert_eq!(
            ConstraintValidator::default().validate(&Short("abc".to_string()))["value"],
            "This value is too long. Maximum length is 2."
        );
    }
}
