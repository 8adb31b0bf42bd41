//! Input validation for the public forms.
//!
//! Each form is a plain deserializable struct holding the raw submitted
//! strings, and each `validate` function turns it into either the cleaned
//! value or a [`FieldErrors`] map that the templates render next to the
//! offending inputs.

use crate::models::{NewComment, NewContactMessage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("Invalid email regex pattern")
});

const MAX_EMAIL_LEN: usize = 254;
const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_REGEX.is_match(email)
}

fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
}

fn check_required(errors: &mut FieldErrors, field: &str, value: &str) -> bool {
    if value.is_empty() {
        errors.add(field, REQUIRED);
        false
    } else {
        true
    }
}

fn check_email(errors: &mut FieldErrors, field: &str, value: &str) {
    if !is_valid_email(value) {
        errors.add(field, INVALID_EMAIL);
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShareForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedShare {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: Option<String>,
}

impl ShareForm {
    pub fn validate(&self) -> Result<CleanedShare, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        let email = self.email.trim();
        let to = self.to.trim();
        let comments = self.comments.trim();

        if check_required(&mut errors, "name", name) {
            check_max_len(&mut errors, "name", name, 50);
        }
        if check_required(&mut errors, "email", email) {
            check_email(&mut errors, "email", email);
        }
        if check_required(&mut errors, "to", to) {
            check_email(&mut errors, "to", to);
        }

        errors.into_result(CleanedShare {
            name: name.to_string(),
            email: email.to_string(),
            to: to.to_string(),
            comments: (!comments.is_empty()).then(|| comments.to_string()),
        })
    }
}

/// Comment fields may all be left empty; an email, when given, must parse.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub body: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<NewComment, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        let email = self.email.trim();
        let body = self.body.trim();

        check_max_len(&mut errors, "name", name, 80);
        if !email.is_empty() {
            check_email(&mut errors, "email", email);
        }

        errors.into_result(NewComment {
            name: name.to_string(),
            email: email.to_string(),
            body: body.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub body: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<NewContactMessage, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        let email = self.email.trim();
        let body = self.body.trim();

        if check_required(&mut errors, "name", name) {
            check_max_len(&mut errors, "name", name, 80);
        }
        if check_required(&mut errors, "email", email) {
            check_email(&mut errors, "email", email);
        }
        check_required(&mut errors, "body", body);

        errors.into_result(NewContactMessage {
            name: name.to_string(),
            email: email.to_string(),
            body: body.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchForm {
    pub query: Option<String>,
    pub page: Option<String>,
}

impl SearchForm {
    /// Whether the visitor submitted the search form at all.
    pub fn submitted(&self) -> bool {
        self.query.is_some()
    }

    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let query = self.query.as_deref().unwrap_or("").trim();
        check_required(&mut errors, "query", query);
        errors.into_result(query.to_string())
    }
}
