//! Declarative field rules.
//!
//! A [`Validator`] maps each field to an ordered list of [`Rule`]s. All fields are
//! checked and every failure is collected, so a response reports every bad field at once.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// "nombre_completo" -> "nombre completo"
fn attribute(field: &str) -> String {
    field.replace('_', " ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Present and not blank. When it fails the field's other rules are skipped.
    Required,
    /// At least `n` characters.
    Min(usize),
    Email,
}

impl Rule {
    fn passes(&self, value: &str) -> bool {
        match self {
            Rule::Required => !value.trim().is_empty(),
            Rule::Min(n) => value.chars().count() >= *n,
            Rule::Email => is_valid_email(value),
        }
    }

    fn message(&self, field: &str) -> String {
        let attr = attribute(field);
        match self {
            Rule::Required => format!("El campo {attr} es obligatorio."),
            Rule::Min(n) => format!("El campo {attr} debe contener al menos {n} caracteres."),
            Rule::Email => format!("El campo {attr} debe ser una dirección de correo válida."),
        }
    }
}

/// Field name to messages, serialized as the `mensajes` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Records the unique-rule failure for `field`.
    pub fn add_taken(&mut self, field: &str) {
        self.add(field, format!("El campo {} ya ha sido registrado.", attribute(field)));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    fields: Vec<(&'static str, Vec<Rule>)>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields.push((name, rules.into_iter().collect()));
        self
    }

    /// Runs every rule against the values `lookup` yields for each field.
    pub fn validate<'a, F>(&self, lookup: F) -> ValidationErrors
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut errors = ValidationErrors::new();
        for (field, rules) in &self.fields {
            let value = lookup(field).unwrap_or("");
            for rule in rules {
                if rule.passes(value) {
                    continue;
                }
                errors.add(field, rule.message(field));
                if *rule == Rule::Required {
                    break;
                }
            }
        }
        errors
    }
}
