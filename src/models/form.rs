//! Form submission results shared by the create/update/renew flows

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use validator::ValidationErrors;

/// Deserialize a text field with surrounding whitespace removed, so length
/// rules see the value that is stored
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(match value.trim() {
        t if t.len() == value.len() => value,
        t => t.to_string(),
    })
}

/// Field name to messages. `__all__` holds errors not tied to one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(pub IndexMap<String, Vec<String>>);

impl FormErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Fold in another form's errors under `<prefix>-<field>` keys
    pub fn merge_prefixed(&mut self, prefix: &str, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0
                .entry(format!("{}-{}", prefix, field))
                .or_default()
                .extend(messages);
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::new();
        for (field, list) in errors.field_errors() {
            for err in list {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                out.add(&field, message);
            }
        }
        out.0.sort_keys();
        out
    }
}

/// A form as submitted (or initially proposed) plus its errors
#[derive(Debug, Clone, Serialize)]
pub struct FormResponse<T> {
    pub form: T,
    pub errors: FormErrors,
}

impl<T> FormResponse<T> {
    pub fn initial(form: T) -> Self {
        Self {
            form,
            errors: FormErrors::new(),
        }
    }

    pub fn invalid(form: T, errors: FormErrors) -> Self {
        Self { form, errors }
    }
}

/// Result of processing a submitted form: the saved record, or what to show again
#[derive(Debug)]
pub enum FormOutcome<T, F> {
    Saved(T),
    Invalid(F),
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 2, message = "Too short"))]
        name: String,
    }

    #[test]
    fn validation_errors_keep_messages() {
        let errors = Probe { name: "x".into() }.validate().unwrap_err();
        let form_errors = FormErrors::from(errors);
        assert_eq!(form_errors.get("name"), Some(&["Too short".to_string()][..]));
    }

    #[test]
    fn add_accumulates_per_field() {
        let mut errors = FormErrors::new();
        errors.add("renewal_date", "a");
        errors.add("renewal_date", "b");
        assert_eq!(errors.get("renewal_date").map(|e| e.len()), Some(2));
        assert!(!errors.is_empty());
    }
}
