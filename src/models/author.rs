//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{book::BookSummary, form::trimmed};

/// Full author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Date of death, labelled "died"
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// "last_name, first_name"
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }

    pub fn absolute_url(&self) -> String {
        author_url(self.id)
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

pub fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{}, {}", last_name, first_name)
}

pub fn author_url(id: i32) -> String {
    format!("/catalog/author/{}", id)
}

/// Author row in the paginated author list
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorSummary {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl From<Author> for AuthorSummary {
    fn from(author: Author) -> Self {
        AuthorSummary {
            id: author.id,
            name: author.display_name(),
            url: author.absolute_url(),
            date_of_birth: author.date_of_birth,
            date_of_death: author.date_of_death,
        }
    }
}

/// Author detail page: the author and their books
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetail {
    #[serde(flatten)]
    pub author: Author,
    pub name: String,
    pub books: Vec<BookSummary>,
}

/// Create/update author request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_lifespan", skip_on_field_errors = false))]
pub struct AuthorForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub date_of_death: Option<NaiveDate>,
}

impl AuthorForm {
    /// Blank create form; birth date starts at today
    pub fn initial(today: NaiveDate) -> Self {
        AuthorForm {
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: Some(today),
            date_of_death: None,
        }
    }
}

impl From<&Author> for AuthorForm {
    fn from(author: &Author) -> Self {
        AuthorForm {
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            date_of_birth: author.date_of_birth,
            date_of_death: author.date_of_death,
        }
    }
}

fn validate_lifespan(form: &AuthorForm) -> Result<(), ValidationError> {
    match (form.date_of_birth, form.date_of_death) {
        (Some(born), Some(died)) if died < born => {
            let mut err = ValidationError::new("date_of_death");
            err.message = Some("Date of death cannot be before date of birth".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Author {
        Author {
            id: 1,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            date_of_birth: None,
            date_of_death: None,
        }
    }

    #[test]
    fn display_is_last_comma_first() {
        assert_eq!(author().to_string(), "Doe, John");
    }

    #[test]
    fn absolute_url_uses_id() {
        assert_eq!(author().absolute_url(), "/catalog/author/1");
    }

    #[test]
    fn initial_form_defaults_birth_to_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let form = AuthorForm::initial(today);
        assert_eq!(form.date_of_birth, Some(today));
        assert!(form.date_of_death.is_none());
    }

    #[test]
    fn death_before_birth_is_rejected() {
        let form = AuthorForm {
            first_name: "Ann".into(),
            last_name: "Smith".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1900, 1, 1),
            date_of_death: NaiveDate::from_ymd_opt(1899, 1, 1),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn blank_names_are_rejected() {
        let form = AuthorForm::initial(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("last_name"));
    }

    #[test]
    fn whitespace_names_are_blank() {
        let form: AuthorForm = serde_json::from_value(serde_json::json!({
            "first_name": "  ",
            "last_name": " Smith ",
        }))
        .unwrap();

        assert_eq!(form.first_name, "");
        assert_eq!(form.last_name, "Smith");
        assert!(form.validate().unwrap_err().field_errors().contains_key("first_name"));
    }
}
