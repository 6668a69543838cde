//! Data models for the Local Library catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod form;
pub mod genre;
pub mod language;
pub mod pagination;
pub mod renewal;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetail, AuthorForm, AuthorSummary};
pub use book::{Book, BookDetail, BookForm, BookSummary};
pub use book_instance::{BookInstance, BookInstanceForm, InstanceListing, LoanStatus};
pub use form::{FormErrors, FormOutcome, FormResponse};
pub use genre::{Genre, GenreForm};
pub use language::{Language, LanguageForm};
pub use pagination::{Page, PageQuery, Paginator};
pub use renewal::{RenewBookForm, RenewalPolicy};
pub use user::{Permission, User, UserClaims};
