//! Data models for the catalog

pub mod admin;
pub mod author;
pub mod book;
pub mod book_instance;
pub mod form;
pub mod genre;
pub mod language;
pub mod page;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetails, AuthorForm};
pub use book::{Book, BookCreateForm, BookDetails, BookListRow, BookUpdateForm};
pub use book_instance::{BookInstance, BookInstanceForm, LoanStatus, LoanedInstance, RenewBookForm};
pub use form::{FormState, Submission};
pub use genre::{Genre, GenreForm};
pub use language::{Language, LanguageForm};
pub use page::{PageMeta, PageQuery};
pub use user::{Permission, User, UserClaims};
