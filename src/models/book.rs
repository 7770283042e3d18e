//! Book (catalog title) model and related types

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{author::Author, book_instance::BookInstance, genre::Genre, language::Language};

/// Title substring highlighted on the catalog home page
pub const FEATURED_TITLE_FRAGMENT: &str = "ove";

/// Full book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author_id: Option<i32>,
    pub language_id: Option<i32>,
}

/// Book with its relations, as shown on the detail page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    pub book: Book,
    pub author: Option<Author>,
    pub language: Option<Language>,
    pub genres: Vec<Genre>,
    pub display_genre: String,
    pub bookinstance_set: Vec<BookInstance>,
}

/// Row of the admin book list
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct BookListRow {
    pub id: i32,
    pub title: String,
    /// "Last, First" of the author, if any
    pub author: Option<String>,
    pub display_genre: String,
}

/// Fields accepted when creating a book
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookCreateForm {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    pub summary: String,
    #[validate(length(min = 1, max = 13, message = "ISBN must be 1-13 characters"))]
    pub isbn: String,
}

impl BookCreateForm {
    pub const FIELDS: &'static [&'static str] = &["title", "summary", "isbn"];

    /// Values pre-filled on the blank create form only
    pub fn initial() -> Value {
        json!({ "isbn": "1234567890" })
    }
}

/// Fields accepted when updating a book
///
/// Every column is listed explicitly; new columns stay read-only until added here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookUpdateForm {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    pub summary: String,
    #[validate(length(min = 1, max = 13, message = "ISBN must be 1-13 characters"))]
    pub isbn: String,
    #[serde(default)]
    pub author_id: Option<i32>,
    #[serde(default)]
    pub language_id: Option<i32>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

impl BookUpdateForm {
    pub const FIELDS: &'static [&'static str] = &[
        "title",
        "summary",
        "isbn",
        "author_id",
        "language_id",
        "genre_ids",
    ];

    /// Bind the form to a stored book and its genres
    pub fn from_book(book: &Book, genres: &[Genre]) -> Self {
        Self {
            title: book.title.clone(),
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            author_id: book.author_id,
            language_id: book.language_id,
            genre_ids: genres.iter().map(|g| g.id).collect(),
        }
    }
}
