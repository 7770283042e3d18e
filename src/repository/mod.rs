//! Repository layer for database operations
//!
//! Each entity kind sits behind an async trait so services can run against
//! PostgreSQL in production and against mocks or in-memory stores in tests.

pub mod authors;
pub mod book_instances;
pub mod books;
pub mod genres;
pub mod languages;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use authors::AuthorsRepository;
pub use book_instances::BookInstancesRepository;
pub use books::BooksRepository;
pub use genres::GenresRepository;
pub use languages::LanguagesRepository;
pub use users::UsersRepository;

/// Handles to every repository, shared by the services
#[derive(Clone)]
pub struct Repository {
    pub authors: Arc<dyn AuthorsRepository>,
    pub books: Arc<dyn BooksRepository>,
    pub book_instances: Arc<dyn BookInstancesRepository>,
    pub genres: Arc<dyn GenresRepository>,
    pub languages: Arc<dyn LanguagesRepository>,
    pub users: Arc<dyn UsersRepository>,
}

impl Repository {
    /// Create PostgreSQL-backed repositories sharing one pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Arc::new(authors::PgAuthorsRepository::new(pool.clone())),
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            book_instances: Arc::new(book_instances::PgBookInstancesRepository::new(pool.clone())),
            genres: Arc::new(genres::PgGenresRepository::new(pool.clone())),
            languages: Arc::new(languages::PgLanguagesRepository::new(pool.clone())),
            users: Arc::new(users::PgUsersRepository::new(pool)),
        }
    }
}
