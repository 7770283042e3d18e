//! Catalog browsing and author/book maintenance

use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorDetails, AuthorForm},
        book::{Book, BookCreateForm, BookDetails, BookUpdateForm, FEATURED_TITLE_FRAGMENT},
        book_instance::LoanStatus,
        form::Submission,
        genre::display_genre,
        page::PageMeta,
    },
    repository::Repository,
};

/// Books per page on the book list
pub const BOOKS_PER_PAGE: i64 = 2;

/// Authors per page on the author list
pub const AUTHORS_PER_PAGE: i64 = 3;

/// Counts shown on the catalog home page
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CatalogCounts {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
    pub num_language: i64,
    /// Books whose title contains the featured fragment
    pub book_contains: Vec<Book>,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Home page counts
    pub async fn summary(&self) -> AppResult<CatalogCounts> {
        Ok(CatalogCounts {
            num_books: self.repository.books.count().await?,
            num_instances: self.repository.book_instances.count().await?,
            num_instances_available: self
                .repository
                .book_instances
                .count_by_status(LoanStatus::Available)
                .await?,
            num_authors: self.repository.authors.count().await?,
            num_language: self.repository.languages.count().await?,
            book_contains: self
                .repository
                .books
                .list_title_contains(FEATURED_TITLE_FRAGMENT)
                .await?,
        })
    }

    /// One page of the book list
    pub async fn list_books(&self, page: Option<&str>) -> AppResult<(Vec<Book>, PageMeta)> {
        let count = self.repository.books.count().await?;
        let meta = PageMeta::resolve(page, count, BOOKS_PER_PAGE)?;
        let books = self.repository.books.list(meta.limit(), meta.offset()).await?;
        Ok((books, meta))
    }

    /// One page of the author list
    pub async fn list_authors(&self, page: Option<&str>) -> AppResult<(Vec<Author>, PageMeta)> {
        let count = self.repository.authors.count().await?;
        let meta = PageMeta::resolve(page, count, AUTHORS_PER_PAGE)?;
        let authors = self.repository.authors.list(meta.limit(), meta.offset()).await?;
        Ok((authors, meta))
    }

    /// Book with author, language, genres and copies
    pub async fn book_details(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;

        let author = match book.author_id {
            Some(author_id) => Some(self.repository.authors.get_by_id(author_id).await?),
            None => None,
        };
        let language = match book.language_id {
            Some(language_id) => Some(self.repository.languages.get_by_id(language_id).await?),
            None => None,
        };
        let genres = self.repository.books.genres(id).await?;
        let bookinstance_set = self.repository.book_instances.list_for_book(id).await?;

        Ok(BookDetails {
            display_genre: display_genre(&genres),
            book,
            author,
            language,
            genres,
            bookinstance_set,
        })
    }

    /// Author with their books
    pub async fn author_details(&self, id: i32) -> AppResult<AuthorDetails> {
        let author = self.repository.authors.get_by_id(id).await?;
        let book_set = self.repository.books.list_by_author(id).await?;
        Ok(AuthorDetails { author, book_set })
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Update form bound to the stored book
    pub async fn book_update_form(&self, id: i32) -> AppResult<BookUpdateForm> {
        let book = self.repository.books.get_by_id(id).await?;
        let genres = self.repository.books.genres(id).await?;
        Ok(BookUpdateForm::from_book(&book, &genres))
    }

    pub async fn create_author(&self, form: &AuthorForm) -> AppResult<Submission<Author>> {
        if let Err(errors) = form.validate() {
            return Ok(Submission::Invalid(errors));
        }
        let author = self.repository.authors.create(form).await?;
        tracing::info!("Created author {} ({})", author.id, author.display_name());
        Ok(Submission::Saved(author))
    }

    pub async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Submission<Author>> {
        // 404 takes precedence over form errors
        self.repository.authors.get_by_id(id).await?;
        if let Err(errors) = form.validate() {
            return Ok(Submission::Invalid(errors));
        }
        let author = self.repository.authors.update(id, form).await?;
        tracing::info!("Updated author {}", id);
        Ok(Submission::Saved(author))
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!("Deleted author {}", id);
        Ok(())
    }

    pub async fn create_book(&self, form: &BookCreateForm) -> AppResult<Submission<Book>> {
        if let Err(errors) = form.validate() {
            return Ok(Submission::Invalid(errors));
        }
        let book = self.repository.books.create(form).await?;
        tracing::info!("Created book {} ({})", book.id, book.title);
        Ok(Submission::Saved(book))
    }

    pub async fn update_book(&self, id: i32, form: &BookUpdateForm) -> AppResult<Submission<Book>> {
        self.repository.books.get_by_id(id).await?;
        if let Err(errors) = form.validate() {
            return Ok(Submission::Invalid(errors));
        }
        let book = self.repository.books.update(id, form).await?;
        tracing::info!("Updated book {}", id);
        Ok(Submission::Saved(book))
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Deleted book {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::predicate::eq;

    use super::*;
    use crate::{
        error::AppError,
        repository::{
            authors::MockAuthorsRepository, book_instances::MockBookInstancesRepository,
            books::MockBooksRepository, genres::MockGenresRepository,
            languages::MockLanguagesRepository, users::MockUsersRepository,
        },
    };

    struct Mocks {
        authors: MockAuthorsRepository,
        books: MockBooksRepository,
        book_instances: MockBookInstancesRepository,
        languages: MockLanguagesRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                authors: MockAuthorsRepository::new(),
                books: MockBooksRepository::new(),
                book_instances: MockBookInstancesRepository::new(),
                languages: MockLanguagesRepository::new(),
            }
        }

        fn service(self) -> CatalogService {
            CatalogService::new(Repository {
                authors: Arc::new(self.authors),
                books: Arc::new(self.books),
                book_instances: Arc::new(self.book_instances),
                genres: Arc::new(MockGenresRepository::new()),
                languages: Arc::new(self.languages),
                users: Arc::new(MockUsersRepository::new()),
            })
        }
    }

    fn book(id: i32, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            summary: String::new(),
            isbn: "1234567890".to_string(),
            author_id: None,
            language_id: None,
        }
    }

    #[tokio::test]
    async fn summary_of_empty_store_is_all_zero() {
        let mut mocks = Mocks::new();
        mocks.books.expect_count().returning(|| Ok(0));
        mocks
            .books
            .expect_list_title_contains()
            .with(eq("ove"))
            .returning(|_| Ok(vec![]));
        mocks.book_instances.expect_count().returning(|| Ok(0));
        mocks
            .book_instances
            .expect_count_by_status()
            .with(eq(LoanStatus::Available))
            .returning(|_| Ok(0));
        mocks.authors.expect_count().returning(|| Ok(0));
        mocks.languages.expect_count().returning(|| Ok(0));

        let summary = mocks.service().summary().await.unwrap();
        assert_eq!(
            summary,
            CatalogCounts {
                num_books: 0,
                num_instances: 0,
                num_instances_available: 0,
                num_authors: 0,
                num_language: 0,
                book_contains: vec![],
            }
        );
    }

    #[tokio::test]
    async fn book_list_pages_by_two() {
        let mut mocks = Mocks::new();
        mocks.books.expect_count().returning(|| Ok(5));
        mocks
            .books
            .expect_list()
            .with(eq(2), eq(2))
            .returning(|_, _| Ok(vec![book(3, "C"), book(4, "D")]));

        let (books, meta) = mocks.service().list_books(Some("2")).await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(meta.num_pages, 3);
        assert!(meta.has_next && meta.has_previous);
    }

    #[tokio::test]
    async fn author_page_out_of_range_is_not_found() {
        let mut mocks = Mocks::new();
        mocks.authors.expect_count().returning(|| Ok(3));
        mocks.authors.expect_list().never();

        let result = mocks.service().list_authors(Some("2")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn invalid_book_is_not_persisted() {
        let mut mocks = Mocks::new();
        mocks.books.expect_create().never();

        let form = BookCreateForm {
            title: String::new(),
            summary: String::new(),
            isbn: "1234567890".into(),
        };
        let outcome = mocks.service().create_book(&form).await.unwrap();
        match outcome {
            Submission::Invalid(errors) => assert!(errors.field_errors().contains_key("title")),
            Submission::Saved(_) => panic!("blank title must be rejected"),
        }
    }

    #[tokio::test]
    async fn updating_missing_author_is_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .authors
            .expect_get_by_id()
            .with(eq(42))
            .returning(|id| Err(AppError::not_found("Author", id)));
        mocks.authors.expect_update().never();

        let form = AuthorForm {
            first_name: "A".into(),
            last_name: "B".into(),
            date_of_birth: None,
            date_of_death: None,
        };
        let result = mocks.service().update_author(42, &form).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
