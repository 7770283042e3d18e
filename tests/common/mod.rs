//! In-memory storage and router fixtures for the HTTP tests

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use catalog_server::{
    config::AppConfig,
    create_router,
    error::{AppError, AppResult},
    models::{
        admin::InstanceFilter,
        author::{Author, AuthorForm},
        book::{Book, BookCreateForm, BookListRow, BookUpdateForm},
        book_instance::{BookInstance, BookInstanceForm, LoanStatus},
        genre::{display_genre, Genre, GenreForm},
        language::{Language, LanguageForm},
        user::{AccountTypeSlug, Permission, User, UserClaims},
    },
    repository::{
        AuthorsRepository, BookInstancesRepository, BooksRepository, GenresRepository,
        LanguagesRepository, Repository, UsersRepository,
    },
    services::{sessions::SessionStore, Services},
    AppState,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    authors: Vec<Author>,
    books: Vec<Book>,
    book_genres: Vec<(i32, i32)>,
    instances: Vec<BookInstance>,
    genres: Vec<Genre>,
    languages: Vec<Language>,
    users: Vec<User>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Copy with the joined display columns filled in, as the SQL query returns it
    fn joined(&self, instance: &BookInstance) -> BookInstance {
        let mut row = instance.clone();
        row.book_title = self
            .books
            .iter()
            .find(|b| b.id == instance.book_id)
            .map(|b| b.title.clone());
        row.borrower_username = instance
            .borrower_id
            .and_then(|id| self.users.iter().find(|u| u.id == id))
            .map(|u| u.username.clone());
        row
    }

    /// Rows in `ORDER BY due_back, id` order (NULL due dates last)
    fn sorted_instances<F: Fn(&BookInstance) -> bool>(&self, keep: F) -> Vec<BookInstance> {
        let mut rows: Vec<BookInstance> = self
            .instances
            .iter()
            .filter(|i| keep(i))
            .map(|i| self.joined(i))
            .collect();
        rows.sort_by_key(|i| (i.due_back.is_none(), i.due_back, i.id));
        rows
    }
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

/// Catalog tables held in memory, implementing every repository trait
#[derive(Default)]
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
}

impl MemoryCatalog {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn add_author(&self, first_name: &str, last_name: &str) -> Author {
        let mut t = self.tables();
        let author = Author {
            id: t.next_id(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth: None,
            date_of_death: None,
        };
        t.authors.push(author.clone());
        author
    }

    pub fn add_book(&self, title: &str, author_id: Option<i32>) -> Book {
        let mut t = self.tables();
        let book = Book {
            id: t.next_id(),
            title: title.into(),
            summary: String::new(),
            isbn: "9780000000000".into(),
            author_id,
            language_id: None,
        };
        t.books.push(book.clone());
        book
    }

    pub fn add_language(&self, name: &str) -> Language {
        let mut t = self.tables();
        let language = Language {
            id: t.next_id(),
            name: name.into(),
        };
        t.languages.push(language.clone());
        language
    }

    pub fn add_instance(
        &self,
        book_id: i32,
        status: LoanStatus,
        due_back: Option<NaiveDate>,
        borrower_id: Option<i32>,
    ) -> BookInstance {
        let instance = BookInstance {
            id: Uuid::new_v4(),
            book_id,
            imprint: "Test imprint".into(),
            due_back,
            status,
            borrower_id,
            book_title: None,
            borrower_username: None,
        };
        self.tables().instances.push(instance.clone());
        instance
    }

    pub fn add_user(&self, username: &str, account_type: AccountTypeSlug, permissions: Vec<Permission>) -> User {
        let mut t = self.tables();
        let user = User {
            id: t.next_id(),
            username: username.into(),
            password_hash: String::new(),
            first_name: username.into(),
            last_name: String::new(),
            email: None,
            account_type,
            permissions,
        };
        t.users.push(user.clone());
        user
    }

    pub fn set_password_hash(&self, user_id: i32, hash: String) {
        if let Some(user) = self.tables().users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = hash;
        }
    }

    pub fn instance(&self, id: Uuid) -> Option<BookInstance> {
        self.tables().instances.iter().find(|i| i.id == id).cloned()
    }

    pub fn author_count(&self) -> usize {
        self.tables().authors.len()
    }

    pub fn book_titled(&self, title: &str) -> Option<Book> {
        self.tables().books.iter().find(|b| b.title == title).cloned()
    }
}

#[async_trait]
impl AuthorsRepository for MemoryCatalog {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables().authors.len() as i64)
    }

    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Author>> {
        let mut authors = self.tables().authors.clone();
        authors.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(page(authors, limit, offset))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        self.tables()
            .authors
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Author", id))
    }

    async fn create(&self, form: &AuthorForm) -> AppResult<Author> {
        let mut t = self.tables();
        let author = Author {
            id: t.next_id(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            date_of_birth: form.date_of_birth,
            date_of_death: form.date_of_death,
        };
        t.authors.push(author.clone());
        Ok(author)
    }

    async fn update(&self, id: i32, form: &AuthorForm) -> AppResult<Author> {
        let mut t = self.tables();
        let author = t
            .authors
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::not_found("Author", id))?;
        author.first_name = form.first_name.clone();
        author.last_name = form.last_name.clone();
        author.date_of_birth = form.date_of_birth;
        author.date_of_death = form.date_of_death;
        Ok(author.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut t = self.tables();
        let before = t.authors.len();
        t.authors.retain(|a| a.id != id);
        if t.authors.len() == before {
            return Err(AppError::not_found("Author", id));
        }
        // ON DELETE SET NULL
        for book in t.books.iter_mut().filter(|b| b.author_id == Some(id)) {
            book.author_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl BooksRepository for MemoryCatalog {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables().books.len() as i64)
    }

    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>> {
        let mut books = self.tables().books.clone();
        books.sort_by_key(|b| b.id);
        Ok(page(books, limit, offset))
    }

    async fn list_title_contains(&self, fragment: &str) -> AppResult<Vec<Book>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .tables()
            .books
            .iter()
            .filter(|b| b.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        Ok(self
            .tables()
            .books
            .iter()
            .filter(|b| b.author_id == Some(author_id))
            .cloned()
            .collect())
    }

    async fn list_rows(&self, limit: i64, offset: i64) -> AppResult<Vec<BookListRow>> {
        let books = BooksRepository::list(self, limit, offset).await?;
        let mut rows = Vec::with_capacity(books.len());
        for book in books {
            let genres = self.genres(book.id).await?;
            let author = book.author_id.and_then(|id| {
                self.tables()
                    .authors
                    .iter()
                    .find(|a| a.id == id)
                    .map(Author::display_name)
            });
            rows.push(BookListRow {
                id: book.id,
                title: book.title,
                author,
                display_genre: display_genre(&genres),
            });
        }
        Ok(rows)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.tables()
            .books
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Book", id))
    }

    async fn genres(&self, book_id: i32) -> AppResult<Vec<Genre>> {
        let t = self.tables();
        let mut genres: Vec<Genre> = t
            .book_genres
            .iter()
            .filter(|(b, _)| *b == book_id)
            .filter_map(|(_, g)| t.genres.iter().find(|genre| genre.id == *g).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    async fn create(&self, form: &BookCreateForm) -> AppResult<Book> {
        let mut t = self.tables();
        let book = Book {
            id: t.next_id(),
            title: form.title.clone(),
            summary: form.summary.clone(),
            isbn: form.isbn.clone(),
            author_id: None,
            language_id: None,
        };
        t.books.push(book.clone());
        Ok(book)
    }

    async fn update(&self, id: i32, form: &BookUpdateForm) -> AppResult<Book> {
        let mut t = self.tables();
        let book = t
            .books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::not_found("Book", id))?;
        book.title = form.title.clone();
        book.summary = form.summary.clone();
        book.isbn = form.isbn.clone();
        book.author_id = form.author_id;
        book.language_id = form.language_id;
        let updated = book.clone();

        t.book_genres.retain(|(b, _)| *b != id);
        for genre_id in &form.genre_ids {
            t.book_genres.push((id, *genre_id));
        }
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut t = self.tables();
        if t.instances.iter().any(|i| i.book_id == id) {
            // ON DELETE RESTRICT
            return Err(AppError::Conflict(format!("Book {} still has copies", id)));
        }
        let before = t.books.len();
        t.books.retain(|b| b.id != id);
        if t.books.len() == before {
            return Err(AppError::not_found("Book", id));
        }
        t.book_genres.retain(|(b, _)| *b != id);
        Ok(())
    }
}

#[async_trait]
impl BookInstancesRepository for MemoryCatalog {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables().instances.len() as i64)
    }

    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        Ok(self
            .tables()
            .instances
            .iter()
            .filter(|i| i.status == status)
            .count() as i64)
    }

    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        Ok(self.tables().sorted_instances(|i| i.book_id == book_id))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        let t = self.tables();
        t.instances
            .iter()
            .find(|i| i.id == id)
            .map(|i| t.joined(i))
            .ok_or_else(|| AppError::not_found("Book instance", id))
    }

    async fn count_on_loan(&self, borrower_id: Option<i32>) -> AppResult<i64> {
        Ok(self.list_on_loan(borrower_id, i64::MAX, 0).await?.len() as i64)
    }

    async fn list_on_loan(
        &self,
        borrower_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BookInstance>> {
        let rows = self.tables().sorted_instances(|i| {
            i.status == LoanStatus::OnLoan && borrower_id.map_or(true, |b| i.borrower_id == Some(b))
        });
        Ok(page(rows, limit, offset))
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<()> {
        let mut t = self.tables();
        let instance = t
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::not_found("Book instance", id))?;
        instance.due_back = Some(due_back);
        Ok(())
    }

    async fn count_filtered(&self, filter: InstanceFilter) -> AppResult<i64> {
        Ok(self.list_filtered(filter, i64::MAX, 0).await?.len() as i64)
    }

    async fn list_filtered(
        &self,
        filter: InstanceFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BookInstance>> {
        let rows = self
            .tables()
            .sorted_instances(|i| filter.matches(i.status, i.due_back));
        Ok(page(rows, limit, offset))
    }

    async fn create(&self, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let instance = self.add_instance(form.book_id, form.status, form.due_back, form.borrower_id);
        let mut t = self.tables();
        if let Some(stored) = t.instances.iter_mut().find(|i| i.id == instance.id) {
            stored.imprint = form.imprint.clone();
        }
        let stored = t.instances.iter().find(|i| i.id == instance.id).cloned();
        stored
            .map(|i| t.joined(&i))
            .ok_or_else(|| AppError::not_found("Book instance", instance.id))
    }

    async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let mut t = self.tables();
        let instance = t
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::not_found("Book instance", id))?;
        instance.book_id = form.book_id;
        instance.imprint = form.imprint.clone();
        instance.due_back = form.due_back;
        instance.status = form.status;
        instance.borrower_id = form.borrower_id;
        let updated = instance.clone();
        Ok(t.joined(&updated))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut t = self.tables();
        let before = t.instances.len();
        t.instances.retain(|i| i.id != id);
        if t.instances.len() == before {
            return Err(AppError::not_found("Book instance", id));
        }
        Ok(())
    }
}

#[async_trait]
impl GenresRepository for MemoryCatalog {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables().genres.len() as i64)
    }

    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Genre>> {
        let mut genres = self.tables().genres.clone();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page(genres, limit, offset))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Genre> {
        self.tables()
            .genres
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Genre", id))
    }

    async fn create(&self, form: &GenreForm) -> AppResult<Genre> {
        let mut t = self.tables();
        let genre = Genre {
            id: t.next_id(),
            name: form.name.clone(),
        };
        t.genres.push(genre.clone());
        Ok(genre)
    }

    async fn update(&self, id: i32, form: &GenreForm) -> AppResult<Genre> {
        let mut t = self.tables();
        let genre = t
            .genres
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| AppError::not_found("Genre", id))?;
        genre.name = form.name.clone();
        Ok(genre.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut t = self.tables();
        let before = t.genres.len();
        t.genres.retain(|g| g.id != id);
        if t.genres.len() == before {
            return Err(AppError::not_found("Genre", id));
        }
        t.book_genres.retain(|(_, g)| *g != id);
        Ok(())
    }
}

#[async_trait]
impl LanguagesRepository for MemoryCatalog {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables().languages.len() as i64)
    }

    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Language>> {
        let mut languages = self.tables().languages.clone();
        languages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page(languages, limit, offset))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Language> {
        self.tables()
            .languages
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Language", id))
    }

    async fn create(&self, form: &LanguageForm) -> AppResult<Language> {
        Ok(self.add_language(&form.name))
    }

    async fn update(&self, id: i32, form: &LanguageForm) -> AppResult<Language> {
        let mut t = self.tables();
        let language = t
            .languages
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::not_found("Language", id))?;
        language.name = form.name.clone();
        Ok(language.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut t = self.tables();
        let before = t.languages.len();
        t.languages.retain(|l| l.id != id);
        if t.languages.len() == before {
            return Err(AppError::not_found("Language", id));
        }
        for book in t.books.iter_mut().filter(|b| b.language_id == Some(id)) {
            book.language_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl UsersRepository for MemoryCatalog {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.tables()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

/// Session hashes held in memory
#[derive(Default)]
pub struct MemorySessions {
    sessions: Mutex<HashMap<String, HashMap<String, i64>>>,
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn incr(&self, session_id: &str, field: &str) -> AppResult<i64> {
        let mut sessions = self.sessions.lock().unwrap();
        let value = sessions
            .entry(session_id.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Router over in-memory storage, plus a handle on that storage
pub struct TestApp {
    pub router: Router,
    pub catalog: Arc<MemoryCatalog>,
    pub config: Arc<AppConfig>,
}

/// Parsed response
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let catalog = Arc::new(MemoryCatalog::default());
        let config = Arc::new(AppConfig::default());

        let repository = Repository {
            authors: catalog.clone(),
            books: catalog.clone(),
            book_instances: catalog.clone(),
            genres: catalog.clone(),
            languages: catalog.clone(),
            users: catalog.clone(),
        };
        let services = Services::new(
            repository,
            Arc::new(MemorySessions::default()),
            config.auth.clone(),
        );
        let router = create_router(AppState {
            config: config.clone(),
            services: Arc::new(services),
        });

        Self {
            router,
            catalog,
            config,
        }
    }

    /// Bearer token for a stored user
    pub fn token_for(&self, user: &User) -> String {
        let now = chrono::Utc::now().timestamp();
        UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            account_type: user.account_type,
            permissions: user.permissions.clone(),
            exp: now + 3600,
            iat: now,
        }
        .create_token(&self.config.auth.jwt_secret)
        .unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let location = header_value(header::LOCATION);
        let set_cookie = header_value(header::SET_COOKIE);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            location,
            set_cookie,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, None, Some(body)).await
    }
}
