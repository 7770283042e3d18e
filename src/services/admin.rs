//! Admin console: generic list, change form and CRUD over every catalog entity

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        admin::{AdminListQuery, AdminModel, InlineInstance, InstanceFilter, ModelAdmin, ADMIN_PAGE_SIZE},
        author::AuthorForm,
        book::{BookCreateForm, BookUpdateForm},
        book_instance::{BookInstance, BookInstanceForm, LoanStatus},
        form::Submission,
        genre::GenreForm,
        language::LanguageForm,
        page::PageMeta,
    },
    repository::Repository,
};

/// One page of an admin list
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminListPage {
    pub model_admin: ModelAdmin,
    /// Rows projected onto `list_display`, plus `id`
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Value>,
    pub page_obj: PageMeta,
}

/// A single object with its change-form layout
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminObject {
    pub model_admin: ModelAdmin,
    #[schema(value_type = Object)]
    pub object: Value,
    /// Copies edited inline on the book form
    pub inline_instances: Vec<BookInstance>,
}

/// Book change-form payload: book columns plus inline copy rows
#[derive(Debug, Clone, Deserialize)]
struct AdminBookPayload {
    #[serde(flatten)]
    book: BookUpdateForm,
    #[serde(default)]
    instances: Vec<InlineInstance>,
}

/// Integer primary key from the path; anything else is an unknown object
fn int_id(model: AdminModel, raw: &str) -> AppResult<i32> {
    raw.parse().map_err(|_| AppError::not_found(model.as_str(), raw))
}

fn uuid_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(AdminModel::BookInstances.as_str(), raw))
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> AppResult<T> {
    serde_json::from_value(payload).map_err(|e| AppError::BadRequest(format!("Invalid payload: {}", e)))
}

fn to_value<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("Serialization failed: {}", e)))
}

/// Keep `id` and the listed columns of a serialized row
fn project(row: Value, columns: &[&str]) -> Value {
    let Value::Object(mut source) = row else {
        return row;
    };
    let mut projected = Map::new();
    for column in std::iter::once(&"id").chain(columns.iter()) {
        if let Some(value) = source.remove(*column) {
            projected.insert(column.to_string(), value);
        }
    }
    Value::Object(projected)
}

fn instance_row(instance: &BookInstance) -> Value {
    json!({
        "id": instance.id,
        "book": instance.book_title,
        "status": instance.status.label(),
        "borrower": instance.borrower_username,
        "due_back": instance.due_back,
    })
}

#[derive(Clone)]
pub struct AdminService {
    repository: Repository,
}

impl AdminService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub fn registry(&self) -> Vec<ModelAdmin> {
        ModelAdmin::registry()
    }

    /// List page for one model; status and due date filters apply to copies only
    pub async fn list(
        &self,
        model: AdminModel,
        query: &AdminListQuery,
        today: NaiveDate,
    ) -> AppResult<AdminListPage> {
        let model_admin = ModelAdmin::for_model(model);
        let page = query.page.as_deref();

        let (rows, page_obj) = match model {
            AdminModel::Authors => {
                let count = self.repository.authors.count().await?;
                let meta = PageMeta::resolve(page, count, ADMIN_PAGE_SIZE)?;
                let authors = self.repository.authors.list(meta.limit(), meta.offset()).await?;
                let rows = authors
                    .iter()
                    .map(|a| to_value(a).map(|v| project(v, &model_admin.list_display)))
                    .collect::<AppResult<Vec<_>>>()?;
                (rows, meta)
            }
            AdminModel::Books => {
                let count = self.repository.books.count().await?;
                let meta = PageMeta::resolve(page, count, ADMIN_PAGE_SIZE)?;
                let books = self.repository.books.list_rows(meta.limit(), meta.offset()).await?;
                let rows = books.iter().map(to_value).collect::<AppResult<Vec<_>>>()?;
                (rows, meta)
            }
            AdminModel::BookInstances => {
                let status = query
                    .status
                    .as_deref()
                    .map(str::parse::<LoanStatus>)
                    .transpose()
                    .map_err(AppError::BadRequest)?;
                let filter = InstanceFilter::new(status, query.due_back, today);

                let count = self.repository.book_instances.count_filtered(filter).await?;
                let meta = PageMeta::resolve(page, count, ADMIN_PAGE_SIZE)?;
                let instances = self
                    .repository
                    .book_instances
                    .list_filtered(filter, meta.limit(), meta.offset())
                    .await?;
                (instances.iter().map(instance_row).collect(), meta)
            }
            AdminModel::Genres => {
                let count = self.repository.genres.count().await?;
                let meta = PageMeta::resolve(page, count, ADMIN_PAGE_SIZE)?;
                let genres = self.repository.genres.list(meta.limit(), meta.offset()).await?;
                let rows = genres.iter().map(to_value).collect::<AppResult<Vec<_>>>()?;
                (rows, meta)
            }
            AdminModel::Languages => {
                let count = self.repository.languages.count().await?;
                let meta = PageMeta::resolve(page, count, ADMIN_PAGE_SIZE)?;
                let languages = self.repository.languages.list(meta.limit(), meta.offset()).await?;
                let rows = languages.iter().map(to_value).collect::<AppResult<Vec<_>>>()?;
                (rows, meta)
            }
        };

        Ok(AdminListPage {
            model_admin,
            rows,
            page_obj,
        })
    }

    /// Change form for one object
    pub async fn get(&self, model: AdminModel, raw_id: &str) -> AppResult<AdminObject> {
        let mut inline_instances = Vec::new();

        let object = match model {
            AdminModel::Authors => to_value(&self.repository.authors.get_by_id(int_id(model, raw_id)?).await?)?,
            AdminModel::Books => {
                let book = self.repository.books.get_by_id(int_id(model, raw_id)?).await?;
                let genres = self.repository.books.genres(book.id).await?;
                inline_instances = self.repository.book_instances.list_for_book(book.id).await?;

                let mut object = to_value(&book)?;
                object["genre_ids"] = json!(genres.iter().map(|g| g.id).collect::<Vec<_>>());
                object
            }
            AdminModel::BookInstances => {
                to_value(&self.repository.book_instances.get_by_id(uuid_id(raw_id)?).await?)?
            }
            AdminModel::Genres => to_value(&self.repository.genres.get_by_id(int_id(model, raw_id)?).await?)?,
            AdminModel::Languages => to_value(&self.repository.languages.get_by_id(int_id(model, raw_id)?).await?)?,
        };

        Ok(AdminObject {
            model_admin: ModelAdmin::for_model(model),
            object,
            inline_instances,
        })
    }

    pub async fn create(&self, model: AdminModel, payload: Value) -> AppResult<Submission<Value>> {
        let saved = match model {
            AdminModel::Authors => {
                let form: AuthorForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.authors.create(&form).await?)?
            }
            AdminModel::Books => {
                let form: BookCreateForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.books.create(&form).await?)?
            }
            AdminModel::BookInstances => {
                let form: BookInstanceForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.book_instances.create(&form).await?)?
            }
            AdminModel::Genres => {
                let form: GenreForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.genres.create(&form).await?)?
            }
            AdminModel::Languages => {
                let form: LanguageForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.languages.create(&form).await?)?
            }
        };

        tracing::info!("Admin created {} {}", model.as_str(), saved["id"]);
        Ok(Submission::Saved(saved))
    }

    pub async fn update(
        &self,
        model: AdminModel,
        raw_id: &str,
        payload: Value,
    ) -> AppResult<Submission<Value>> {
        let saved = match model {
            AdminModel::Authors => {
                let form: AuthorForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.authors.update(int_id(model, raw_id)?, &form).await?)?
            }
            AdminModel::Books => return self.update_book(int_id(model, raw_id)?, parse_payload(payload)?).await,
            AdminModel::BookInstances => {
                let form: BookInstanceForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.book_instances.update(uuid_id(raw_id)?, &form).await?)?
            }
            AdminModel::Genres => {
                let form: GenreForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.genres.update(int_id(model, raw_id)?, &form).await?)?
            }
            AdminModel::Languages => {
                let form: LanguageForm = parse_payload(payload)?;
                if let Err(errors) = form.validate() {
                    return Ok(Submission::Invalid(errors));
                }
                to_value(&self.repository.languages.update(int_id(model, raw_id)?, &form).await?)?
            }
        };

        tracing::info!("Admin updated {} {}", model.as_str(), raw_id);
        Ok(Submission::Saved(saved))
    }

    /// Save a book and its inline copies.
    ///
    /// Every row is validated before anything is written. Existing rows must
    /// belong to the book being edited.
    async fn update_book(&self, book_id: i32, payload: AdminBookPayload) -> AppResult<Submission<Value>> {
        self.repository.books.get_by_id(book_id).await?;

        if let Err(errors) = payload.book.validate() {
            return Ok(Submission::Invalid(errors));
        }
        for row in payload.instances.iter().filter(|row| !row.delete) {
            if let Err(errors) = row.to_form(book_id).validate() {
                return Ok(Submission::Invalid(errors));
            }
        }
        for existing in payload.instances.iter().filter_map(|row| row.id) {
            let instance = self.repository.book_instances.get_by_id(existing).await?;
            if instance.book_id != book_id {
                return Err(AppError::BadRequest(format!(
                    "Copy {} does not belong to book {}",
                    existing, book_id
                )));
            }
        }

        let book = self.repository.books.update(book_id, &payload.book).await?;
        for row in &payload.instances {
            match (row.id, row.delete) {
                (Some(id), true) => self.repository.book_instances.delete(id).await?,
                (Some(id), false) => {
                    self.repository.book_instances.update(id, &row.to_form(book_id)).await?;
                }
                (None, false) => {
                    self.repository.book_instances.create(&row.to_form(book_id)).await?;
                }
                (None, true) => {}
            }
        }

        tracing::info!(
            "Admin updated book {} with {} inline rows",
            book_id,
            payload.instances.len()
        );

        let mut saved = to_value(&book)?;
        saved["genre_ids"] = json!(payload.book.genre_ids);
        Ok(Submission::Saved(saved))
    }

    pub async fn delete(&self, model: AdminModel, raw_id: &str) -> AppResult<()> {
        match model {
            AdminModel::Authors => self.repository.authors.delete(int_id(model, raw_id)?).await?,
            AdminModel::Books => self.repository.books.delete(int_id(model, raw_id)?).await?,
            AdminModel::BookInstances => self.repository.book_instances.delete(uuid_id(raw_id)?).await?,
            AdminModel::Genres => self.repository.genres.delete(int_id(model, raw_id)?).await?,
            AdminModel::Languages => self.repository.languages.delete(int_id(model, raw_id)?).await?,
        }
        tracing::info!("Admin deleted {} {}", model.as_str(), raw_id);
        Ok(())
    }
}
