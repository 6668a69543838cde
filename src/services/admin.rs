//! Staff administration console
//!
//! Each catalog entity is registered with a [`ModelAdmin`] describing how it is
//! presented: list columns, list filters, edit page fieldsets and the related
//! records shown inline. Records are projected into ordered column maps so the
//! same tables drive the list and detail responses.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorForm},
        book::{BookForm, BookListRow},
        book_instance::{BookInstanceForm, InstanceFilter, InstanceListing, LoanStatus},
        form::{FormErrors, FormOutcome, FormResponse},
        genre::{Genre, GenreForm},
        language::{Language, LanguageForm},
    },
    repository::Repository,
    services::catalog::CatalogService,
};

/// Field name to display value, in presentation order
pub type Record = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminEntity {
    Author,
    Book,
    BookInstance,
    Genre,
    Language,
}

impl AdminEntity {
    pub const ALL: [AdminEntity; 5] = [
        AdminEntity::Author,
        AdminEntity::Book,
        AdminEntity::BookInstance,
        AdminEntity::Genre,
        AdminEntity::Language,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            AdminEntity::Author => "author",
            AdminEntity::Book => "book",
            AdminEntity::BookInstance => "bookinstance",
            AdminEntity::Genre => "genre",
            AdminEntity::Language => "language",
        }
    }

    pub fn verbose_name_plural(&self) -> &'static str {
        match self {
            AdminEntity::Author => "Authors",
            AdminEntity::Book => "Books",
            AdminEntity::BookInstance => "Book instances",
            AdminEntity::Genre => "Genres",
            AdminEntity::Language => "Languages",
        }
    }

    pub fn from_slug(slug: &str) -> AppResult<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.slug() == slug)
            .ok_or_else(|| AppError::NotFound(format!("No admin registered for '{}'", slug)))
    }

    pub fn model_admin(&self) -> &'static ModelAdmin {
        match self {
            AdminEntity::Author => &AUTHOR_ADMIN,
            AdminEntity::Book => &BOOK_ADMIN,
            AdminEntity::BookInstance => &BOOK_INSTANCE_ADMIN,
            AdminEntity::Genre => &GENRE_ADMIN,
            AdminEntity::Language => &LANGUAGE_ADMIN,
        }
    }

    pub fn list_url(&self) -> String {
        format!("/admin/{}/", self.slug())
    }

    pub fn change_url(&self, id: &str) -> String {
        format!("/admin/{}/{}/", self.slug(), id)
    }
}

/// Column shown for models without an explicit column list
pub const DISPLAY_COLUMN: &str = "__str__";

/// Named group of edit page rows; a row with several fields is laid out side by side
#[derive(Debug, Serialize)]
pub struct Fieldset {
    pub name: Option<&'static str>,
    pub rows: &'static [&'static [&'static str]],
}

#[derive(Debug, Serialize)]
pub struct Inline {
    pub entity: AdminEntity,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct ModelAdmin {
    pub list_display: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub fieldsets: &'static [Fieldset],
    pub inline: Option<Inline>,
}

static AUTHOR_ADMIN: ModelAdmin = ModelAdmin {
    list_display: &["last_name", "first_name", "date_of_birth", "date_of_death"],
    list_filter: &[],
    fieldsets: &[Fieldset {
        name: None,
        rows: &[
            &["first_name"],
            &["last_name"],
            &["date_of_birth", "date_of_death"],
        ],
    }],
    inline: Some(Inline {
        entity: AdminEntity::Book,
        fields: &["title", "isbn", "display_genre", "id"],
    }),
};

static BOOK_ADMIN: ModelAdmin = ModelAdmin {
    list_display: &["title", "author", "display_genre"],
    list_filter: &[],
    fieldsets: &[Fieldset {
        name: None,
        rows: &[
            &["title"],
            &["author"],
            &["summary"],
            &["isbn"],
            &["genre"],
            &["language"],
        ],
    }],
    inline: Some(Inline {
        entity: AdminEntity::BookInstance,
        fields: &["imprint", "due_back", "status", "borrower", "id"],
    }),
};

static BOOK_INSTANCE_ADMIN: ModelAdmin = ModelAdmin {
    list_display: &["book", "status", "due_back", "id", "borrower"],
    list_filter: &["status", "due_back"],
    fieldsets: &[
        Fieldset {
            name: None,
            rows: &[&["book"], &["imprint"], &["id"]],
        },
        Fieldset {
            name: Some("Availability"),
            rows: &[&["status"], &["due_back"], &["borrower"]],
        },
    ],
    inline: None,
};

static GENRE_ADMIN: ModelAdmin = ModelAdmin {
    list_display: &[DISPLAY_COLUMN],
    list_filter: &[],
    fieldsets: &[Fieldset {
        name: None,
        rows: &[&["name"]],
    }],
    inline: None,
};

static LANGUAGE_ADMIN: ModelAdmin = ModelAdmin {
    list_display: &[DISPLAY_COLUMN],
    list_filter: &[],
    fieldsets: &[Fieldset {
        name: None,
        rows: &[&["name"]],
    }],
    inline: None,
};

/// Pick `fields` out of a full record; unknown fields come out as null
pub fn project(record: &Record, fields: &[&str]) -> Record {
    fields
        .iter()
        .map(|f| {
            let value = record.get(*f).cloned().unwrap_or(Value::Null);
            (f.to_string(), value)
        })
        .collect()
}

fn author_record(author: &Author) -> Record {
    let mut r = Record::new();
    r.insert("id".into(), json!(author.id));
    r.insert(DISPLAY_COLUMN.into(), json!(author.display_name()));
    r.insert("first_name".into(), json!(author.first_name));
    r.insert("last_name".into(), json!(author.last_name));
    r.insert("date_of_birth".into(), json!(author.date_of_birth));
    r.insert("date_of_death".into(), json!(author.date_of_death));
    r
}

fn book_record(book: &BookListRow) -> Record {
    let mut r = Record::new();
    r.insert("id".into(), json!(book.id));
    r.insert(DISPLAY_COLUMN.into(), json!(book.title));
    r.insert("title".into(), json!(book.title));
    r.insert("author".into(), json!(book.author_name()));
    r.insert("summary".into(), json!(book.summary));
    r.insert("isbn".into(), json!(book.isbn));
    r.insert("genre".into(), json!(book.genres));
    r.insert("language".into(), json!(book.language_name));
    r.insert("display_genre".into(), json!(book.display_genre()));
    r
}

fn instance_record(instance: &InstanceListing) -> Record {
    let mut r = Record::new();
    r.insert("id".into(), json!(instance.id));
    r.insert(DISPLAY_COLUMN.into(), json!(instance.display()));
    r.insert("book".into(), json!(instance.book_title));
    r.insert("imprint".into(), json!(instance.imprint));
    r.insert("status".into(), json!(instance.status.label()));
    r.insert("due_back".into(), json!(instance.due_back));
    r.insert("borrower".into(), json!(instance.borrower_username));
    r
}

fn name_record(id: i32, name: &str) -> Record {
    let mut r = Record::new();
    r.insert("id".into(), json!(id));
    r.insert(DISPLAY_COLUMN.into(), json!(name));
    r.insert("name".into(), json!(name));
    r
}

fn genre_record(genre: &Genre) -> Record {
    name_record(genre.id, &genre.name)
}

fn language_record(language: &Language) -> Record {
    name_record(language.id, &language.name)
}

#[derive(Debug, Serialize)]
pub struct AdminModelEntry {
    pub entity: AdminEntity,
    pub name: &'static str,
    pub url: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminIndex {
    pub models: Vec<AdminModelEntry>,
}

#[derive(Debug, Serialize)]
pub struct AdminRow {
    pub id: String,
    pub url: String,
    pub columns: Record,
}

#[derive(Debug, Serialize)]
pub struct AdminList {
    pub entity: AdminEntity,
    pub name: &'static str,
    pub list_display: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub rows: Vec<AdminRow>,
}

#[derive(Debug, Serialize)]
pub struct FieldsetView {
    pub name: Option<&'static str>,
    pub rows: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct InlineView {
    pub entity: AdminEntity,
    pub rows: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct AdminDetail {
    pub entity: AdminEntity,
    pub id: String,
    pub display: Value,
    pub fieldsets: Vec<FieldsetView>,
    pub inline: Option<InlineView>,
}

/// Related record submitted with its parent's change form.
/// No `id` adds a row; `delete` removes the row named by `id`; an `id` with
/// neither `form` nor `delete` leaves the row as it is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "K: Deserialize<'de>, F: Deserialize<'de>"))]
pub struct InlineRow<K, F> {
    #[serde(default)]
    pub id: Option<K>,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub form: Option<F>,
}

/// Author fields plus the author's books edited inline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorAdminForm {
    #[serde(flatten)]
    pub author: AuthorForm,
    #[serde(default)]
    pub books: Vec<InlineRow<i32, BookForm>>,
}

/// Book fields plus the book's copies edited inline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAdminForm {
    #[serde(flatten)]
    pub book: BookForm,
    #[serde(default)]
    pub instances: Vec<InlineRow<Uuid, BookInstanceForm>>,
}

pub const BOOKS_INLINE: &str = "books";
pub const INSTANCES_INLINE: &str = "instances";

/// Submitted admin form
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AdminForm {
    Author(AuthorAdminForm),
    Book(BookAdminForm),
    Genre(GenreForm),
    Language(LanguageForm),
    BookInstance(BookInstanceForm),
}

impl AdminForm {
    pub fn entity(&self) -> AdminEntity {
        match self {
            AdminForm::Author(_) => AdminEntity::Author,
            AdminForm::Book(_) => AdminEntity::Book,
            AdminForm::Genre(_) => AdminEntity::Genre,
            AdminForm::Language(_) => AdminEntity::Language,
            AdminForm::BookInstance(_) => AdminEntity::BookInstance,
        }
    }
}

pub type SaveOutcome = FormOutcome<String, FormResponse<AdminForm>>;

fn parse_int_id(entity: AdminEntity, id: &str) -> AppResult<i32> {
    id.parse()
        .map_err(|_| AppError::NotFound(format!("No {} with id {}", entity.slug(), id)))
}

fn parse_uuid_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id)
        .map_err(|_| AppError::NotFound(format!("No bookinstance with id {}", id)))
}

fn inline_prefix(name: &str, index: usize) -> String {
    format!("{}-{}", name, index)
}

#[derive(Clone)]
pub struct AdminService {
    repository: Repository,
    catalog: CatalogService,
}

impl AdminService {
    pub fn new(repository: Repository, catalog: CatalogService) -> Self {
        Self {
            repository,
            catalog,
        }
    }

    /// Registered models with their row counts
    pub async fn index(&self) -> AppResult<AdminIndex> {
        let mut models = Vec::with_capacity(AdminEntity::ALL.len());
        for entity in AdminEntity::ALL {
            let count = match entity {
                AdminEntity::Author => self.repository.authors.count().await?,
                AdminEntity::Book => self.repository.books.count().await?,
                AdminEntity::BookInstance => self.repository.book_instances.count().await?,
                AdminEntity::Genre => self.repository.genres.count().await?,
                AdminEntity::Language => self.repository.languages.count().await?,
            };
            models.push(AdminModelEntry {
                entity,
                name: entity.verbose_name_plural(),
                url: entity.list_url(),
                count,
            });
        }
        Ok(AdminIndex { models })
    }

    pub async fn list(&self, entity: AdminEntity, filter: &InstanceFilter) -> AppResult<AdminList> {
        let records: Vec<Record> = match entity {
            AdminEntity::Author => self
                .repository
                .authors
                .list_all()
                .await?
                .iter()
                .map(author_record)
                .collect(),
            AdminEntity::Book => self
                .repository
                .books
                .list_all()
                .await?
                .iter()
                .map(book_record)
                .collect(),
            AdminEntity::BookInstance => {
                let status = filter
                    .status
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(str::parse::<LoanStatus>)
                    .transpose()
                    .map_err(AppError::BadRequest)?;
                self.repository
                    .book_instances
                    .list_filtered(status, filter.due_back)
                    .await?
                    .iter()
                    .map(instance_record)
                    .collect()
            }
            AdminEntity::Genre => self
                .repository
                .genres
                .list()
                .await?
                .iter()
                .map(genre_record)
                .collect(),
            AdminEntity::Language => self
                .repository
                .languages
                .list()
                .await?
                .iter()
                .map(language_record)
                .collect(),
        };

        let admin = entity.model_admin();
        let rows = records
            .iter()
            .map(|record| {
                let id = record_id(record);
                AdminRow {
                    url: entity.change_url(&id),
                    columns: project(record, admin.list_display),
                    id,
                }
            })
            .collect();

        Ok(AdminList {
            entity,
            name: entity.verbose_name_plural(),
            list_display: admin.list_display,
            list_filter: admin.list_filter,
            rows,
        })
    }

    /// Record laid out per fieldset, with its inline related records
    pub async fn detail(&self, entity: AdminEntity, id: &str) -> AppResult<AdminDetail> {
        let (record, inline_records) = match entity {
            AdminEntity::Author => {
                let id = parse_int_id(entity, id)?;
                let author = self.repository.authors.get_by_id(id).await?;
                let books = self.repository.books.list_by_author(id).await?;
                (author_record(&author), books.iter().map(book_record).collect())
            }
            AdminEntity::Book => {
                let id = parse_int_id(entity, id)?;
                let book = self.repository.books.get_row(id).await?;
                let copies = self.repository.book_instances.list_for_book(id).await?;
                (book_record(&book), copies.iter().map(instance_record).collect())
            }
            AdminEntity::BookInstance => {
                let id = parse_uuid_id(id)?;
                let instance = self.repository.book_instances.get_listing(id).await?;
                (instance_record(&instance), Vec::new())
            }
            AdminEntity::Genre => {
                let genre = self.repository.genres.get_by_id(parse_int_id(entity, id)?).await?;
                (genre_record(&genre), Vec::new())
            }
            AdminEntity::Language => {
                let language = self
                    .repository
                    .languages
                    .get_by_id(parse_int_id(entity, id)?)
                    .await?;
                (language_record(&language), Vec::new())
            }
        };

        Ok(lay_out(entity, &record, &inline_records))
    }

    /// Create (`id` None) or update a record of `entity`.
    /// Saved carries the change page URL of the stored record.
    pub async fn save(
        &self,
        entity: AdminEntity,
        id: Option<&str>,
        form: AdminForm,
    ) -> AppResult<SaveOutcome> {
        if form.entity() != entity {
            return Err(AppError::BadRequest(format!(
                "Form does not match {}",
                entity.slug()
            )));
        }

        match form {
            AdminForm::Author(author) => self.save_author(id, author).await,
            AdminForm::Book(book) => self.save_book(id, book).await,
            AdminForm::Genre(genre) => self.save_genre(id, genre).await,
            AdminForm::Language(language) => self.save_language(id, language).await,
            AdminForm::BookInstance(instance) => self.save_instance(id, instance).await,
        }
    }

    /// Author through the catalog form, then its inline books.
    /// Nothing is written unless the author and every row are valid.
    async fn save_author(&self, id: Option<&str>, form: AuthorAdminForm) -> AppResult<SaveOutcome> {
        let entity = AdminEntity::Author;
        let id = id.map(|id| parse_int_id(entity, id)).transpose()?;
        if let Some(id) = id {
            self.repository.authors.get_by_id(id).await?;
        }

        let mut errors = self.catalog.check_author_form(&form.author);
        for (index, row) in form.books.iter().enumerate() {
            let row_errors = self.check_book_row(id, row).await?;
            errors.merge_prefixed(&inline_prefix(BOOKS_INLINE, index), row_errors);
        }
        if !errors.is_empty() {
            return Ok(invalid(AdminForm::Author(form), errors));
        }

        let saved = match id {
            Some(id) => self.catalog.update_author(id, form.author.clone()).await?,
            None => self.catalog.create_author(form.author.clone()).await?,
        };
        let author = match saved {
            FormOutcome::Saved(author) => author,
            FormOutcome::Invalid(response) => {
                return Ok(invalid(AdminForm::Author(form), response.errors));
            }
        };

        for (index, row) in form.books.iter().enumerate() {
            if let Some(row_errors) = self.apply_book_row(author.id, row).await? {
                let mut errors = FormErrors::new();
                errors.merge_prefixed(&inline_prefix(BOOKS_INLINE, index), row_errors);
                return Ok(invalid(AdminForm::Author(form), errors));
            }
        }

        tracing::info!(author_id = author.id, inline_rows = form.books.len(), "Author saved from admin");
        Ok(FormOutcome::Saved(entity.change_url(&author.id.to_string())))
    }

    async fn check_book_row(
        &self,
        author_id: Option<i32>,
        row: &InlineRow<i32, BookForm>,
    ) -> AppResult<FormErrors> {
        let mut errors = FormErrors::new();

        if let Some(book_id) = row.id {
            if !self.book_belongs_to(book_id, author_id).await? {
                errors.add("id", format!("Book {} is not listed under this author", book_id));
                return Ok(errors);
            }
        }

        if row.delete {
            match row.id {
                None => errors.add("id", "Only existing books can be deleted"),
                Some(book_id) => {
                    if !self.repository.book_instances.list_for_book(book_id).await?.is_empty() {
                        errors.add("delete", "This book still has copies in the catalog");
                    }
                }
            }
        } else if let Some(book) = &row.form {
            let mut book = book.clone();
            book.author_id = author_id;
            errors = self.catalog.check_book_form(&book).await?;
        } else if row.id.is_none() {
            errors.add("form", "New books need their fields");
        }

        Ok(errors)
    }

    async fn book_belongs_to(&self, book_id: i32, author_id: Option<i32>) -> AppResult<bool> {
        let Some(author_id) = author_id else {
            return Ok(false);
        };
        match self.repository.books.get_by_id(book_id).await {
            Ok(book) => Ok(book.author_id == Some(author_id)),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write one checked book row; errors only from a write the checks could not foresee
    async fn apply_book_row(
        &self,
        author_id: i32,
        row: &InlineRow<i32, BookForm>,
    ) -> AppResult<Option<FormErrors>> {
        if row.delete {
            if let Some(book_id) = row.id {
                self.catalog.delete_book(book_id).await?;
            }
            return Ok(None);
        }

        let Some(book) = &row.form else {
            return Ok(None);
        };
        let mut book = book.clone();
        book.author_id = Some(author_id);

        let outcome = match row.id {
            Some(book_id) => self.catalog.update_book(book_id, book).await?,
            None => self.catalog.create_book(book).await?,
        };
        Ok(match outcome {
            FormOutcome::Saved(_) => None,
            FormOutcome::Invalid(response) => Some(response.errors),
        })
    }

    /// Book through the catalog form, then its inline copies.
    /// Nothing is written unless the book and every row are valid.
    async fn save_book(&self, id: Option<&str>, form: BookAdminForm) -> AppResult<SaveOutcome> {
        let entity = AdminEntity::Book;
        let id = id.map(|id| parse_int_id(entity, id)).transpose()?;
        if let Some(id) = id {
            self.repository.books.get_by_id(id).await?;
        }

        let mut errors = self.catalog.check_book_form(&form.book).await?;
        for (index, row) in form.instances.iter().enumerate() {
            let row_errors = self.check_instance_row(id, row).await?;
            errors.merge_prefixed(&inline_prefix(INSTANCES_INLINE, index), row_errors);
        }
        if !errors.is_empty() {
            return Ok(invalid(AdminForm::Book(form), errors));
        }

        let saved = match id {
            Some(id) => self.catalog.update_book(id, form.book.clone()).await?,
            None => self.catalog.create_book(form.book.clone()).await?,
        };
        let book = match saved {
            FormOutcome::Saved(book) => book,
            FormOutcome::Invalid(response) => {
                return Ok(invalid(AdminForm::Book(form), response.errors));
            }
        };

        for row in &form.instances {
            self.apply_instance_row(book.id, row).await?;
        }

        tracing::info!(book_id = book.id, inline_rows = form.instances.len(), "Book saved from admin");
        Ok(FormOutcome::Saved(entity.change_url(&book.id.to_string())))
    }

    async fn check_instance_row(
        &self,
        book_id: Option<i32>,
        row: &InlineRow<Uuid, BookInstanceForm>,
    ) -> AppResult<FormErrors> {
        let mut errors = FormErrors::new();

        if let Some(instance_id) = row.id {
            if !self.instance_belongs_to(instance_id, book_id).await? {
                errors.add("id", format!("Copy {} is not listed under this book", instance_id));
                return Ok(errors);
            }
        }

        if row.delete {
            if row.id.is_none() {
                errors.add("id", "Only existing copies can be deleted");
            }
        } else if let Some(instance) = &row.form {
            errors = self.check_instance_form(instance).await?;
        } else if row.id.is_none() {
            errors.add("form", "New copies need their fields");
        }

        Ok(errors)
    }

    async fn instance_belongs_to(&self, instance_id: Uuid, book_id: Option<i32>) -> AppResult<bool> {
        let Some(book_id) = book_id else {
            return Ok(false);
        };
        match self.repository.book_instances.get_by_id(instance_id).await {
            Ok(instance) => Ok(instance.book_id == book_id),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn apply_instance_row(
        &self,
        book_id: i32,
        row: &InlineRow<Uuid, BookInstanceForm>,
    ) -> AppResult<()> {
        if row.delete {
            if let Some(instance_id) = row.id {
                self.repository.book_instances.delete(instance_id).await?;
                tracing::info!(instance_id = %instance_id, book_id, "Book instance deleted inline");
            }
            return Ok(());
        }

        let Some(instance) = &row.form else {
            return Ok(());
        };
        let mut instance = instance.clone();
        instance.book_id = book_id;

        let saved = match row.id {
            Some(instance_id) => self.repository.book_instances.update(instance_id, &instance).await?,
            None => self.repository.book_instances.create(&instance).await?,
        };
        tracing::info!(instance_id = %saved.id, book_id, status = %saved.status, "Book instance saved inline");
        Ok(())
    }

    /// Field constraints plus existence of the borrower
    async fn check_instance_form(&self, form: &BookInstanceForm) -> AppResult<FormErrors> {
        let mut errors = match form.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };
        if let Some(borrower_id) = form.borrower_id {
            if !self.repository.users.exists(borrower_id).await? {
                errors.add("borrower_id", format!("User {} does not exist", borrower_id));
            }
        }
        Ok(errors)
    }

    async fn save_genre(
        &self,
        id: Option<&str>,
        form: GenreForm,
    ) -> AppResult<SaveOutcome> {
        let entity = AdminEntity::Genre;
        let id = id.map(|id| parse_int_id(entity, id)).transpose()?;
        if let Some(id) = id {
            self.repository.genres.get_by_id(id).await?;
        }
        if let Err(e) = form.validate() {
            return Ok(invalid(AdminForm::Genre(form), e.into()));
        }

        let saved = match id {
            Some(id) => self.repository.genres.update(id, &form).await,
            None => self.repository.genres.create(&form).await,
        };
        match saved {
            Ok(genre) => {
                tracing::info!(genre_id = genre.id, name = %genre.name, "Genre saved");
                Ok(FormOutcome::Saved(entity.change_url(&genre.id.to_string())))
            }
            Err(AppError::Conflict(_)) => Ok(invalid(
                AdminForm::Genre(form),
                duplicate_name("Genre"),
            )),
            Err(e) => Err(e),
        }
    }

    async fn save_language(
        &self,
        id: Option<&str>,
        form: LanguageForm,
    ) -> AppResult<SaveOutcome> {
        let entity = AdminEntity::Language;
        let id = id.map(|id| parse_int_id(entity, id)).transpose()?;
        if let Some(id) = id {
            self.repository.languages.get_by_id(id).await?;
        }
        if let Err(e) = form.validate() {
            return Ok(invalid(AdminForm::Language(form), e.into()));
        }

        let language = match id {
            Some(id) => self.repository.languages.update(id, &form).await?,
            None => self.repository.languages.create(&form).await?,
        };
        tracing::info!(language_id = language.id, name = %language.name, "Language saved");
        Ok(FormOutcome::Saved(entity.change_url(&language.id.to_string())))
    }

    async fn save_instance(
        &self,
        id: Option<&str>,
        form: BookInstanceForm,
    ) -> AppResult<SaveOutcome> {
        let id = id.map(parse_uuid_id).transpose()?;
        if let Some(id) = id {
            self.repository.book_instances.get_by_id(id).await?;
        }

        let mut errors = self.check_instance_form(&form).await?;
        if !self.repository.books.exists(form.book_id).await? {
            errors.add("book_id", format!("Book {} does not exist", form.book_id));
        }
        if !errors.is_empty() {
            return Ok(invalid(AdminForm::BookInstance(form), errors));
        }

        let instance = match id {
            Some(id) => self.repository.book_instances.update(id, &form).await?,
            None => self.repository.book_instances.create(&form).await?,
        };
        tracing::info!(
            instance_id = %instance.id,
            book_id = instance.book_id,
            status = %instance.status,
            "Book instance saved"
        );
        Ok(FormOutcome::Saved(
            AdminEntity::BookInstance.change_url(&instance.id.to_string()),
        ))
    }

    pub async fn delete(&self, entity: AdminEntity, id: &str) -> AppResult<()> {
        match entity {
            AdminEntity::Genre => {
                self.repository.genres.delete(parse_int_id(entity, id)?).await?
            }
            AdminEntity::Language => {
                self.repository
                    .languages
                    .delete(parse_int_id(entity, id)?)
                    .await?
            }
            AdminEntity::BookInstance => {
                self.repository.book_instances.delete(parse_uuid_id(id)?).await?
            }
            AdminEntity::Author => self.catalog.delete_author(parse_int_id(entity, id)?).await?,
            AdminEntity::Book => self.catalog.delete_book(parse_int_id(entity, id)?).await?,
        }
        tracing::info!(entity = entity.slug(), id = %id, "Admin record deleted");
        Ok(())
    }
}

fn record_id(record: &Record) -> String {
    match record.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn lay_out(entity: AdminEntity, record: &Record, inline_records: &[Record]) -> AdminDetail {
    let admin = entity.model_admin();
    let fieldsets = admin
        .fieldsets
        .iter()
        .map(|set| FieldsetView {
            name: set.name,
            rows: set.rows.iter().map(|row| project(record, row)).collect(),
        })
        .collect();

    let inline = admin.inline.as_ref().map(|inline| InlineView {
        entity: inline.entity,
        rows: inline_records
            .iter()
            .map(|r| project(r, inline.fields))
            .collect(),
    });

    AdminDetail {
        entity,
        id: record_id(record),
        display: record.get(DISPLAY_COLUMN).cloned().unwrap_or(Value::Null),
        fieldsets,
        inline,
    }
}

fn invalid(form: AdminForm, errors: FormErrors) -> SaveOutcome {
    FormOutcome::Invalid(FormResponse::invalid(form, errors))
}

fn duplicate_name(model: &str) -> FormErrors {
    let mut errors = FormErrors::new();
    errors.add("name", format!("{} with this name already exists.", model));
    errors
}
