//! Catalog management service: books and authors

use validator::Validate;

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDetail, AuthorForm, AuthorSummary},
        book::{display_genre, AuthorRef, Book, BookDetail, BookForm, BookSummary},
        form::{FormErrors, FormOutcome, FormResponse},
        pagination::{Page, Paginator},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, config: CatalogConfig) -> Self {
        Self { repository, config }
    }

    /// Paginated book list in default ordering
    pub async fn list_books(&self, page: Option<&str>) -> AppResult<Page<BookSummary>> {
        let total = self.repository.books.count().await?;
        let paginator = Paginator::new(total, self.config.book_page_size);
        let page = paginator.resolve(page)?;

        let rows = self
            .repository
            .books
            .list(paginator.per_page, paginator.offset(page))
            .await?;

        Ok(Page::new(rows, paginator, page).map(BookSummary::from))
    }

    pub async fn find_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Book with its author, language, genres and copies
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetail> {
        let book = self.repository.books.get_by_id(id).await?;
        let genres = self.repository.books.genres(id).await?;
        let instances = self.repository.book_instances.list_for_book(id).await?;

        let author = match book.author_id {
            Some(author_id) => {
                let author = self.repository.authors.get_by_id(author_id).await?;
                Some(AuthorRef {
                    id: author.id,
                    name: author.display_name(),
                    url: author.absolute_url(),
                })
            }
            None => None,
        };

        let language = match book.language_id {
            Some(language_id) => Some(self.repository.languages.get_by_id(language_id).await?),
            None => None,
        };

        let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
        let display_genre = display_genre(&names);

        Ok(BookDetail {
            book,
            author,
            language,
            genres,
            display_genre,
            instances,
        })
    }

    /// Current values of a book as an editable form
    pub async fn book_form(&self, id: i32) -> AppResult<BookForm> {
        let book = self.repository.books.get_by_id(id).await?;
        let genres = self.repository.books.genres(id).await?;
        Ok(BookForm::from_parts(&book, &genres))
    }

    pub async fn create_book(&self, form: BookForm) -> AppResult<FormOutcome<Book, FormResponse<BookForm>>> {
        let errors = self.check_book_form(&form).await?;
        if !errors.is_empty() {
            return Ok(FormOutcome::Invalid(FormResponse::invalid(form, errors)));
        }

        match self.repository.books.create(&form).await {
            Ok(book) => {
                tracing::info!(book_id = book.id, title = %book.title, "Book created");
                Ok(FormOutcome::Saved(book))
            }
            Err(AppError::Conflict(_)) => Ok(FormOutcome::Invalid(duplicate_isbn(form))),
            Err(e) => Err(e),
        }
    }

    pub async fn update_book(
        &self,
        id: i32,
        form: BookForm,
    ) -> AppResult<FormOutcome<Book, FormResponse<BookForm>>> {
        // 404 before validation so a missing book never reports field errors
        self.repository.books.get_by_id(id).await?;

        let errors = self.check_book_form(&form).await?;
        if !errors.is_empty() {
            return Ok(FormOutcome::Invalid(FormResponse::invalid(form, errors)));
        }

        match self.repository.books.update(id, &form).await {
            Ok(book) => {
                tracing::info!(book_id = book.id, "Book updated");
                Ok(FormOutcome::Saved(book))
            }
            Err(AppError::Conflict(_)) => Ok(FormOutcome::Invalid(duplicate_isbn(form))),
            Err(e) => Err(e),
        }
    }

    /// Refused with a conflict while copies of the book exist
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        match self.repository.books.delete(id).await {
            Ok(()) => {
                tracing::info!(book_id = id, "Book deleted");
                Ok(())
            }
            Err(AppError::Conflict(_)) => {
                tracing::warn!(book_id = id, "Refused to delete book with copies");
                Err(AppError::Conflict(
                    "This book still has copies in the catalog; delete them first".to_string(),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Field constraints plus existence of the referenced author, language and genres
    pub async fn check_book_form(&self, form: &BookForm) -> AppResult<FormErrors> {
        let mut errors = match form.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        if let Some(author_id) = form.author_id {
            if !self.repository.authors.exists(author_id).await? {
                errors.add("author_id", format!("Author {} does not exist", author_id));
            }
        }
        if let Some(language_id) = form.language_id {
            if !self.repository.languages.exists(language_id).await? {
                errors.add("language_id", format!("Language {} does not exist", language_id));
            }
        }
        if !form.genre.is_empty() {
            for missing in self.repository.genres.missing_ids(&form.genre).await? {
                errors.add("genre", format!("Genre {} does not exist", missing));
            }
        }

        Ok(errors)
    }

    /// Paginated author list ordered by last name, first name
    pub async fn list_authors(&self, page: Option<&str>) -> AppResult<Page<AuthorSummary>> {
        let total = self.repository.authors.count().await?;
        let paginator = Paginator::new(total, self.config.author_page_size);
        let page = paginator.resolve(page)?;

        let authors = self
            .repository
            .authors
            .list(paginator.per_page, paginator.offset(page))
            .await?;

        Ok(Page::new(authors, paginator, page).map(AuthorSummary::from))
    }

    pub async fn find_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetail> {
        let author = self.repository.authors.get_by_id(id).await?;
        let books = self.repository.books.list_by_author(id).await?;

        Ok(AuthorDetail {
            name: author.display_name(),
            author,
            books: books.into_iter().map(BookSummary::from).collect(),
        })
    }

    pub async fn author_form(&self, id: i32) -> AppResult<AuthorForm> {
        let author = self.repository.authors.get_by_id(id).await?;
        Ok(AuthorForm::from(&author))
    }

    pub fn check_author_form(&self, form: &AuthorForm) -> FormErrors {
        match form.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        }
    }

    pub async fn create_author(&self, form: AuthorForm) -> AppResult<FormOutcome<Author, FormResponse<AuthorForm>>> {
        if let Err(e) = form.validate() {
            return Ok(FormOutcome::Invalid(FormResponse::invalid(form, e.into())));
        }

        let author = self.repository.authors.create(&form).await?;
        tracing::info!(author_id = author.id, name = %author, "Author created");
        Ok(FormOutcome::Saved(author))
    }

    pub async fn update_author(
        &self,
        id: i32,
        form: AuthorForm,
    ) -> AppResult<FormOutcome<Author, FormResponse<AuthorForm>>> {
        self.repository.authors.get_by_id(id).await?;

        if let Err(e) = form.validate() {
            return Ok(FormOutcome::Invalid(FormResponse::invalid(form, e.into())));
        }

        let author = self.repository.authors.update(id, &form).await?;
        tracing::info!(author_id = author.id, "Author updated");
        Ok(FormOutcome::Saved(author))
    }

    /// Refused with a conflict while books reference the author
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        match self.repository.authors.delete(id).await {
            Ok(()) => {
                tracing::info!(author_id = id, "Author deleted");
                Ok(())
            }
            Err(AppError::Conflict(_)) => {
                tracing::warn!(author_id = id, "Refused to delete author with books");
                Err(AppError::Conflict(
                    "This author still has books in the catalog; reassign or delete them first"
                        .to_string(),
                ))
            }
            Err(e) => Err(e),
        }
    }
}

fn duplicate_isbn(form: BookForm) -> FormResponse<BookForm> {
    let mut errors = FormErrors::new();
    errors.add("isbn", "Book with this ISBN already exists.");
    FormResponse::invalid(form, errors)
}
