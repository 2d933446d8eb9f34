use clap::{Parser, Subcommand};
use serde_json::error::Category;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub mod book_metadata;
pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod models;
pub mod render;

use book_metadata::{CatalogClient, GoogleBooksClient};
use config::{Config, ConfigArgs};
use db::LocalStore;
use error::LibraryError;
use library::BookList;
use models::{BookRecord, OperationStats, Totals};
use render::BookRow;

pub const EXPORT_FILE_NAME: &str = "books2025.json";

/// Everything a command needs: the list (with its store) and the catalog.
pub struct AppState {
  list: BookList,
  catalog: Box<dyn CatalogClient>,
}

impl AppState {
  pub fn new(list: BookList, catalog: Box<dyn CatalogClient>) -> Self {
    AppState { list, catalog }
  }

  pub fn open(config: &Config) -> Result<Self, String> {
    let store = LocalStore::open(&config.db_path(), &config.store_key).map_err(|err| err.to_string())?;
    let list = BookList::open(store).map_err(|err| err.to_string())?;
    let catalog = GoogleBooksClient::new(&config.catalog_url, config.http_timeout)
      .map_err(|err| err.to_string())?;
    Ok(AppState::new(list, Box::new(catalog)))
  }

  pub fn books(&self) -> &[BookRecord] {
    self.list.books()
  }
}

fn add_book(state: &mut AppState, title: String, author: String) -> Result<BookRecord, String> {
  state
    .list
    .add(state.catalog.as_ref(), &title, &author)
    .map_err(|err| match err {
      LibraryError::MissingField(_) => "Please enter both a title and an author.".to_string(),
      other => format!("Error adding book: {}", other),
    })
}

fn delete_book(state: &mut AppState, index: usize) -> Result<BookRecord, String> {
  state.list.delete(index).map_err(|err| err.to_string())
}

fn update_all_books(state: &mut AppState) -> Result<OperationStats, String> {
  state
    .list
    .update_all(state.catalog.as_ref())
    .map_err(|err| format!("Error updating books: {}", err))
}

fn import_books(state: &mut AppState, path: &Path) -> Result<usize, String> {
  let payload = std::fs::read_to_string(path)
    .map_err(|_| "Error reading file. Please make sure it's a valid JSON file.".to_string())?;
  state.list.import(&payload).map_err(|err| match err {
    LibraryError::InvalidImport(source) if matches!(source.classify(), Category::Syntax | Category::Eof | Category::Io) => {
      "Error reading file. Please make sure it's a valid JSON file.".to_string()
    }
    LibraryError::NotASequence | LibraryError::InvalidImport(_) => {
      "Invalid file format. Please import a valid JSON file.".to_string()
    }
    other => other.to_string(),
  })
}

/// Writes the export file. A directory target gets the default file name.
fn export_books(state: &AppState, target: &Path) -> Result<PathBuf, String> {
  let path = if target.is_dir() {
    target.join(EXPORT_FILE_NAME)
  } else {
    target.to_path_buf()
  };
  let payload = state.list.export().map_err(|err| err.to_string())?;
  std::fs::write(&path, payload).map_err(|err| format!("Failed to write {}: {}", path.display(), err))?;
  log::info!("exported {} books to {}", state.list.len(), path.display());
  Ok(path)
}

fn list_books(state: &AppState) -> Vec<BookRow> {
  render::book_rows(state.books())
}

fn render_books_html(state: &AppState, output: &Path) -> Result<(), String> {
  std::fs::write(output, render::render_html(state.books()))
    .map_err(|err| format!("Failed to write {}: {}", output.display(), err))
}

fn get_totals(state: &AppState) -> Totals {
  state.list.totals()
}

#[derive(Parser, Debug)]
#[command(name = "shelfmark")]
#[command(about = "Track the books you read, enriched from Google Books")]
#[command(version)]
struct Cli {
  #[command(flatten)]
  config: ConfigArgs,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Add a book (the title may be an ISBN)
  Add {
    title: String,
    author: String,
  },
  /// Delete the book at a position shown by `list`
  Delete {
    index: usize,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
  },
  /// Refresh metadata for every book
  UpdateAll,
  /// Replace the list with the contents of a JSON file
  Import {
    file: PathBuf,
  },
  /// Write the list as JSON
  Export {
    #[arg(long, short, default_value = EXPORT_FILE_NAME)]
    output: PathBuf,
  },
  /// Show the list
  List {
    /// Print the rows as JSON instead of a table
    #[arg(long)]
    json: bool,
  },
  /// Write the list as HTML
  Render {
    #[arg(long, short)]
    output: PathBuf,
  },
  /// Show totals for books and pages read
  Totals,
}

pub fn run() -> ExitCode {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shelfmark=info,shelfmark_lib=info".into()),
    )
    .with_writer(std::io::stderr)
    .try_init();

  let cli = Cli::parse();
  let config = Config::from_args(&cli.config);
  log::info!("using database {}", config.db_path().display());

  match dispatch(&config, cli.command) {
    Ok(()) => ExitCode::SUCCESS,
    Err(message) => {
      eprintln!("{}", message);
      ExitCode::FAILURE
    }
  }
}

fn dispatch(config: &Config, command: Commands) -> Result<(), String> {
  let mut state = AppState::open(config)?;

  match command {
    Commands::Add { title, author } => {
      let record = add_book(&mut state, title, author)?;
      println!(
        "Added \"{}\" by {} (ISBN: {}, pages: {})",
        record.shown_title(),
        record.author,
        record.isbn.as_deref().unwrap_or("-"),
        record.page_count
      );
    }
    Commands::Delete { index, yes } => {
      let title = state
        .books()
        .get(index)
        .map(|book| book.title.clone())
        .ok_or_else(|| format!("No book at position {}", index))?;
      if !yes && !confirm(&format!("Are you sure you want to delete \"{}\"?", title))? {
        println!("Cancelled.");
        return Ok(());
      }
      let removed = delete_book(&mut state, index)?;
      println!("Deleted \"{}\".", removed.title);
    }
    Commands::UpdateAll => {
      let stats = update_all_books(&mut state)?;
      println!(
        "Books updated successfully! ({} updated, {} not found, {} failed)",
        stats.processed, stats.skipped, stats.errors
      );
    }
    Commands::Import { file } => {
      let count = import_books(&mut state, &file)?;
      println!("Books imported successfully! ({} books)", count);
    }
    Commands::Export { output } => {
      let path = export_books(&state, &output)?;
      println!("Exported to {}", path.display());
    }
    Commands::List { json } => {
      if json {
        let rows = serde_json::to_string_pretty(&list_books(&state)).map_err(|err| err.to_string())?;
        println!("{}", rows);
      } else {
        println!("{}", render::render_table(state.books()));
      }
    }
    Commands::Render { output } => {
      render_books_html(&state, &output)?;
      println!("Wrote {}", output.display());
    }
    Commands::Totals => {
      let totals = get_totals(&state);
      println!("Total books read: {}", totals.books);
      println!("Total pages read: {}", totals.pages);
    }
  }
  Ok(())
}

fn confirm(prompt: &str) -> Result<bool, String> {
  print!("{} [y/N] ", prompt);
  std::io::stdout().flush().map_err(|err| err.to_string())?;
  let mut answer = String::new();
  std::io::stdin()
    .lock()
    .read_line(&mut answer)
    .map_err(|err| err.to_string())?;
  Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
