use serde::Serialize;

use crate::models::{BookRecord, Totals};

pub const CATALOG_LINK_BASE: &str = "https://books.google.com/books?id=";
const PLACEHOLDER: &str = "-";

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookRow {
    pub index: usize,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub catalog_link: Option<String>,
    pub pages: String,
    pub detail: BookDetail,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    pub display_title: String,
    pub thumbnail_url: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub categories: Option<String>,
    pub description: Option<String>,
}

pub fn book_rows(books: &[BookRecord]) -> Vec<BookRow> {
    books
        .iter()
        .enumerate()
        .map(|(index, book)| {
            let (isbn, catalog_link) = match book.isbn.as_deref() {
                Some(isbn) => (
                    isbn.to_string(),
                    book.catalog_id.as_deref().map(|id| format!("{}{}", CATALOG_LINK_BASE, id)),
                ),
                None => (PLACEHOLDER.to_string(), None),
            };
            let pages = if book.page_count > 0 {
                book.page_count.to_string()
            } else {
                PLACEHOLDER.to_string()
            };
            let categories = if book.categories.is_empty() {
                None
            } else {
                Some(book.categories.join(", "))
            };

            BookRow {
                index,
                title: book.title.clone(),
                author: book.author.clone(),
                isbn,
                catalog_link,
                pages,
                detail: BookDetail {
                    display_title: book.shown_title().to_string(),
                    thumbnail_url: book.thumbnail_url.clone(),
                    publisher: book.publisher.clone(),
                    published_date: book.published_date.clone(),
                    categories,
                    description: book.description.clone(),
                },
            }
        })
        .collect()
}

/// Standalone list markup. Each row carries a collapsible detail panel and a
/// delete action addressed by position.
pub fn render_html(books: &[BookRecord]) -> String {
    let mut out = String::new();
    out.push_str("<ul class=\"list-group\" id=\"bookList\">\n");
    out.push_str(
        "  <li class=\"list-group-item header\"><div class=\"row\">\
         <div class=\"col-1\"></div>\
         <div class=\"col-3\"><strong>TITLE</strong></div>\
         <div class=\"col-3\"><strong>AUTHOR</strong></div>\
         <div class=\"col-2\"><strong>ISBN</strong></div>\
         <div class=\"col-2\"><strong>PAGES</strong></div>\
         <div class=\"col-1\"></div></div></li>\n",
    );

    for row in book_rows(books) {
        let isbn_cell = match &row.catalog_link {
            Some(link) => format!(
                "<a href=\"{}\" target=\"_blank\">{}</a>",
                escape_html(link),
                escape_html(&row.isbn)
            ),
            None => escape_html(&row.isbn),
        };
        let thumbnail = match &row.detail.thumbnail_url {
            Some(url) => format!(
                "<img src=\"{}\" alt=\"{}\" class=\"img-fluid rounded\">",
                escape_html(url),
                escape_html(&row.detail.display_title)
            ),
            None => "<div class=\"no-image\">No Image</div>".to_string(),
        };
        let mut facts = String::new();
        for (label, value) in [
            ("Publisher", &row.detail.publisher),
            ("Published", &row.detail.published_date),
            ("Categories", &row.detail.categories),
            ("Description", &row.detail.description),
        ] {
            if let Some(value) = value {
                facts.push_str(&format!(
                    "<p><strong>{}:</strong> {}</p>",
                    label,
                    escape_html(value)
                ));
            }
        }

        out.push_str(&format!(
            "  <li class=\"list-group-item\" id=\"book-{index}\"><details>\
             <summary class=\"row\">\
             <div class=\"col-3\">{title}</div>\
             <div class=\"col-3\">{author}</div>\
             <div class=\"col-2\">{isbn}</div>\
             <div class=\"col-2\">{pages}</div>\
             <div class=\"col-1\"><button class=\"delete\" data-index=\"{index}\">Delete</button></div>\
             </summary>\
             <div class=\"row detail\"><div class=\"col-md-3\">{thumbnail}</div>\
             <div class=\"col-md-9\"><h5>{display_title}</h5>{facts}</div></div>\
             </details></li>\n",
            index = row.index,
            title = escape_html(&row.title),
            author = escape_html(&row.author),
            isbn = isbn_cell,
            pages = escape_html(&row.pages),
            thumbnail = thumbnail,
            display_title = escape_html(&row.detail.display_title),
            facts = facts,
        ));
    }

    let totals = Totals::of(books);
    out.push_str("</ul>\n");
    out.push_str(&format!(
        "<h3>Total books read: {}</h3>\n<h3>Total pages read: {}</h3>\n",
        totals.books, totals.pages
    ));
    out
}

/// Terminal listing: one line per book plus a totals line.
pub fn render_table(books: &[BookRecord]) -> String {
    let rows = book_rows(books);
    let headers = ["#", "TITLE", "AUTHOR", "ISBN", "PAGES"];
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.index.to_string(),
                row.title.clone(),
                row.author.clone(),
                row.isbn.clone(),
                row.pages.clone(),
            ]
        })
        .collect();

    let mut widths = headers.map(|header| header.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |values: [&str; 5]| -> String {
        values
            .iter()
            .zip(widths.iter())
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_line(headers)];
    for row in &cells {
        lines.push(format_line([
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
            row[4].as_str(),
        ]));
    }
    let totals = Totals::of(books);
    lines.push(format!(
        "Total books read: {}  Total pages read: {}",
        totals.books, totals.pages
    ));
    lines.join("\n")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
