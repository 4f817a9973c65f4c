use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static PROGRAM_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#ProgramName").expect("valid program name selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid title selector"));
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[name='description']").expect("valid meta description selector")
});
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid h1 selector"));

/// Descriptive fields of a content page, copied into each of its records
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageMetadata {
    /// Text of the `#ProgramName` element (Marketo program on landing pages)
    pub program_name: Option<String>,

    /// Document title
    pub title: Option<String>,

    /// `content` of `<meta name="description">`
    pub meta_description: Option<String>,

    /// Text of the first `<h1>`, internal whitespace collapsed
    pub h1: Option<String>,
}

impl PageMetadata {
    /// Extracts metadata from a parsed page
    pub fn extract(document: &Html) -> Self {
        Self {
            program_name: first_text(document, &PROGRAM_NAME).map(|t| t.trim().to_string()),
            title: first_text(document, &TITLE).map(|t| t.trim().to_string()),
            meta_description: document
                .select(&META_DESCRIPTION)
                .next()
                .and_then(|e| e.value().attr("content"))
                .map(str::to_string),
            h1: first_text(document, &H1).map(|t| collapse_whitespace(&t)),
        }
        .without_empty()
    }

    fn without_empty(mut self) -> Self {
        for field in [
            &mut self.program_name,
            &mut self.title,
            &mut self.meta_description,
            &mut self.h1,
        ] {
            if field.as_deref().is_some_and(str::is_empty) {
                *field = None;
            }
        }
        self
    }
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>())
}

/// Collapses every run of whitespace to a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
