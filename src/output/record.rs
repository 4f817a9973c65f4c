//! The output row
//!
//! Column names are the CSV header and must stay byte-identical across
//! releases, since existing files are appended to.

use crate::extract::{FormMatch, PageMetadata};
use serde::{Serialize, Serializer};
use std::fmt;

/// Error text of a 404 record
pub const PAGE_NOT_FOUND: &str = "Page not found";

/// CSV header, in column order
pub const CSV_HEADER: [&str; 11] = [
    "url",
    "status",
    "error",
    "form_id",
    "Marketo_domain",
    "munchkin_id",
    "program_name",
    "title",
    "meta description",
    "h1 (heading 1)",
    "from_experience_fragment",
];

/// A Marketo form identifier
///
/// Numeric in every well-formed embed. A fragment may carry an id that does
/// not parse; it is kept verbatim rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FormId {
    Numeric(u64),
    Raw(String),
}

impl FormId {
    /// Numeric id, or None if `raw` is not an unsigned integer
    pub fn parse_numeric(raw: &str) -> Option<Self> {
        raw.trim().parse().ok().map(Self::Numeric)
    }

    /// Numeric id if possible, the trimmed raw text otherwise
    pub fn parse_lenient(raw: &str) -> Self {
        Self::parse_numeric(raw).unwrap_or_else(|| Self::Raw(raw.trim().to_string()))
    }

    pub fn as_numeric(&self) -> Option<u64> {
        match self {
            Self::Numeric(id) => Some(*id),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{}", id),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

/// One row of output: a form found on a page, or a page that 404'd
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormRecord {
    pub url: String,
    pub status: u16,
    pub error: Option<String>,
    pub form_id: Option<FormId>,
    #[serde(rename = "Marketo_domain")]
    pub marketo_domain: Option<String>,
    pub munchkin_id: Option<String>,
    pub program_name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "meta description")]
    pub meta_description: Option<String>,
    #[serde(rename = "h1 (heading 1)")]
    pub h1: Option<String>,
    #[serde(serialize_with = "serialize_flag")]
    pub from_experience_fragment: Option<bool>,
}

impl FormRecord {
    /// The single record emitted for a 404 page
    pub fn not_found(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            error: Some(PAGE_NOT_FOUND.to_string()),
            form_id: None,
            marketo_domain: None,
            munchkin_id: None,
            program_name: None,
            title: None,
            meta_description: None,
            h1: None,
            from_experience_fragment: None,
        }
    }

    /// A form found directly on a page
    pub fn form(
        url: impl Into<String>,
        status: u16,
        form: FormMatch,
        metadata: &PageMetadata,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            error: None,
            form_id: Some(form.form_id),
            marketo_domain: Some(form.marketo_domain),
            munchkin_id: Some(form.munchkin_id),
            program_name: metadata.program_name.clone(),
            title: metadata.title.clone(),
            meta_description: metadata.meta_description.clone(),
            h1: metadata.h1.clone(),
            from_experience_fragment: None,
        }
    }

    /// Marks the record as found inside an experience fragment
    pub fn from_fragment(mut self) -> Self {
        self.from_experience_fragment = Some(true);
        self
    }
}

// Existing output files hold Python-style booleans
fn serialize_flag<S: Serializer>(flag: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
    match flag {
        Some(true) => serializer.serialize_str("True"),
        Some(false) => serializer.serialize_str("False"),
        None => serializer.serialize_none(),
    }
}
