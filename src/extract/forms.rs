//! Marketo form detection
//!
//! Two strategies, tried in order:
//!
//! 1. **Inline**: `MktoForms2.loadForm("//app-xx.marketo.com", "123-ABC-456", 1234)`
//!    calls in script text. Each call binds one domain, one Munchkin ID and
//!    one form ID.
//! 2. **Structural**: forms2.js loader references, `Munchkin.init(...)` calls
//!    and `<form id="mktoForm_NNNN">` elements found separately. The loaders
//!    and Munchkin IDs cannot be bound to individual forms, so every form
//!    gets the joined set of all of them.

use crate::output::FormId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

static FORM_LOAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"MktoForms2\.loadForm\(([^)]*)\)").expect("valid loadForm regex"));
static MUNCHKIN_INIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Munchkin\.init\(([^)]*)\)").expect("valid Munchkin.init regex"));

static SCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("valid script selector"));
static LOADER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&format!(
        "link[href*='{0}'], script[src*='{0}']",
        FORMS2_LOADER_PATH
    ))
    .expect("valid loader selector")
});
static MKTO_FORM: Lazy<Selector> =
    Lazy::new(|| Selector::parse("form[id^='mktoForm_']").expect("valid form selector"));

/// Path fragment identifying the Marketo forms2 loader asset
pub const FORMS2_LOADER_PATH: &str = "marketo.com/js/forms2/js/forms2";

/// Separator used when several distinct values share one column
pub const VALUE_SEPARATOR: &str = "; ";

/// Which detection strategy produced a page's forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Inline,
    Structural,
}

/// The arguments of one `MktoForms2.loadForm(...)` call, unparsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLoad {
    /// First argument with slashes stripped (`app-ab12.marketo.com`)
    pub domain: String,
    pub munchkin_id: String,
    pub form_id: String,
}

/// A form detected on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMatch {
    pub form_id: FormId,
    pub marketo_domain: String,
    pub munchkin_id: String,
}

/// Finds every inline `MktoForms2.loadForm` call in the page's scripts
///
/// Calls with fewer than three arguments are skipped with a warning.
pub fn find_form_loads(document: &Html) -> Vec<FormLoad> {
    script_texts(document)
        .iter()
        .flat_map(|text| FORM_LOAD.captures_iter(text))
        .filter_map(|captures| {
            let args = split_arguments(&captures[1]);
            match args.as_slice() {
                [domain, munchkin_id, form_id, ..] => Some(FormLoad {
                    domain: domain.trim_matches('/').to_string(),
                    munchkin_id: munchkin_id.clone(),
                    form_id: form_id.clone(),
                }),
                _ => {
                    tracing::warn!("Ignoring malformed loadForm call: {}", &captures[0]);
                    None
                }
            }
        })
        .collect()
}

/// Detects the forms embedded directly on a content page
///
/// Returns the strategy that matched (None if neither did) and the forms it
/// found. A form whose id is not numeric is skipped with a warning; its
/// siblings are still returned.
pub fn detect_forms(document: &Html, page_url: &Url) -> (Option<Strategy>, Vec<FormMatch>) {
    let loads = find_form_loads(document);
    if !loads.is_empty() {
        let forms = loads
            .into_iter()
            .filter_map(|load| {
                let Some(form_id) = FormId::parse_numeric(&load.form_id) else {
                    tracing::warn!(
                        "Skipping non-numeric form id {:?} on {}",
                        load.form_id,
                        page_url
                    );
                    return None;
                };
                Some(FormMatch {
                    form_id,
                    marketo_domain: load.domain,
                    munchkin_id: load.munchkin_id,
                })
            })
            .collect();
        return (Some(Strategy::Inline), forms);
    }

    let forms = detect_structural(document, page_url);
    if forms.is_empty() {
        (None, forms)
    } else {
        (Some(Strategy::Structural), forms)
    }
}

/// Structural fallback: one match per `mktoForm_<id>` element
fn detect_structural(document: &Html, page_url: &Url) -> Vec<FormMatch> {
    let form_ids: Vec<&str> = document
        .select(&MKTO_FORM)
        .filter_map(|form| form.value().id())
        .collect();
    if form_ids.is_empty() {
        return Vec::new();
    }

    let marketo_domain = join_distinct(loader_hosts(document, page_url));
    let munchkin_id = join_distinct(munchkin_ids(document));

    form_ids
        .into_iter()
        .filter_map(|id| {
            let suffix = id.trim_start_matches("mktoForm_");
            match FormId::parse_numeric(suffix) {
                Some(form_id) => Some(FormMatch {
                    form_id,
                    marketo_domain: marketo_domain.clone(),
                    munchkin_id: munchkin_id.clone(),
                }),
                None => {
                    tracing::warn!("Skipping form element {:?} on {}", id, page_url);
                    None
                }
            }
        })
        .collect()
}

/// Hostnames of every forms2 loader referenced by `<link href>` or `<script src>`
fn loader_hosts(document: &Html, page_url: &Url) -> BTreeSet<String> {
    document
        .select(&LOADER)
        .filter_map(|element| {
            let value = element.value();
            value.attr("href").or_else(|| value.attr("src"))
        })
        .filter_map(|reference| page_url.join(reference.trim()).ok())
        .filter_map(|url| url.host_str().map(str::to_string))
        .collect()
}

/// First argument of every `Munchkin.init(...)` call
fn munchkin_ids(document: &Html) -> BTreeSet<String> {
    script_texts(document)
        .iter()
        .flat_map(|text| MUNCHKIN_INIT.captures_iter(text))
        .filter_map(|captures| split_arguments(&captures[1]).into_iter().next())
        .filter(|id| !id.is_empty())
        .collect()
}

fn script_texts(document: &Html) -> Vec<String> {
    document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .collect()
}

/// Splits a JavaScript argument list on commas, trimming whitespace and quotes
fn split_arguments(args: &str) -> Vec<String> {
    args.split(',')
        .map(|arg| {
            arg.trim()
                .trim_matches(|c: char| c == '"' || c == '\'')
                .trim()
                .to_string()
        })
        .collect()
}

fn join_distinct(values: BTreeSet<String>) -> String {
    values.into_iter().collect::<Vec<_>>().join(VALUE_SEPARATOR)
}
