//! Experience fragments
//!
//! CTA buttons of the form `<a data-target="#cta-modal" data-modal="/content/xf/...">`
//! open a modal whose content lives in a separately served fragment. The
//! fragment is fetched on its own and any forms it embeds are attributed to
//! the page carrying the button. Resolution stops at depth one: fragments are
//! not scanned for links or further fragments.

use super::forms::find_form_loads;
use crate::crawler::{FetchResult, FragmentOrigin};
use crate::output::{FormId, FormRecord};
use crate::url::origin_of;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static MODAL_TRIGGER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[data-target='#cta-modal'][data-modal]").expect("valid modal selector")
});

/// Path appended to a fragment reference to get its renderable content
pub const FRAGMENT_SUFFIX: &str = "/jcr:content/root/responsivegrid.html";

/// Builds the fetchable URL of a fragment referenced from `page_url`
///
/// The reference is resolved against the page's scheme and host, never its
/// path.
pub fn fragment_url(page_url: &Url, reference: &str) -> Option<Url> {
    let origin = origin_of(page_url)?;
    let path = reference.trim().trim_matches('/');
    if path.is_empty() {
        return None;
    }
    Url::parse(&format!("{}/{}{}", origin, path, FRAGMENT_SUFFIX)).ok()
}

/// Finds every fragment referenced by a modal trigger on the page
///
/// Returned in document order; repeated references are kept and left to the
/// frontier.
pub fn discover_fragments(document: &Html, page_url: &Url) -> Vec<Url> {
    document
        .select(&MODAL_TRIGGER)
        .filter_map(|anchor| anchor.value().attr("data-modal"))
        .filter_map(|reference| {
            let url = fragment_url(page_url, reference);
            if url.is_none() {
                tracing::debug!("Ignoring fragment reference {:?} on {}", reference, page_url);
            }
            url
        })
        .collect()
}

/// Extracts the forms of a fetched fragment as records of its referring page
///
/// Only inline `loadForm` calls are considered. Form ids are kept verbatim
/// when they are not numeric. A non-2xx fragment yields nothing.
pub fn resolve_fragment(result: &FetchResult, origin: &FragmentOrigin) -> Vec<FormRecord> {
    tracing::info!(
        "Parsing experience fragments: {}, {}",
        result.url,
        origin.referer
    );

    if !result.is_success() {
        tracing::debug!(
            "Fragment {} returned {}, nothing attributed to {}",
            result.url,
            result.status,
            origin.referer
        );
        return Vec::new();
    }

    let document = Html::parse_document(&result.body);
    find_form_loads(&document)
        .into_iter()
        .map(|load| {
            let form = super::FormMatch {
                form_id: FormId::parse_lenient(&load.form_id),
                marketo_domain: load.domain,
                munchkin_id: load.munchkin_id,
            };
            FormRecord::form(origin.referer.as_str(), origin.status, form, &origin.metadata)
                .from_fragment()
        })
        .collect()
}
