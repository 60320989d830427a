use std::sync::LazyLock;

use reqwest::Url;
use scraper::Selector;

use super::element_text;
use crate::source::Page;
use crate::text::{collapse_whitespace, normalize};

static OPTION_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());

/// One entry of the landing page's country selector.
#[derive(Debug, Clone)]
pub struct CountryOption {
    /// Display name as listed.
    pub name: String,
    /// Catalog key derived from `name`.
    pub key: String,
    /// Country page, `None` for placeholder entries without a value.
    pub url: Option<Url>,
}

/// Every `<option>` on the page, in document order.
pub fn extract_options(page: &Page) -> Vec<CountryOption> {
    page.html
        .select(&OPTION_SEL)
        .map(|opt| {
            let name = collapse_whitespace(&element_text(opt));
            let url = opt
                .value()
                .attr("value")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .and_then(|v| page.resolve(v).ok());
            CountryOption {
                key: normalize(&name),
                name,
                url,
            }
        })
        .collect()
}

// ── Tests ──
