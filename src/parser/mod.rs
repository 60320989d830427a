//! Page readers. Each takes one fetched [`Page`](crate::source::Page) and
//! returns plain values; none of them fetch or touch the catalog.

pub mod countries;
pub mod fields;
pub mod organizations;

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

pub(crate) static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Text nodes of an element and its descendants, space separated so that
/// `<br>`-split sub-fields do not run together.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// `href` of the `n`-th link under `el`.
pub(crate) fn nth_link_href(el: ElementRef<'_>, n: usize) -> Option<&str> {
    el.select(&ANCHOR_SEL).nth(n)?.value().attr("href")
}
