use std::sync::LazyLock;

use reqwest::Url;
use scraper::Selector;
use tracing::debug;

use super::{element_text, nth_link_href};
use crate::catalog::{organization, Organization};
use crate::error::ExtractError;
use crate::source::Page;
use crate::text::first_year;

static SUB_MENU_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".sub_menu").unwrap());
static APPENDIX_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#GetAppendix_B").unwrap());
static ENTRY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static CATEGORY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".category").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Link to the organizations appendix from the landing page's menus.
pub fn locate_appendix_link(
    landing: &Page,
    menu_index: usize,
    link_index: usize,
) -> Result<Url, ExtractError> {
    let menu = landing
        .html
        .select(&SUB_MENU_SEL)
        .nth(menu_index)
        .ok_or_else(|| ExtractError::missing(format!("sub menu {}", menu_index), &landing.url))?;
    let href = nth_link_href(menu, link_index).ok_or_else(|| {
        ExtractError::missing(
            format!("link {} of sub menu {}", link_index, menu_index),
            &landing.url,
        )
    })?;
    Ok(landing.resolve(href)?)
}

/// Dated organizations in document order. Entries whose description has no
/// four-digit year are dropped.
pub fn extract_organizations(page: &Page) -> Result<Vec<Organization>, ExtractError> {
    let appendix = page
        .html
        .select(&APPENDIX_SEL)
        .next()
        .ok_or_else(|| ExtractError::missing("organizations appendix", &page.url))?;

    let mut orgs = Vec::new();
    for entry in appendix.select(&ENTRY_SEL) {
        let Some(name) = entry.select(&CATEGORY_SEL).next().map(element_text) else {
            continue;
        };
        let Some(description) = entry.select(&CELL_SEL).next().map(element_text) else {
            continue;
        };
        match first_year(&description) {
            Some(year) => orgs.push(organization(year, &name)),
            None => debug!("No founding year for {}", name.trim()),
        }
    }
    Ok(orgs)
}

// ── Tests ──
