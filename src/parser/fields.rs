use std::sync::LazyLock;

use reqwest::Url;
use scraper::Selector;

use super::{element_text, nth_link_href, ANCHOR_SEL};
use crate::error::ExtractError;
use crate::source::Page;
use crate::text::normalize;

static FIELD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div#field").unwrap());
// every row after the header row
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr ~ tr").unwrap());
static COUNTRY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".country").unwrap());
static DATA_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".fieldData").unwrap());

/// The field page link for section `index` of a country page: the second
/// link inside the `index`-th `div#field`.
pub fn locate_field_link(anchor: &Page, index: usize) -> Result<Url, ExtractError> {
    let field = anchor
        .html
        .select(&FIELD_SEL)
        .nth(index)
        .ok_or_else(|| ExtractError::missing(format!("field section {}", index), &anchor.url))?;
    let href = nth_link_href(field, 1).ok_or_else(|| {
        ExtractError::missing(format!("field link in section {}", index), &anchor.url)
    })?;
    Ok(anchor.resolve(href)?)
}

/// `(country, value)` pairs from a field page, both normalized.
///
/// Rows lacking a country link or a data cell, or with an empty value, are
/// left out.
pub fn extract_rows(page: &Page) -> Vec<(String, String)> {
    page.html
        .select(&ROW_SEL)
        .filter_map(|row| {
            let country = row
                .select(&COUNTRY_SEL)
                .next()?
                .select(&ANCHOR_SEL)
                .next()
                .map(element_text)?;
            let data = row.select(&DATA_SEL).next().map(element_text)?;
            let (country, data) = (normalize(&country), normalize(&data));
            (!country.is_empty() && !data.is_empty()).then_some((country, data))
        })
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_url;

    fn page(url: &str, fixture: &str) -> Page {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}", fixture)).unwrap();
        Page::parse(parse_url(url).unwrap(), &html)
    }

    #[test]
    fn locates_second_link_of_each_section() {
        let anchor = page("https://factbook.test/geos/an.html", "anchor.html");
        let url = locate_field_link(&anchor, 1).unwrap();
        assert_eq!(url.as_str(), "https://factbook.test/fields/area.html");
        let url = locate_field_link(&anchor, 3).unwrap();
        assert_eq!(url.as_str(), "https://factbook.test/fields/hazards.html");
    }

    #[test]
    fn section_out_of_range_is_missing_element() {
        let anchor = page("https://factbook.test/geos/an.html", "anchor.html");
        let err = locate_field_link(&anchor, 75).unwrap_err();
        assert!(matches!(err, ExtractError::MissingElement { .. }));
        assert!(err.to_string().contains("field section 75"));
    }

    #[test]
    fn section_without_second_link_is_missing_element() {
        let anchor = page("https://factbook.test/geos/an.html", "anchor.html");
        // section 4 carries only its heading link
        assert!(locate_field_link(&anchor, 4).is_err());
    }

    #[test]
    fn rows_skip_header_and_normalize() {
        let p = page("https://factbook.test/fields/area.html", "field_area.html");
        let rows = extract_rows(&p);
        assert!(rows.iter().all(|(c, _)| c != "country"));
        assert!(rows.contains(&("finland".to_string(), "total: 338,145 sq km".to_string())));
        assert!(rows.contains(&(
            "andorra".to_string(),
            "total: 468 sq km land: 468 sq km water: 0 sq km".to_string()
        )));
    }

    #[test]
    fn malformed_rows_are_dropped() {
        let p = page("https://factbook.test/fields/area.html", "field_area.html");
        let rows = extract_rows(&p);
        // one row without a data cell, one with an empty cell
        assert!(rows.iter().all(|(c, _)| c != "lesotho" && c != "chad"));
    }
}
