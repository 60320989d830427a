use std::collections::BTreeMap;
use std::fmt;

use indicatif::ProgressBar;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ExtractError;
use crate::parser::countries::{self, CountryOption};
use crate::parser::{fields, organizations};
use crate::settings::{SectionMapping, Settings};
use crate::source::{parse_url, DocumentSource, Page};
use crate::text::{collapse_whitespace, normalize};

/// The per-country facts tracked by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Continent,
    Area,
    Border,
    Coastline,
    Climate,
    NaturalHazards,
    Landlocked,
    Population,
    Religions,
    Flag,
}

impl Attribute {
    pub const ALL: [Attribute; 10] = [
        Attribute::Continent,
        Attribute::Area,
        Attribute::Border,
        Attribute::Coastline,
        Attribute::Climate,
        Attribute::NaturalHazards,
        Attribute::Landlocked,
        Attribute::Population,
        Attribute::Religions,
        Attribute::Flag,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Continent => "continent",
            Attribute::Area => "area",
            Attribute::Border => "border",
            Attribute::Coastline => "coastline",
            Attribute::Climate => "climate",
            Attribute::NaturalHazards => "natural_hazards",
            Attribute::Landlocked => "landlocked",
            Attribute::Population => "population",
            Attribute::Religions => "religions",
            Attribute::Flag => "flag",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type AttributeMap = BTreeMap<Attribute, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub founding_year: u32,
    pub name: String,
}

/// Normalized country name → attributes, plus the organization list.
///
/// Keys iterate in sorted order; "catalog order" in query results means
/// this order.
#[derive(Debug, Default)]
pub struct CountryCatalog {
    countries: BTreeMap<String, AttributeMap>,
    organizations: Vec<Organization>,
    options: Vec<CountryOption>,
}

impl CountryCatalog {
    /// Assemble a catalog from already-extracted records. Keys and values
    /// are normalized; empty values are dropped.
    pub fn from_records<N, V>(
        countries: impl IntoIterator<Item = (N, Vec<(Attribute, V)>)>,
        organizations: Vec<Organization>,
    ) -> Self
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut catalog = CountryCatalog::default();
        for (name, attrs) in countries {
            let key = normalize(name.as_ref());
            catalog.countries.entry(key.clone()).or_default();
            for (attr, value) in attrs {
                catalog.set_attribute(&key, attr, value.as_ref());
            }
        }
        catalog.set_organizations(organizations);
        catalog
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeMap> {
        self.countries.get(&normalize(name))
    }

    pub fn countries(&self) -> impl Iterator<Item = (&str, &AttributeMap)> {
        self.countries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Organizations by ascending founding year, ties in document order.
    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    /// Selector options as enumerated from the landing page.
    pub fn options(&self) -> &[CountryOption] {
        &self.options
    }

    fn seed(&mut self, options: Vec<CountryOption>) {
        for opt in &options {
            if opt.url.is_some() && !opt.key.is_empty() {
                self.countries.entry(opt.key.clone()).or_default();
            }
        }
        self.options = options;
    }

    /// Store a value for a known country. Unknown countries and empty
    /// values are ignored; returns whether the value was stored.
    fn set_attribute(&mut self, country: &str, attr: Attribute, raw: &str) -> bool {
        let value = normalize(raw);
        if value.is_empty() {
            return false;
        }
        match self.countries.get_mut(country) {
            Some(attrs) => {
                attrs.insert(attr, value);
                true
            }
            None => false,
        }
    }

    fn set_organizations(&mut self, mut orgs: Vec<Organization>) {
        // stable: equal years keep encounter order
        orgs.sort_by_key(|o| o.founding_year);
        self.organizations = orgs;
    }

    fn remove_excluded(&mut self, excluded: &[String]) -> Vec<String> {
        excluded
            .iter()
            .map(|name| normalize(name))
            .filter(|key| self.countries.remove(key).is_some())
            .collect()
    }
}

/// One stage of catalog assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStep {
    Selector,
    Anchor,
    Attribute(Attribute),
    Organizations,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Selector => f.write_str("selector"),
            BuildStep::Anchor => f.write_str("anchor"),
            BuildStep::Attribute(a) => write!(f, "attribute {}", a),
            BuildStep::Organizations => f.write_str("organizations"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulatedAttribute {
    pub attribute: Attribute,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedStep {
    pub step: BuildStep,
    pub reason: String,
}

/// What the build managed to gather and what it had to skip.
#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    pub countries: usize,
    pub populated: Vec<PopulatedAttribute>,
    pub skipped: Vec<SkippedStep>,
    pub organizations: usize,
    pub excluded: Vec<String>,
}

impl BuildReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    fn skip(&mut self, step: BuildStep, reason: impl fmt::Display) {
        warn!("Skipping {}: {}", step, reason);
        self.skipped.push(SkippedStep {
            step,
            reason: reason.to_string(),
        });
    }
}

/// Drives the fetch-and-extract sequence against a [`DocumentSource`].
///
/// Every page is fetched at most once per step, strictly in order. A failed
/// step is recorded in the report and the build moves on.
pub struct CatalogBuilder<'a, S: DocumentSource> {
    source: &'a S,
    settings: &'a Settings,
    progress: ProgressBar,
}

impl<'a, S: DocumentSource> CatalogBuilder<'a, S> {
    pub fn new(source: &'a S, settings: &'a Settings) -> Self {
        Self {
            source,
            settings,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(&self) -> (CountryCatalog, BuildReport) {
        let mut catalog = CountryCatalog::default();
        let mut report = BuildReport::default();
        self.progress.set_length(self.settings.sections.len() as u64 + 3);

        let base = match parse_url(&self.settings.base_url) {
            Ok(u) => u,
            Err(e) => {
                report.skip(BuildStep::Selector, &e);
                report.skip(BuildStep::Anchor, &e);
                self.skip_sections(&mut report, "anchor page unavailable");
                report.skip(BuildStep::Organizations, &e);
                self.progress.finish_and_clear();
                return (catalog, report);
            }
        };

        // 1. selector
        self.progress.set_message("selector");
        match self.fetch_options(&base) {
            Ok(options) => {
                info!("Selector lists {} entries", options.len());
                catalog.seed(options);
            }
            Err(e) => report.skip(BuildStep::Selector, e),
        }
        self.progress.inc(1);

        // 2-3. anchor page and field pages
        self.progress.set_message("anchor");
        let anchor = self.fetch_anchor(&catalog);
        self.progress.inc(1);
        match anchor {
            Ok(anchor) => {
                for mapping in &self.settings.sections {
                    self.progress.set_message(mapping.attribute.as_str());
                    match self.fill_attribute(&mut catalog, &anchor, mapping) {
                        Ok(rows) => {
                            info!("{}: {} rows", mapping.attribute, rows);
                            report.populated.push(PopulatedAttribute {
                                attribute: mapping.attribute,
                                rows,
                            });
                        }
                        Err(e) => report.skip(BuildStep::Attribute(mapping.attribute), e),
                    }
                    self.progress.inc(1);
                }
            }
            Err(e) => {
                report.skip(BuildStep::Anchor, &e);
                self.skip_sections(&mut report, "anchor page unavailable");
                self.progress.inc(self.settings.sections.len() as u64);
            }
        }

        // 4. organizations appendix
        self.progress.set_message("organizations");
        match self.fetch_organizations(&base) {
            Ok(orgs) => {
                info!("Appendix lists {} dated organizations", orgs.len());
                report.organizations = orgs.len();
                catalog.set_organizations(orgs);
            }
            Err(e) => report.skip(BuildStep::Organizations, e),
        }
        self.progress.inc(1);

        // 5. drop aggregates and territory groupings
        report.excluded = catalog.remove_excluded(&self.settings.excluded);
        report.countries = catalog.len();
        self.progress.finish_and_clear();

        info!(
            "Catalog ready: {} countries, {} attributes populated, {} steps skipped",
            report.countries,
            report.populated.len(),
            report.skipped.len()
        );
        (catalog, report)
    }

    fn skip_sections(&self, report: &mut BuildReport, reason: &str) {
        for mapping in &self.settings.sections {
            report.skip(BuildStep::Attribute(mapping.attribute), reason);
        }
    }

    fn fetch_options(&self, base: &Url) -> Result<Vec<CountryOption>, ExtractError> {
        let landing = self.source.fetch(base)?;
        let options = countries::extract_options(&landing);
        if options.is_empty() {
            return Err(ExtractError::missing("country selector options", &landing.url));
        }
        Ok(options)
    }

    fn fetch_anchor(&self, catalog: &CountryCatalog) -> Result<Page, ExtractError> {
        let index = self.settings.anchor_index;
        let url = catalog
            .options()
            .get(index)
            .and_then(|o| o.url.as_ref())
            .ok_or_else(|| ExtractError::MissingElement {
                what: format!("selector option {}", index),
                url: self.settings.base_url.clone(),
            })?;
        Ok(self.source.fetch(url)?)
    }

    fn fill_attribute(
        &self,
        catalog: &mut CountryCatalog,
        anchor: &Page,
        mapping: &SectionMapping,
    ) -> Result<usize, ExtractError> {
        let url = fields::locate_field_link(anchor, mapping.index)?;
        let page = self.source.fetch(&url)?;
        let written = fields::extract_rows(&page)
            .into_iter()
            .filter(|(country, value)| catalog.set_attribute(country, mapping.attribute, value))
            .count();
        Ok(written)
    }

    fn fetch_organizations(&self, base: &Url) -> Result<Vec<Organization>, ExtractError> {
        let landing = self.source.fetch(base)?;
        let url = organizations::locate_appendix_link(
            &landing,
            self.settings.organizations_menu_index,
            self.settings.organizations_link_index,
        )?;
        let appendix = self.source.fetch(&url)?;
        organizations::extract_organizations(&appendix)
    }
}

/// Name as shown in the appendix, whitespace collapsed.
pub(crate) fn organization(founding_year: u32, name: &str) -> Organization {
    Organization {
        founding_year,
        name: collapse_whitespace(name),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;

    const BASE: &str = "https://factbook.test/";

    fn fixture_settings() -> Settings {
        Settings {
            base_url: BASE.to_string(),
            anchor_index: 2,
            sections: vec![
                SectionMapping { index: 0, attribute: Attribute::Continent },
                SectionMapping { index: 1, attribute: Attribute::Area },
                SectionMapping { index: 2, attribute: Attribute::Population },
                SectionMapping { index: 3, attribute: Attribute::NaturalHazards },
            ],
            ..Settings::default()
        }
    }

    fn fixture_source() -> StaticSource {
        StaticSource::new()
            .with_fixture(BASE, "landing.html")
            .with_fixture(&format!("{}geos/an.html", BASE), "anchor.html")
            .with_fixture(&format!("{}fields/continent.html", BASE), "field_continent.html")
            .with_fixture(&format!("{}fields/area.html", BASE), "field_area.html")
            .with_fixture(&format!("{}fields/population.html", BASE), "field_population.html")
            .with_fixture(&format!("{}fields/hazards.html", BASE), "field_hazards.html")
            .with_fixture(&format!("{}appendix/appendix-b.html", BASE), "appendix_b.html")
    }

    #[test]
    fn full_build_populates_everything() {
        let settings = fixture_settings();
        let source = fixture_source();
        let (catalog, report) = CatalogBuilder::new(&source, &settings).build();

        assert!(report.is_complete(), "skipped: {:?}", report.skipped);
        assert_eq!(report.populated.len(), 4);
        assert_eq!(report.organizations, 4);
        assert_eq!(report.countries, catalog.len());

        let az = catalog.get("Azerbaijan").unwrap();
        assert_eq!(az.get(&Attribute::Continent).map(String::as_str), Some("asia"));
        assert_eq!(
            az.get(&Attribute::NaturalHazards).map(String::as_str),
            Some("is subject to earthquakes; floods")
        );
        assert_eq!(
            catalog.get("andorra").and_then(|a| a.get(&Attribute::Area)).map(String::as_str),
            Some("total: 468 sq km land: 468 sq km water: 0 sq km")
        );
    }

    #[test]
    fn values_are_normalized_source_text() {
        let settings = fixture_settings();
        let source = fixture_source();
        let (catalog, _) = CatalogBuilder::new(&source, &settings).build();
        for (name, attrs) in catalog.countries() {
            assert_eq!(normalize(name), name);
            for value in attrs.values() {
                assert!(!value.is_empty());
                assert_eq!(&normalize(value), value);
            }
        }
    }

    #[test]
    fn exclusions_match_despite_case() {
        let settings = fixture_settings();
        let source = fixture_source();
        let (catalog, report) = CatalogBuilder::new(&source, &settings).build();
        assert!(catalog.get("world").is_none());
        assert!(catalog.get("european union").is_none());
        assert_eq!(report.excluded, vec!["world".to_string(), "european union".to_string()]);
    }

    #[test]
    fn unknown_rows_and_placeholders_are_ignored() {
        let settings = fixture_settings();
        let source = fixture_source();
        let (catalog, _) = CatalogBuilder::new(&source, &settings).build();
        // listed on the area page, not in the selector
        assert!(catalog.get("atlantis").is_none());
        // placeholder option has no value
        assert!(catalog.get("country").is_none());
        assert!(catalog.options().len() > catalog.len());
    }

    #[test]
    fn later_section_for_same_attribute_wins_except_blanks() {
        let mut settings = fixture_settings();
        settings.sections = vec![
            SectionMapping { index: 0, attribute: Attribute::Continent },
            SectionMapping { index: 1, attribute: Attribute::Area },
            SectionMapping { index: 5, attribute: Attribute::Area },
        ];
        let source = fixture_source().with_fixture(
            &format!("{}fields/area-comparative.html", BASE),
            "field_area_comparative.html",
        );
        let (catalog, report) = CatalogBuilder::new(&source, &settings).build();
        assert!(report.is_complete(), "skipped: {:?}", report.skipped);

        let area = |name: &str| {
            catalog
                .get(name)
                .and_then(|a| a.get(&Attribute::Area))
                .cloned()
        };
        assert_eq!(area("andorra").as_deref(), Some("2.5 times the size of washington, dc"));
        // blank cell on the second page leaves the first value in place
        assert_eq!(area("finland").as_deref(), Some("total: 338,145 sq km"));
        assert_eq!(area("azerbaijan").as_deref(), Some("total: 86,600 sq km"));
    }

    #[test]
    fn unparsable_base_url_reports_every_step() {
        let mut settings = fixture_settings();
        settings.base_url = "not a url".to_string();
        let source = fixture_source();
        let (catalog, report) = CatalogBuilder::new(&source, &settings).build();

        assert!(catalog.is_empty());
        assert!(report.populated.is_empty());
        assert!(source.fetched().is_empty());
        let steps: Vec<_> = report.skipped.iter().map(|s| s.step).collect();
        let mut expected = vec![BuildStep::Selector, BuildStep::Anchor];
        expected.extend(settings.sections.iter().map(|m| BuildStep::Attribute(m.attribute)));
        expected.push(BuildStep::Organizations);
        assert_eq!(steps, expected);
    }

    #[test]
    fn missing_field_page_skips_only_that_attribute() {
        let settings = fixture_settings();
        let source = fixture_source().without_page(&format!("{}fields/area.html", BASE));
        let (catalog, report) = CatalogBuilder::new(&source, &settings).build();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].step, BuildStep::Attribute(Attribute::Area));
        assert_eq!(report.populated.len(), 3);
        assert!(catalog.countries().all(|(_, a)| !a.contains_key(&Attribute::Area)));
        assert_eq!(report.organizations, 4);
    }

    #[test]
    fn missing_anchor_still_builds_organizations() {
        let settings = fixture_settings();
        let source = fixture_source().without_page(&format!("{}geos/an.html", BASE));
        let (catalog, report) = CatalogBuilder::new(&source, &settings).build();

        assert_eq!(report.skipped[0].step, BuildStep::Anchor);
        assert_eq!(report.skipped.len(), 1 + settings.sections.len());
        assert!(report.populated.is_empty());
        assert!(!catalog.is_empty());
        assert_eq!(catalog.organizations().len(), 4);
    }

    #[test]
    fn unreachable_landing_page_degrades_to_empty() {
        let settings = fixture_settings();
        let source = StaticSource::new();
        let (catalog, report) = CatalogBuilder::new(&source, &settings).build();

        assert!(catalog.is_empty());
        assert!(catalog.organizations().is_empty());
        let steps: Vec<_> = report.skipped.iter().map(|s| s.step).collect();
        assert_eq!(steps[0], BuildStep::Selector);
        assert_eq!(steps[1], BuildStep::Anchor);
        assert_eq!(*steps.last().unwrap(), BuildStep::Organizations);
    }

    #[test]
    fn fetches_happen_in_build_order() {
        let settings = fixture_settings();
        let source = fixture_source();
        CatalogBuilder::new(&source, &settings).build();
        let fetched = source.fetched();
        assert_eq!(
            fetched,
            vec![
                BASE.to_string(),
                format!("{}geos/an.html", BASE),
                format!("{}fields/continent.html", BASE),
                format!("{}fields/area.html", BASE),
                format!("{}fields/population.html", BASE),
                format!("{}fields/hazards.html", BASE),
                BASE.to_string(),
                format!("{}appendix/appendix-b.html", BASE),
            ]
        );
    }

    #[test]
    fn organizations_sorted_stably() {
        let catalog = CountryCatalog::from_records(
            Vec::<(&str, Vec<(Attribute, &str)>)>::new(),
            vec![
                organization(1949, "nato"),
                organization(1945, "united nations"),
                organization(1945, "world bank"),
            ],
        );
        let names: Vec<_> = catalog.organizations().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["united nations", "world bank", "nato"]);
    }

    #[test]
    fn from_records_drops_empty_values() {
        let catalog = CountryCatalog::from_records(
            vec![("  Chad ", vec![(Attribute::Flag, "  "), (Attribute::Continent, "Africa")])],
            vec![],
        );
        let chad = catalog.get("chad").unwrap();
        assert!(!chad.contains_key(&Attribute::Flag));
        assert_eq!(chad.get(&Attribute::Continent).map(String::as_str), Some("africa"));
    }
}
