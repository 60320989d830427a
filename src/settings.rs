use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::catalog::Attribute;

pub const DEFAULT_BASE_URL: &str = "https://www.cia.gov/library/publications/the-world-factbook/";
const DEFAULT_CONFIG_NAME: &str = "factbook";
const ENV_PREFIX: &str = "FACTBOOK";

/// One row of the section table: which `div#field` on the anchor page
/// links to the data page for `attribute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SectionMapping {
    pub index: usize,
    pub attribute: Attribute,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    /// Position in the selector option list of the country page whose
    /// field links are followed.
    pub anchor_index: usize,
    pub organizations_menu_index: usize,
    pub organizations_link_index: usize,
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Must follow the section ordering of the live document. Indices shift
    /// whenever the publisher adds or removes a field.
    pub sections: Vec<SectionMapping>,
    /// Selector entries that are not countries. Compared after normalization.
    pub excluded: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            anchor_index: 5,
            organizations_menu_index: 2,
            organizations_link_index: 1,
            user_agent: concat!("factbook_query/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
            sections: default_sections(),
            excluded: vec![
                "World".to_string(),
                "European Union".to_string(),
                "United States Pacific Island Wildlife Refuges".to_string(),
            ],
        }
    }
}

pub fn default_sections() -> Vec<SectionMapping> {
    [
        (3, Attribute::Continent),
        (4, Attribute::Area),
        (6, Attribute::Border),
        (7, Attribute::Coastline),
        (9, Attribute::Climate),
        (16, Attribute::NaturalHazards),
        (19, Attribute::Landlocked),
        (20, Attribute::Population),
        (24, Attribute::Religions),
        (75, Attribute::Flag),
    ]
    .into_iter()
    .map(|(index, attribute)| SectionMapping { index, attribute })
    .collect()
}

/// Load settings from an optional TOML file and `FACTBOOK_*` env vars.
///
/// Without an explicit path, `./factbook.toml` is read when it exists.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let settings: Settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    if settings.sections.is_empty() {
        anyhow::bail!("Configuration has an empty section table");
    }
    Ok(settings)
}

// ── Tests ──
