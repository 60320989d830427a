//! Read-only questions over a [`CountryCatalog`].
//!
//! Every operation scans the whole catalog. A country whose needed
//! attribute is absent, or whose text does not carry the expected number,
//! is left out of that answer.

use serde::Serialize;

use crate::catalog::{Attribute, AttributeMap, CountryCatalog};
use crate::text::{leading_integer, normalize, parenthesized_integer};

/// Total area of Pennsylvania.
pub const PENNSYLVANIA_AREA_SQ_KM: u64 = 119_280;
pub const LONG_COASTLINE_KM: u64 = 2_500;
/// Larger than any real population; a continent with no parsable
/// population yields no answer.
pub const POPULATION_SENTINEL: u64 = 1_000_000_000;

/// The eight supported questions with their parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    Hazard { continent: String, hazard: String },
    FlagSymbol { symbol: String },
    LeastPopulous { continent: String },
    SmallerThanPennsylvania { continent: String },
    OldestOrganizations { count: usize },
    DominantReligion { above: u64, below: u64 },
    LandlockedBySingleNeighbor,
    CoastalClimate { continent: String, climate: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Names(Vec<String>),
    Name(String),
    Split(ReligionSplit),
}

/// Countries whose dominant religion share is above / below the two
/// thresholds. The lists are computed independently and may overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReligionSplit {
    pub above: Vec<String>,
    pub below: Vec<String>,
}

pub struct QueryEngine<'a> {
    catalog: &'a CountryCatalog,
}

impl<'a> QueryEngine<'a> {
    pub fn new(catalog: &'a CountryCatalog) -> Self {
        Self { catalog }
    }

    pub fn answer(&self, question: &Question) -> Answer {
        match question {
            Question::Hazard { continent, hazard } => Answer::Names(self.q1(continent, hazard)),
            Question::FlagSymbol { symbol } => Answer::Names(self.q2(symbol)),
            Question::LeastPopulous { continent } => Answer::Name(self.q3(continent)),
            Question::SmallerThanPennsylvania { continent } => Answer::Names(self.q4(continent)),
            Question::OldestOrganizations { count } => Answer::Names(self.q5(*count)),
            Question::DominantReligion { above, below } => Answer::Split(self.q6(*above, *below)),
            Question::LandlockedBySingleNeighbor => Answer::Names(self.q7()),
            Question::CoastalClimate { continent, climate } => {
                Answer::Names(self.q8(continent, climate))
            }
        }
    }

    /// Countries in `continent` whose natural hazards mention `hazard`.
    pub fn q1(&self, continent: &str, hazard: &str) -> Vec<String> {
        let hazard = hazard.to_lowercase();
        self.in_continent(continent)
            .filter(|(_, attrs)| field(attrs, Attribute::NaturalHazards).is_some_and(|h| h.contains(&hazard)))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Countries whose flag description contains `symbol`, case-sensitively.
    ///
    /// Stored descriptions are lower-case, so an upper-case symbol never
    /// matches.
    pub fn q2(&self, symbol: &str) -> Vec<String> {
        self.catalog
            .countries()
            .filter(|(_, attrs)| field(attrs, Attribute::Flag).is_some_and(|f| f.contains(symbol)))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Least populous country of `continent`, or an empty string.
    /// Ties keep the first country in catalog order.
    pub fn q3(&self, continent: &str) -> String {
        let mut smallest = String::new();
        let mut smallest_population = POPULATION_SENTINEL;
        for (name, attrs) in self.in_continent(continent) {
            let Some(population) = number(attrs, Attribute::Population) else {
                continue;
            };
            if population < smallest_population {
                smallest = name.to_string();
                smallest_population = population;
            }
        }
        smallest
    }

    /// Countries of `continent` with a smaller total area than Pennsylvania.
    pub fn q4(&self, continent: &str) -> Vec<String> {
        self.in_continent(continent)
            .filter(|(_, attrs)| number(attrs, Attribute::Area).is_some_and(|a| a < PENNSYLVANIA_AREA_SQ_KM))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Names of the `count` oldest organizations, oldest first.
    pub fn q5(&self, count: usize) -> Vec<String> {
        self.catalog
            .organizations()
            .iter()
            .take(count)
            .map(|o| o.name.clone())
            .collect()
    }

    /// Split on the dominant religion's share, the first number of the
    /// religions field.
    pub fn q6(&self, above: u64, below: u64) -> ReligionSplit {
        let mut split = ReligionSplit::default();
        for (name, attrs) in self.catalog.countries() {
            let Some(share) = number(attrs, Attribute::Religions) else {
                continue;
            };
            if share > above {
                split.above.push(name.to_string());
            }
            if share < below {
                split.below.push(name.to_string());
            }
        }
        split
    }

    /// Landlocked countries with exactly one neighbor.
    pub fn q7(&self) -> Vec<String> {
        self.catalog
            .countries()
            .filter(|(_, attrs)| {
                field(attrs, Attribute::Landlocked).is_some_and(|l| l.contains("landlock"))
                    && field(attrs, Attribute::Border)
                        .and_then(parenthesized_integer)
                        .is_some_and(|n| n == 1)
            })
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Countries of `continent` with a `climate` climate and more than
    /// 2,500 km of coastline.
    pub fn q8(&self, continent: &str, climate: &str) -> Vec<String> {
        let climate = climate.to_lowercase();
        self.in_continent(continent)
            .filter(|(_, attrs)| {
                field(attrs, Attribute::Climate).is_some_and(|c| c.contains(&climate))
                    && number(attrs, Attribute::Coastline).is_some_and(|km| km > LONG_COASTLINE_KM)
            })
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn in_continent(&self, continent: &str) -> impl Iterator<Item = (&'a str, &'a AttributeMap)> {
        let continent = normalize(continent);
        self.catalog
            .countries()
            .filter(move |(_, attrs)| field(attrs, Attribute::Continent) == Some(continent.as_str()))
    }
}

fn field(attrs: &AttributeMap, attr: Attribute) -> Option<&str> {
    attrs.get(&attr).map(String::as_str)
}

fn number(attrs: &AttributeMap, attr: Attribute) -> Option<u64> {
    field(attrs, attr).and_then(leading_integer)
}

// ── Tests ──
