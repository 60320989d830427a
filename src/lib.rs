pub mod catalog;
pub mod error;
pub mod parser;
pub mod query;
pub mod settings;
pub mod source;
pub mod text;

pub use catalog::{Attribute, BuildReport, CatalogBuilder, CountryCatalog, Organization};
pub use error::{ExtractError, FetchError};
pub use query::{Answer, QueryEngine, Question, ReligionSplit};
pub use settings::Settings;
pub use source::{DocumentSource, HttpSource, Page};
