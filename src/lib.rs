//! Job search API scraper.
//! Pages through the search results of one keyword for every configured CTC filter
//! and writes the raw responses, the raw job entries and a deduplicated CSV per filter.

mod macros;

mod error;
pub mod fetch;
pub mod parse;
pub mod persist;
pub mod process;
pub mod request;
pub mod settings;
pub mod token;

pub use error::{Error, Result};
pub use process::{process_site, FilterReport, Scraper, Termination};
pub use settings::{Cli, Settings};
