pub mod books;
pub mod convert;
pub mod extract;
pub mod freshness;

pub use books::BookTable;
pub use convert::{format_american, OddsFormat};
pub use extract::QuoteExtractor;
pub use freshness::FreshnessPolicy;
