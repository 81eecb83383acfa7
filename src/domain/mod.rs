pub mod enrichment;
pub mod language;
pub mod movie;
pub mod progress;

pub use enrichment::{EnrichmentStatus, Tier};
pub use language::Language;
pub use movie::{MovieId, MovieRecord, ID_PREFIX};
pub use progress::{CrawlProgress, CrawlState};
