#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod fallback;
pub mod score;
pub mod state;
pub mod store;
pub mod utils;

pub use engine::{ColumnProfile, HeaderMatcher};
pub use error::{FallbackError, MappingError, StoreError};
pub use fallback::{
    CommandFallback, FallbackMatcher, FallbackVerdict, NoFallback, TimeoutFallback, parse_verdict,
};
pub use score::{FieldScore, score_field};
pub use state::{AcceptedMapping, MappingState};
pub use store::{JsonRuleStore, MemoryRuleStore, RuleStore, timestamp};
pub use utils::normalize_text;
