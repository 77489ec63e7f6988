//! Record store: the grammar, index, and handle cache, plus the
//! `RecordStore`/agent-identifier glue that ties them together.

pub mod cache;
pub mod grammar;
pub mod index;
pub mod store;

pub use cache::HandleCache;
pub use grammar::{evaluate, evaluate_value, parse_line, EvalOutcome, ParsedLine, TagSpec};
pub use index::{IndexEntry, LookupResult, RecordIndex};
pub use store::{derive_agent_id, discover_stores, RecordStore, StoreLookup};
