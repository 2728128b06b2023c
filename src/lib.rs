//! Load five delimited site exports into an in-memory keyed store and
//! answer site-code lookups with a joined hardware report.

pub mod fetch;
pub mod parse;
pub mod resolve;
pub mod schema;
pub mod store;
