//! Market page retrieval and parsing

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixture;
pub mod http;
pub mod parser;
pub mod provider;

pub use http::HttpSource;
pub use parser::{parse, ParseOutput, RowParseError, StructureChangedError};
pub use provider::{FetchError, PageSource, RawPage, StaticSource, UnreachableSource};
