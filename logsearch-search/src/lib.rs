pub mod builder;
pub mod cursor;
pub mod export;
pub mod request;
pub mod service;

pub use builder::{BuiltQuery, QueryArg, QueryBuilder};
pub use cursor::{PgRowCursor, Record, RowCursor, VecCursor};
pub use export::write_records;
pub use request::{ExportFormat, Filter, FilterColumn, SearchParams, SearchRequest};
pub use service::{ResultExporter, SearchService};
