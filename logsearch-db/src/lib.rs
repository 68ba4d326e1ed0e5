pub mod pool;
pub mod db;
pub mod sql;
pub mod partition;
pub mod record;
pub mod schema;
pub mod table;
pub mod transaction;

pub use pool::DatabasePool;

pub use db::initialize_db;

pub use partition::PartitionWindow;
pub use record::{RawLogRecord, RequestInfoRecord};
pub use schema::SchemaManager;
pub use table::{LogicalTable, TableKind, TableSet};
pub use transaction::{SqlParam, WriteBatch};
