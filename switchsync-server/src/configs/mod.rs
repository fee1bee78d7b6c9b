mod schema;
mod settings;
mod storage;

pub use schema::SchemaManager;
pub use settings::{Database, Settings, Sync};
pub use storage::Storage;
