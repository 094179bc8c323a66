mod error;
mod files;
mod interner;
mod schema;
mod store;

pub use error::{Result, StoreError};
pub use files::{crashdata_path, crashfile_path, template_path, write_crashdata, write_crashfile, write_template};
pub use interner::id_for_string;
pub use schema::MIGRATIONS;
pub use store::{InsertedResult, Store};
