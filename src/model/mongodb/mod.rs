mod bson;
mod collection;
mod errors;

pub use bson::{now, serde_string_map, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use errors::is_duplicate_key_error;
