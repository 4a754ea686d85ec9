mod changes;
mod repository;
mod schema;

pub use changes::{ChangeEvent, ChangeKind, GENERATED_ARTICLES};
pub use repository::Repository;
