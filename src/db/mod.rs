mod repository;
mod schema;

pub use repository::{DocumentStore, Repository};
