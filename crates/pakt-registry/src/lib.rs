mod pool;
mod repository_index;
mod repository_store;

pub use pool::RepositoryPool;
pub use repository_index::RepositoryIndex;
pub use repository_store::{RepositoryRecord, RepositoryStore};

#[cfg(test)]
mod tests;
