pub mod memory;
pub mod model;
pub mod neo4j;
pub mod query;
pub mod repo;

pub use memory::MemoryRepository;
pub use model::*;
pub use neo4j::Neo4jRepository;
pub use query::*;
pub use repo::*;
