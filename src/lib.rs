pub mod catalog;
pub mod config;

pub use catalog::{
    CatalogError, CatalogRepo, CatalogResult, FavoriteRepo, FieldValue, MemoryRepository,
    MovieQuery, MovieRecord, MovieRepo, MovieSort, Neo4jRepository, SortOrder,
};
pub use config::{CatalogConfig, Config, ConfigError, Neo4jConfig};
