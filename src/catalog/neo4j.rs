use std::collections::HashSet;
use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use neo4rs::{query, ConfigBuilder, Graph, Node, Query, Txn};
use tracing::{debug, info};

use crate::config::{CatalogConfig, Config};

use super::model::*;
use super::query::*;
use super::repo::*;

/// Catalog backend over a Neo4j-style graph. Every operation runs inside
/// its own read transaction: the favorite set is resolved first (when a
/// user is given), then the single main query, then commit. Any early
/// return drops the transaction, which rolls it back.
pub struct Neo4jRepository {
    graph: Graph,
    catalog: CatalogConfig,
}

impl Neo4jRepository {
    /// Connect to the graph database and verify it responds.
    pub async fn connect(config: &Config) -> CatalogResult<Self> {
        info!("Connecting to Neo4j at {}", config.neo4j.uri);

        let driver_config = ConfigBuilder::default()
            .uri(config.neo4j.uri.as_str())
            .user(config.neo4j.username.as_str())
            .password(config.neo4j.password.as_str())
            .db(config.neo4j.database.as_str())
            .fetch_size(config.neo4j.fetch_size)
            .max_connections(config.neo4j.max_connections)
            .build()?;
        let graph = Graph::connect(driver_config).await?;

        let repo = Self::new(graph, config.catalog.clone());
        repo.ping().await?;

        info!("Connected to database {}", config.neo4j.database);
        Ok(repo)
    }

    /// Wrap an already-connected driver handle.
    pub fn new(graph: Graph, catalog: CatalogConfig) -> Self {
        Self { graph, catalog }
    }

    async fn ping(&self) -> CatalogResult<()> {
        self.graph.run(query("RETURN 1")).await?;
        Ok(())
    }

    async fn with_deadline<F, T>(&self, fut: F) -> CatalogResult<T>
    where
        F: Future<Output = CatalogResult<T>>,
    {
        match self.catalog.timeout() {
            Some(deadline) => match tokio::time::timeout(deadline, fut).await {
                Ok(result) => result,
                Err(_) => Err(CatalogError::Timeout(deadline)),
            },
            None => fut.await,
        }
    }

    async fn fetch_listing(
        &self,
        q: Query,
        user_id: Option<&str>,
    ) -> CatalogResult<Vec<MovieRecord>> {
        let mut txn = self.graph.start_txn().await?;
        let favorites = fetch_favorites(&mut txn, user_id).await?;

        let mut records = Vec::new();
        let mut rows = txn.execute(q).await?;
        while let Some(row) = rows.next(txn.handle()).await? {
            let node: Node = row
                .get("m")
                .map_err(|e| CatalogError::Malformed(e.to_string()))?;
            let mut record = record_from_node(&node);
            record.apply_favorite(&favorites);
            records.push(record);
        }

        txn.commit().await?;
        Ok(records)
    }

    async fn fetch_single(
        &self,
        q: Query,
        movie_id: &str,
        user_id: Option<&str>,
    ) -> CatalogResult<MovieRecord> {
        let mut txn = self.graph.start_txn().await?;
        let favorites = fetch_favorites(&mut txn, user_id).await?;

        let mut rows = txn.execute(q).await?;
        let row = match rows.next(txn.handle()).await? {
            Some(row) => row,
            None => {
                return Err(CatalogError::NotFound(format!(
                    "Movie not found: {}",
                    movie_id
                )))
            }
        };

        let node: Node = row
            .get("m")
            .map_err(|e| CatalogError::Malformed(e.to_string()))?;
        let mut record = record_from_node(&node);
        for field in [FIELD_CAST, FIELD_DIRECTORS, FIELD_GENRES] {
            if let Ok(names) = row.get::<Vec<String>>(field) {
                record.insert(field, names);
            }
        }
        if let Ok(count) = row.get::<i64>(FIELD_RATING_COUNT) {
            record.insert(FIELD_RATING_COUNT, count);
        }
        record.apply_favorite(&favorites);

        txn.commit().await?;
        Ok(record)
    }

    async fn fetch_scored(&self, q: Query) -> CatalogResult<Vec<MovieRecord>> {
        let mut txn = self.graph.start_txn().await?;

        let mut records = Vec::new();
        let mut rows = txn.execute(q).await?;
        while let Some(row) = rows.next(txn.handle()).await? {
            let node: Node = row
                .get("m")
                .map_err(|e| CatalogError::Malformed(e.to_string()))?;
            let mut record = record_from_node(&node);
            if let Ok(score) = row.get::<f64>(FIELD_SCORE) {
                record.insert(FIELD_SCORE, score);
            }
            records.push(record);
        }

        txn.commit().await?;
        Ok(records)
    }
}

#[async_trait]
impl MovieRepo for Neo4jRepository {
    async fn list_movies(&self, params: &MovieQuery) -> CatalogResult<Vec<MovieRecord>> {
        let (skip, limit) = params.window(&self.catalog);
        if limit == 0 {
            return Ok(Vec::new());
        }
        debug!(
            "Listing movies by {} {}, skip {} limit {}",
            params.sort.property(),
            params.order.keyword(),
            skip,
            limit
        );

        let q = query(&list_movies_cypher(params.sort, params.order))
            .param("skip", skip)
            .param("limit", limit);
        self.with_deadline(self.fetch_listing(q, params.user_id.as_deref()))
            .await
    }

    async fn movies_by_genre(
        &self,
        genre: &str,
        params: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>> {
        let (skip, limit) = params.window(&self.catalog);
        if limit == 0 {
            return Ok(Vec::new());
        }
        debug!("Listing movies in genre {}", genre);

        let q = query(&movies_by_genre_cypher(params.sort, params.order))
            .param("genre", genre)
            .param("skip", skip)
            .param("limit", limit);
        self.with_deadline(self.fetch_listing(q, params.user_id.as_deref()))
            .await
    }

    async fn movies_for_actor(
        &self,
        person_id: &str,
        params: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>> {
        let (skip, limit) = params.window(&self.catalog);
        if limit == 0 {
            return Ok(Vec::new());
        }
        debug!("Listing movies with actor {}", person_id);

        let q = query(&movies_for_actor_cypher(params.sort, params.order))
            .param("personId", person_id)
            .param("skip", skip)
            .param("limit", limit);
        self.with_deadline(self.fetch_listing(q, params.user_id.as_deref()))
            .await
    }

    async fn movies_for_director(
        &self,
        person_id: &str,
        params: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>> {
        let (skip, limit) = params.window(&self.catalog);
        if limit == 0 {
            return Ok(Vec::new());
        }
        debug!("Listing movies by director {}", person_id);

        let q = query(&movies_for_director_cypher(params.sort, params.order))
            .param("personId", person_id)
            .param("skip", skip)
            .param("limit", limit);
        self.with_deadline(self.fetch_listing(q, params.user_id.as_deref()))
            .await
    }

    async fn movie_by_id(
        &self,
        movie_id: &str,
        user_id: Option<&str>,
    ) -> CatalogResult<MovieRecord> {
        debug!("Fetching movie {}", movie_id);

        let q = query(movie_by_id_cypher()).param("movieId", movie_id);
        self.with_deadline(self.fetch_single(q, movie_id, user_id))
            .await
    }

    async fn similar_movies(
        &self,
        movie_id: &str,
        limit: Option<u32>,
        skip: u32,
    ) -> CatalogResult<Vec<MovieRecord>> {
        let params = MovieQuery {
            limit,
            skip,
            ..Default::default()
        };
        let (skip, limit) = params.window(&self.catalog);
        if limit == 0 {
            return Ok(Vec::new());
        }
        debug!("Finding movies similar to {}", movie_id);

        let q = query(similar_movies_cypher())
            .param("movieId", movie_id)
            .param("skip", skip)
            .param("limit", limit);
        self.with_deadline(self.fetch_scored(q)).await
    }
}

#[async_trait]
impl FavoriteRepo for Neo4jRepository {
    async fn user_favorites(&self, user_id: &str) -> CatalogResult<HashSet<String>> {
        debug!("Resolving favorites for user {}", user_id);

        let fetch = async {
            let mut txn = self.graph.start_txn().await?;
            let favorites = fetch_favorites(&mut txn, Some(user_id)).await?;
            txn.commit().await?;
            Ok(favorites)
        };
        self.with_deadline(fetch).await
    }
}

/// Resolve the favorite set inside an already-open transaction. No user
/// means an empty set and no query at all.
async fn fetch_favorites(txn: &mut Txn, user_id: Option<&str>) -> CatalogResult<HashSet<String>> {
    let user_id = match user_id {
        Some(id) => id,
        None => return Ok(HashSet::new()),
    };

    let q = query(user_favorites_cypher()).param("userId", user_id);
    let mut favorites = HashSet::new();
    let mut rows = txn.execute(q).await?;
    while let Some(row) = rows.next(txn.handle()).await? {
        if let Ok(id) = row.get::<String>(FIELD_TMDB_ID) {
            favorites.insert(id);
        }
    }
    Ok(favorites)
}

/// Convert a movie node into a record, one property at a time. Bolt values
/// are dynamically typed; each is tried against the supported kinds, most
/// specific first. Properties of unsupported kinds are skipped.
fn record_from_node(node: &Node) -> MovieRecord {
    let mut record = MovieRecord::new();
    for key in node.keys() {
        if let Some(value) = property_value(node, key) {
            record.insert(key, value);
        }
    }
    record
}

fn property_value(node: &Node, key: &str) -> Option<FieldValue> {
    if let Ok(value) = node.get::<bool>(key) {
        return Some(FieldValue::Bool(value));
    }
    // Integers before floats: a float read happily accepts an integer.
    if let Ok(value) = node.get::<i64>(key) {
        return Some(FieldValue::Integer(value));
    }
    if let Ok(value) = node.get::<f64>(key) {
        return Some(FieldValue::Float(value));
    }
    // Dates before strings, so date-typed properties keep their kind.
    if let Ok(value) = node.get::<NaiveDate>(key) {
        return Some(FieldValue::Date(value));
    }
    if let Ok(value) = node.get::<DateTime<Utc>>(key) {
        return Some(FieldValue::DateTime(value));
    }
    if let Ok(value) = node.get::<String>(key) {
        return Some(FieldValue::Text(value));
    }
    if let Ok(value) = node.get::<Vec<String>>(key) {
        return Some(FieldValue::List(
            value.into_iter().map(FieldValue::Text).collect(),
        ));
    }
    None
}
