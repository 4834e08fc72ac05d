use async_trait::async_trait;
use std::collections::HashSet;

use super::model::*;
use super::query::MovieQuery;

/// Read access to the movie catalog. Listings are ordered by the requested
/// sort attribute (records missing it are excluded), windowed by skip/limit
/// after ordering, and each record carries the derived `favorite` flag for
/// the query's user (false everywhere when no user is given).
#[async_trait]
pub trait MovieRepo: Send + Sync {
    async fn list_movies(&self, query: &MovieQuery) -> CatalogResult<Vec<MovieRecord>>;

    async fn movies_by_genre(
        &self,
        genre: &str,
        query: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>>;

    async fn movies_for_actor(
        &self,
        person_id: &str,
        query: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>>;

    async fn movies_for_director(
        &self,
        person_id: &str,
        query: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>>;

    /// One movie, enriched with cast, directors, genres and rating tally.
    /// A missing movie is `CatalogError::NotFound`.
    async fn movie_by_id(
        &self,
        movie_id: &str,
        user_id: Option<&str>,
    ) -> CatalogResult<MovieRecord>;

    /// Movies sharing at least one genre, actor or director with the given
    /// one, most similar first. Each record carries its `score`.
    async fn similar_movies(
        &self,
        movie_id: &str,
        limit: Option<u32>,
        skip: u32,
    ) -> CatalogResult<Vec<MovieRecord>>;
}

#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    /// Identifiers of the movies a user has favorited. A user with no
    /// favorites yields an empty set, not an error.
    async fn user_favorites(&self, user_id: &str) -> CatalogResult<HashSet<String>>;
}

pub trait CatalogRepo: MovieRepo + FavoriteRepo {}

impl<T: MovieRepo + FavoriteRepo> CatalogRepo for T {}
