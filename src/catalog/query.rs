use crate::catalog::model::CatalogError;
use crate::config::CatalogConfig;
use std::str::FromStr;
use tracing::debug;

/// Sort direction. Only the two fixed keywords ever reach query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, SortOrder::Descending)
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Ascending
    }
}

impl FromStr for SortOrder {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") || s.eq_ignore_ascii_case("ascending") {
            Ok(SortOrder::Ascending)
        } else if s.eq_ignore_ascii_case("desc") || s.eq_ignore_ascii_case("descending") {
            Ok(SortOrder::Descending)
        } else {
            Err(CatalogError::InvalidParameter(format!(
                "unknown sort order '{}'",
                s
            )))
        }
    }
}

/// Attributes a caller may sort listings by. Caller input is parsed into
/// this enum before any query is built; the property fragment interpolated
/// into query text comes from here, never from the caller's string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieSort {
    Title,
    Released,
    ImdbRating,
}

impl MovieSort {
    pub fn property(&self) -> &'static str {
        match self {
            MovieSort::Title => "title",
            MovieSort::Released => "released",
            MovieSort::ImdbRating => "imdbRating",
        }
    }
}

impl Default for MovieSort {
    fn default() -> Self {
        MovieSort::Title
    }
}

impl FromStr for MovieSort {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("title") {
            Ok(MovieSort::Title)
        } else if s.eq_ignore_ascii_case("released") {
            Ok(MovieSort::Released)
        } else if s.eq_ignore_ascii_case("imdbRating") {
            Ok(MovieSort::ImdbRating)
        } else {
            Err(CatalogError::InvalidParameter(format!(
                "unknown sort field '{}'",
                s
            )))
        }
    }
}

/// Options accepted by the listing operations.
#[derive(Debug, Clone, Default)]
pub struct MovieQuery {
    pub sort: MovieSort,
    pub order: SortOrder,
    /// Page size; falls back to the configured default when absent.
    pub limit: Option<u32>,
    pub skip: u32,
    /// When set, returned records are flagged against this user's favorites.
    pub user_id: Option<String>,
}

impl MovieQuery {
    /// Resolve the effective (skip, limit) window under the paging policy.
    /// Limits above the configured maximum are clamped.
    pub fn window(&self, config: &CatalogConfig) -> (i64, i64) {
        let requested = self.limit.unwrap_or(config.default_limit);
        let limit = if requested > config.max_limit {
            debug!(
                "Clamping requested limit {} to maximum {}",
                requested, config.max_limit
            );
            config.max_limit
        } else {
            requested
        };
        (i64::from(self.skip), i64::from(limit))
    }
}

/// All movies, windowed. Records missing the sort attribute are excluded.
pub fn list_movies_cypher(sort: MovieSort, order: SortOrder) -> String {
    format!(
        "MATCH (m:Movie)\n\
         WHERE m.{prop} IS NOT NULL\n\
         RETURN m\n\
         ORDER BY m.{prop} {dir}\n\
         SKIP $skip LIMIT $limit",
        prop = sort.property(),
        dir = order.keyword()
    )
}

/// Movies in the named genre, windowed.
pub fn movies_by_genre_cypher(sort: MovieSort, order: SortOrder) -> String {
    format!(
        "MATCH (m:Movie)-[:IN_GENRE]->(:Genre {{name: $genre}})\n\
         WHERE m.{prop} IS NOT NULL\n\
         RETURN m\n\
         ORDER BY m.{prop} {dir}\n\
         SKIP $skip LIMIT $limit",
        prop = sort.property(),
        dir = order.keyword()
    )
}

/// Movies a person acted in, windowed.
pub fn movies_for_actor_cypher(sort: MovieSort, order: SortOrder) -> String {
    format!(
        "MATCH (:Person {{tmdbId: $personId}})-[:ACTED_IN]->(m:Movie)\n\
         WHERE m.{prop} IS NOT NULL\n\
         RETURN m\n\
         ORDER BY m.{prop} {dir}\n\
         SKIP $skip LIMIT $limit",
        prop = sort.property(),
        dir = order.keyword()
    )
}

/// Movies a person directed, windowed.
pub fn movies_for_director_cypher(sort: MovieSort, order: SortOrder) -> String {
    format!(
        "MATCH (:Person {{tmdbId: $personId}})-[:DIRECTED]->(m:Movie)\n\
         WHERE m.{prop} IS NOT NULL\n\
         RETURN m\n\
         ORDER BY m.{prop} {dir}\n\
         SKIP $skip LIMIT $limit",
        prop = sort.property(),
        dir = order.keyword()
    )
}

/// One movie with its cast, directors, genres and rating tally.
pub fn movie_by_id_cypher() -> &'static str {
    "MATCH (m:Movie {tmdbId: $movieId})\n\
     RETURN m,\n\
     [ (p:Person)-[:ACTED_IN]->(m) | p.name ] AS cast,\n\
     [ (p:Person)-[:DIRECTED]->(m) | p.name ] AS directors,\n\
     [ (m)-[:IN_GENRE]->(g:Genre) | g.name ] AS genres,\n\
     count { (m)<-[:RATED]-(:User) } AS ratingCount"
}

/// Movies sharing at least one first-degree connection (genre, actor or
/// director) with the target, scored by how many connections they share,
/// scaled by rating.
pub fn similar_movies_cypher() -> &'static str {
    "MATCH (target:Movie {tmdbId: $movieId})-[:IN_GENRE|ACTED_IN|DIRECTED]-(shared)\
     -[:IN_GENRE|ACTED_IN|DIRECTED]-(m:Movie)\n\
     WHERE m <> target\n\
     WITH m, count(DISTINCT shared) AS inCommon\n\
     WITH m, inCommon * coalesce(m.imdbRating, 1.0) AS score\n\
     RETURN m, score\n\
     ORDER BY score DESC, m.title ASC\n\
     SKIP $skip LIMIT $limit"
}

/// Identifiers of the movies a user has favorited.
pub fn user_favorites_cypher() -> &'static str {
    "MATCH (:User {userId: $userId})-[:HAS_FAVORITE]->(m:Movie)\n\
     RETURN m.tmdbId AS tmdbId"
}
