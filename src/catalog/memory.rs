use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{self, AtomicUsize};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::CatalogConfig;

use super::model::*;
use super::query::{MovieQuery, MovieSort, SortOrder};
use super::repo::*;

#[derive(Default)]
struct MemoryState {
    movies: Vec<MovieRecord>,
    // movie id -> (person id, person name)
    cast: HashMap<String, Vec<(String, String)>>,
    directors: HashMap<String, Vec<(String, String)>>,
    ratings: HashMap<String, i64>,
    favorites: HashMap<String, HashSet<String>>,
}

/// In-memory catalog implementing the same contract as the graph-backed
/// one. Used by the test suite and suitable for small embedded catalogs.
/// Genre links are kept as a `genres` list attribute on the record.
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
    catalog: CatalogConfig,
    favorite_reads: AtomicUsize,
}

impl MemoryRepository {
    pub fn new(catalog: CatalogConfig) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            catalog,
            favorite_reads: AtomicUsize::new(0),
        }
    }

    /// Add a movie, replacing any existing record with the same identifier.
    pub async fn insert_movie(&self, record: MovieRecord) {
        let mut state = self.state.write().await;
        let id = record.tmdb_id().map(str::to_string);
        if let Some(id) = id {
            if let Some(slot) = state
                .movies
                .iter_mut()
                .find(|existing| existing.tmdb_id() == Some(id.as_str()))
            {
                *slot = record;
                return;
            }
        }
        state.movies.push(record);
    }

    pub async fn link_actor(&self, movie_id: &str, person_id: &str, name: &str) {
        let mut state = self.state.write().await;
        state
            .cast
            .entry(movie_id.to_string())
            .or_default()
            .push((person_id.to_string(), name.to_string()));
    }

    pub async fn link_director(&self, movie_id: &str, person_id: &str, name: &str) {
        let mut state = self.state.write().await;
        state
            .directors
            .entry(movie_id.to_string())
            .or_default()
            .push((person_id.to_string(), name.to_string()));
    }

    pub async fn add_rating(&self, movie_id: &str) {
        let mut state = self.state.write().await;
        *state.ratings.entry(movie_id.to_string()).or_insert(0) += 1;
    }

    pub async fn add_favorite(&self, user_id: &str, movie_id: &str) {
        let mut state = self.state.write().await;
        state
            .favorites
            .entry(user_id.to_string())
            .or_default()
            .insert(movie_id.to_string());
    }

    pub async fn remove_favorite(&self, user_id: &str, movie_id: &str) {
        let mut state = self.state.write().await;
        if let Some(set) = state.favorites.get_mut(user_id) {
            set.remove(movie_id);
        }
    }

    /// How many favorite-set resolutions have been performed. Anonymous
    /// listings never perform one.
    pub fn favorite_reads(&self) -> usize {
        self.favorite_reads.load(atomic::Ordering::Relaxed)
    }

    async fn resolve_favorites(&self, user_id: Option<&str>) -> CatalogResult<HashSet<String>> {
        match user_id {
            Some(id) => self.user_favorites(id).await,
            None => Ok(HashSet::new()),
        }
    }

    async fn listing(
        &self,
        params: &MovieQuery,
        accept: impl Fn(&MemoryState, &MovieRecord) -> bool + Send,
    ) -> CatalogResult<Vec<MovieRecord>> {
        let (skip, limit) = params.window(&self.catalog);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let favorites = self.resolve_favorites(params.user_id.as_deref()).await?;
        let state = self.state.read().await;

        let mut selected = Vec::new();
        for record in &state.movies {
            if !record.contains(params.sort.property()) {
                continue;
            }
            if !accept(&state, record) {
                continue;
            }
            selected.push(record.clone());
        }

        sort_records(&mut selected, params.sort, params.order);

        let mut page: Vec<MovieRecord> = selected
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();
        for record in &mut page {
            record.apply_favorite(&favorites);
        }
        Ok(page)
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

#[async_trait]
impl MovieRepo for MemoryRepository {
    async fn list_movies(&self, params: &MovieQuery) -> CatalogResult<Vec<MovieRecord>> {
        self.listing(params, |_, _| true).await
    }

    async fn movies_by_genre(
        &self,
        genre: &str,
        params: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>> {
        self.listing(params, |_, record| has_genre(record, genre))
            .await
    }

    async fn movies_for_actor(
        &self,
        person_id: &str,
        params: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>> {
        self.listing(params, |state, record| {
            linked(&state.cast, record, person_id)
        })
        .await
    }

    async fn movies_for_director(
        &self,
        person_id: &str,
        params: &MovieQuery,
    ) -> CatalogResult<Vec<MovieRecord>> {
        self.listing(params, |state, record| {
            linked(&state.directors, record, person_id)
        })
        .await
    }

    async fn movie_by_id(
        &self,
        movie_id: &str,
        user_id: Option<&str>,
    ) -> CatalogResult<MovieRecord> {
        let favorites = self.resolve_favorites(user_id).await?;
        let state = self.state.read().await;

        let mut record = state
            .movies
            .iter()
            .find(|record| record.tmdb_id() == Some(movie_id))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("Movie not found: {}", movie_id)))?;

        record.insert(FIELD_CAST, names(&state.cast, movie_id));
        record.insert(FIELD_DIRECTORS, names(&state.directors, movie_id));
        if !record.contains(FIELD_GENRES) {
            record.insert(FIELD_GENRES, FieldValue::List(Vec::new()));
        }
        record.insert(
            FIELD_RATING_COUNT,
            state.ratings.get(movie_id).copied().unwrap_or(0),
        );
        record.apply_favorite(&favorites);

        Ok(record)
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

        let state = self.state.read().await;
        let target = match state
            .movies
            .iter()
            .find(|record| record.tmdb_id() == Some(movie_id))
        {
            Some(target) => target,
            // An unknown target is an empty listing, same as the graph
            // backend where the match simply yields no rows.
            None => return Ok(Vec::new()),
        };
        let target_connections = connections(&state, movie_id, target);

        let mut scored: Vec<(f64, MovieRecord)> = Vec::new();
        for record in &state.movies {
            let id = match record.tmdb_id() {
                Some(id) => id,
                None => continue,
            };
            if id == movie_id {
                continue;
            }
            let shared = connections(&state, id, record)
                .intersection(&target_connections)
                .count();
            if shared == 0 {
                continue;
            }
            let rating = record
                .get("imdbRating")
                .and_then(FieldValue::as_f64)
                .unwrap_or(1.0);
            let score = shared as f64 * rating;
            let mut entry = record.clone();
            entry.insert(FIELD_SCORE, score);
            scored.push((score, entry));
        }

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| title(&a.1).cmp(title(&b.1)))
        });

        let page = scored
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|(_, record)| record)
            .collect();
        Ok(page)
    }
}

#[async_trait]
impl FavoriteRepo for MemoryRepository {
    async fn user_favorites(&self, user_id: &str) -> CatalogResult<HashSet<String>> {
        self.favorite_reads.fetch_add(1, atomic::Ordering::Relaxed);
        let state = self.state.read().await;
        Ok(state.favorites.get(user_id).cloned().unwrap_or_default())
    }
}

fn sort_records(records: &mut [MovieRecord], sort: MovieSort, order: SortOrder) {
    let property = sort.property();
    records.sort_by(|a, b| {
        let ordering = match (a.get(property), b.get(property)) {
            (Some(a_val), Some(b_val)) => a_val.compare(b_val).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if order.is_descending() {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn has_genre(record: &MovieRecord, genre: &str) -> bool {
    match record.get(FIELD_GENRES) {
        Some(FieldValue::List(values)) => values.iter().any(|value| value.as_str() == Some(genre)),
        _ => false,
    }
}

fn linked(
    links: &HashMap<String, Vec<(String, String)>>,
    record: &MovieRecord,
    person_id: &str,
) -> bool {
    match record.tmdb_id() {
        Some(movie_id) => links
            .get(movie_id)
            .map(|people| people.iter().any(|(id, _)| id == person_id))
            .unwrap_or(false),
        None => false,
    }
}

fn names(links: &HashMap<String, Vec<(String, String)>>, movie_id: &str) -> Vec<String> {
    links
        .get(movie_id)
        .map(|people| people.iter().map(|(_, name)| name.clone()).collect())
        .unwrap_or_default()
}

fn title(record: &MovieRecord) -> &str {
    record
        .get("title")
        .and_then(FieldValue::as_str)
        .unwrap_or("")
}

/// The connection keys a movie shares similarity through: its genres and
/// the people who acted in or directed it. A person linked both ways
/// counts once, as in the graph.
fn connections(state: &MemoryState, movie_id: &str, record: &MovieRecord) -> HashSet<String> {
    let mut set = HashSet::new();
    if let Some(FieldValue::List(values)) = record.get(FIELD_GENRES) {
        for value in values {
            if let Some(name) = value.as_str() {
                set.insert(format!("genre:{}", name));
            }
        }
    }
    if let Some(people) = state.cast.get(movie_id) {
        for (person_id, _) in people {
            set.insert(format!("person:{}", person_id));
        }
    }
    if let Some(people) = state.directors.get(movie_id) {
        for (person_id, _) in people {
            set.insert(format!("person:{}", person_id));
        }
    }
    set
}
