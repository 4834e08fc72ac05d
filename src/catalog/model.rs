use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Duration;

/// Attribute names the service itself writes onto records. All other
/// attribute names come straight from the graph.
pub const FIELD_TMDB_ID: &str = "tmdbId";
pub const FIELD_FAVORITE: &str = "favorite";
pub const FIELD_SCORE: &str = "score";
pub const FIELD_RATING_COUNT: &str = "ratingCount";
pub const FIELD_CAST: &str = "cast";
pub const FIELD_DIRECTORS: &str = "directors";
pub const FIELD_GENRES: &str = "genres";

/// A single movie attribute value. The attribute set is open-ended, the
/// value kinds are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Ordering between values of the same kind. Integers and floats
    /// compare across kinds; everything else mixed-kind is unordered.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        use FieldValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        FieldValue::List(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value.into_iter().map(FieldValue::Text).collect())
    }
}

/// One movie as returned by the catalog: attribute names mapped to values,
/// in insertion order. Serializes to a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieRecord {
    fields: Vec<(String, FieldValue)>,
}

impl MovieRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute. An existing attribute is replaced in place so its
    /// position in the record is stable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n.as_str() == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n.as_str() == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// The external identifier, when the record carries one.
    pub fn tmdb_id(&self) -> Option<&str> {
        self.get(FIELD_TMDB_ID).and_then(FieldValue::as_str)
    }

    /// Write the derived `favorite` flag: true iff this record's identifier
    /// is in the resolved favorite set.
    pub fn apply_favorite(&mut self, favorites: &HashSet<String>) {
        let favorite = match self.tmdb_id() {
            Some(id) => favorites.contains(id),
            None => false,
        };
        self.insert(FIELD_FAVORITE, favorite);
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for MovieRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Graph error: {0}")]
    Graph(#[from] neo4rs::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Malformed record: {0}")]
    Malformed(String),
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_json() {
        assert_eq!(FieldValue::from("Inception").to_json(), serde_json::json!("Inception"));
        assert_eq!(FieldValue::from(2010i64).to_json(), serde_json::json!(2010));
        assert_eq!(FieldValue::from(8.8f64).to_json(), serde_json::json!(8.8));
        assert_eq!(FieldValue::from(true).to_json(), serde_json::json!(true));
        let date = NaiveDate::from_ymd_opt(2010, 7, 16).unwrap();
        assert_eq!(FieldValue::from(date).to_json(), serde_json::json!("2010-07-16"));
        let list = FieldValue::from(vec!["Leonardo DiCaprio".to_string(), "Elliot Page".to_string()]);
        assert_eq!(
            list.to_json(),
            serde_json::json!(["Leonardo DiCaprio", "Elliot Page"])
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = MovieRecord::new();
        record.insert("title", "Inception");
        record.insert("year", 2010i64);
        record.insert("title", "The Matrix");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("title").and_then(FieldValue::as_str), Some("The Matrix"));
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["title", "year"]);
    }

    #[test]
    fn test_serializes_in_field_order() {
        let mut record = MovieRecord::new();
        record.insert("title", "Inception");
        record.insert("year", 2010i64);
        record.insert("favorite", false);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"title":"Inception","year":2010,"favorite":false}"#);
    }

    #[test]
    fn test_apply_favorite() {
        let favorites: HashSet<String> = ["100".to_string()].into_iter().collect();

        let mut record = MovieRecord::new();
        record.insert(FIELD_TMDB_ID, "100");
        record.apply_favorite(&favorites);
        assert_eq!(record.get(FIELD_FAVORITE).and_then(FieldValue::as_bool), Some(true));

        let mut other = MovieRecord::new();
        other.insert(FIELD_TMDB_ID, "200");
        other.apply_favorite(&favorites);
        assert_eq!(other.get(FIELD_FAVORITE).and_then(FieldValue::as_bool), Some(false));

        // No identifier means the flag is present and false.
        let mut anonymous = MovieRecord::new();
        anonymous.insert("title", "Unknown");
        anonymous.apply_favorite(&favorites);
        assert_eq!(anonymous.get(FIELD_FAVORITE).and_then(FieldValue::as_bool), Some(false));
    }

    #[test]
    fn test_compare_across_numeric_kinds() {
        let two = FieldValue::Integer(2);
        let half_past = FieldValue::Float(2.5);
        assert_eq!(two.compare(&half_past), Some(Ordering::Less));
        assert_eq!(half_past.compare(&two), Some(Ordering::Greater));
        assert_eq!(two.compare(&FieldValue::from("2")), None);
    }
}
