//! Key-value records emitted by environments, agents and the trainer.
use crate::error::CampusError;
use std::collections::{
    hash_map::{Iter, Keys},
    HashMap,
};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically a metric like loss or reward.
    Scalar(f32),

    /// A 1-dimensional array, e.g., the reward sequence of an episode.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A container for storing key-value pairs of various data types.
///
/// ```rust
/// use campus_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("loss", 0.5);
/// record.insert("episode_reward", RecordValue::Scalar(48.0));
/// assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records, consuming both.
    ///
    /// Values of `record` overwrite values of `self` with the same key.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges another record into this one in place.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f32, CampusError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(CampusError::RecordValueTypeError("Scalar".to_string())),
            None => Err(CampusError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a scalar value, or `default` if the key is absent or not a scalar.
    pub fn get_scalar_or(&self, k: &str, default: f32) -> f32 {
        self.get_scalar(k).unwrap_or(default)
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, CampusError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(CampusError::RecordValueTypeError("Array1".to_string())),
            None => Err(CampusError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, CampusError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(CampusError::RecordValueTypeError("String".to_string())),
            None => Err(CampusError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns `true` if the record contains no key-value pairs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites() {
        let r1 = Record::from_slice(&[
            ("loss", RecordValue::Scalar(1.0)),
            ("name", RecordValue::String("a".into())),
        ]);
        let r2 = Record::from_scalar("loss", 2.0);
        let r = r1.merge(r2);
        assert_eq!(r.get_scalar("loss").unwrap(), 2.0);
        assert_eq!(r.get_string("name").unwrap(), "a");
    }

    #[test]
    fn test_typed_access_errors() {
        let r = Record::from_slice(&[("rewards", RecordValue::Array1(vec![1.0, 2.0]))]);
        assert_eq!(
            r.get_scalar("rewards"),
            Err(CampusError::RecordValueTypeError("Scalar".to_string()))
        );
        assert_eq!(
            r.get_scalar("missing"),
            Err(CampusError::RecordKeyError("missing".to_string()))
        );
        assert_eq!(r.get_array1("rewards").unwrap(), vec![1.0, 2.0]);
        assert_eq!(r.get_scalar_or("missing", 3.0), 3.0);
    }
}
