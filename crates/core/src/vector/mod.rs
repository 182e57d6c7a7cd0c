//! Vector data: occurrence points and analysis regions

mod region;

pub use region::Region;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Parse a text field: empty -> `Null`, then integer, float, bool, string
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return AttributeValue::Null;
        }
        if let Ok(v) = text.parse::<i64>() {
            return AttributeValue::Int(v);
        }
        if let Ok(v) = text.parse::<f64>() {
            return AttributeValue::Float(v);
        }
        match text {
            "true" | "TRUE" | "True" => AttributeValue::Bool(true),
            "false" | "FALSE" | "False" => AttributeValue::Bool(false),
            _ => AttributeValue::String(text.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(v) => f.write_str(v),
        }
    }
}

/// One species occurrence: a location (longitude/latitude or projected x/y)
/// with optional attributes such as the observation date.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub x: f64,
    pub y: f64,
    pub properties: BTreeMap<String, AttributeValue>,
}

impl Occurrence {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    pub fn has_finite_location(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Ordered collection of occurrences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    occurrences: Vec<Occurrence>,
}

impl PointSet {
    pub fn new() -> Self {
        Self {
            occurrences: Vec::new(),
        }
    }

    /// Attribute-free points from `(x, y)` pairs
    pub fn from_coords<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        coords.into_iter().map(|(x, y)| Occurrence::new(x, y)).collect()
    }

    pub fn push(&mut self, occurrence: Occurrence) {
        self.occurrences.push(occurrence);
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Occurrence> {
        self.occurrences.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter()
    }

    pub fn coords(&self) -> Vec<(f64, f64)> {
        self.occurrences.iter().map(|o| (o.x, o.y)).collect()
    }

    /// Sorted union of attribute keys across all occurrences
    pub fn attribute_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .occurrences
            .iter()
            .flat_map(|o| o.properties.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl FromIterator<Occurrence> for PointSet {
    fn from_iter<I: IntoIterator<Item = Occurrence>>(iter: I) -> Self {
        Self {
            occurrences: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PointSet {
    type Item = Occurrence;
    type IntoIter = std::vec::IntoIter<Occurrence>;

    fn into_iter(self) -> Self::IntoIter {
        self.occurrences.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_parse() {
        assert_eq!(AttributeValue::parse(""), AttributeValue::Null);
        assert_eq!(AttributeValue::parse("2004"), AttributeValue::Int(2004));
        assert_eq!(AttributeValue::parse("3.5"), AttributeValue::Float(3.5));
        assert_eq!(AttributeValue::parse("true"), AttributeValue::Bool(true));
        assert_eq!(
            AttributeValue::parse("2004-06-01"),
            AttributeValue::String("2004-06-01".into())
        );
    }

    #[test]
    fn test_point_set() {
        let mut points = PointSet::from_coords([(-40.0, 30.0), (-41.0, 31.0)]);
        points.push(Occurrence::new(-42.0, 32.0).with_property("year", AttributeValue::Int(2005)));
        assert_eq!(points.len(), 3);
        assert_eq!(points.attribute_keys(), vec!["year".to_string()]);
        assert_eq!(points.get(2).unwrap().get_property("year"), Some(&AttributeValue::Int(2005)));
    }
}
