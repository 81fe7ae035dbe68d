//! Payload extraction from caller-supplied field maps.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

/// An allow-listed field mapping used to create or update a record.
pub type Payload = Map<String, Value>;

/// Anything that can hand out a subset of its fields.
pub trait PayloadSource {
    /// Returns the listed fields that are present, in the order given.
    fn only(&self, fields: &[&str]) -> Payload;
}

impl PayloadSource for Map<String, Value> {
    fn only(&self, fields: &[&str]) -> Payload {
        pick(fields, |field| self.get(field))
    }
}

impl PayloadSource for Value {
    fn only(&self, fields: &[&str]) -> Payload {
        match self {
            Value::Object(map) => map.only(fields),
            _ => Payload::new(),
        }
    }
}

impl<S: std::hash::BuildHasher> PayloadSource for HashMap<String, Value, S> {
    fn only(&self, fields: &[&str]) -> Payload {
        pick(fields, |field| self.get(field))
    }
}

impl PayloadSource for BTreeMap<String, Value> {
    fn only(&self, fields: &[&str]) -> Payload {
        pick(fields, |field| self.get(field))
    }
}

fn pick<'a>(fields: &[&str], get: impl Fn(&str) -> Option<&'a Value>) -> Payload {
    fields
        .iter()
        .filter_map(|field| get(field).map(|value| (field.to_string(), value.clone())))
        .collect()
}
