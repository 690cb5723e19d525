//! Choice options for single/multi-choice and dropdown fields.
//!
//! The API has historically sent options either as a JSON array or as a
//! string holding a JSON-encoded array. Both shapes are decoded here, once,
//! into [`ChoiceOptions`]; nothing downstream sees the raw form.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChoiceOptions(Vec<String>);

impl ChoiceOptions {
    pub fn new(options: Vec<String>) -> Self {
        Self(options)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|o| o == value)
    }

    pub fn push(&mut self, option: impl Into<String>) {
        self.0.push(option.into());
    }

    /// Remove the option at `index`, returning it if the index was valid.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.0.len() {
            Some(self.0.remove(index))
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut String> {
        self.0.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl From<Vec<String>> for ChoiceOptions {
    fn from(options: Vec<String>) -> Self {
        Self(options)
    }
}

impl<'a> From<&[&'a str]> for ChoiceOptions {
    fn from(options: &[&'a str]) -> Self {
        Self(options.iter().map(|s| s.to_string()).collect())
    }
}

struct ChoiceOptionsVisitor;

impl<'de> Visitor<'de> for ChoiceOptionsVisitor {
    type Value = ChoiceOptions;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of strings or a JSON-encoded array of strings")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut options = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(option) = seq.next_element::<String>()? {
            options.push(option);
        }
        Ok(ChoiceOptions(options))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(ChoiceOptions::default());
        }
        serde_json::from_str::<Vec<String>>(trimmed)
            .map(ChoiceOptions)
            .map_err(|e| E::custom(format!("options string is not a JSON array: {}", e)))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(ChoiceOptions::default())
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(ChoiceOptions::default())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ChoiceOptionsVisitor)
    }
}

impl<'de> Deserialize<'de> for ChoiceOptions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ChoiceOptionsVisitor)
    }
}
