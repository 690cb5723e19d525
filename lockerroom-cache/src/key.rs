//! Query keys.
//!
//! A key is an ordered tuple: the resource kind first, then scoping
//! parameters. Invalidation matches by prefix, so `["feed"]` reaches
//! `["feed", <user>]` and `["feed", <user>, "page", 2]`.

use lockerroom_core::EntityIdType;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Name(String),
    Id(Uuid),
    Num(i64),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Name(name) => f.write_str(name),
            KeyPart::Id(id) => write!(f, "{}", id),
            KeyPart::Num(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Start a key with the resource kind.
    pub fn new(resource: impl Into<String>) -> Self {
        Self(vec![KeyPart::Name(resource.into())])
    }

    pub fn name(mut self, part: impl Into<String>) -> Self {
        self.0.push(KeyPart::Name(part.into()));
        self
    }

    pub fn id<I: EntityIdType>(mut self, id: I) -> Self {
        self.0.push(KeyPart::Id(id.as_uuid()));
        self
    }

    pub fn uuid(mut self, id: Uuid) -> Self {
        self.0.push(KeyPart::Id(id));
        self
    }

    pub fn num(mut self, n: i64) -> Self {
        self.0.push(KeyPart::Num(n));
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn resource(&self) -> &str {
        match self.0.first() {
            Some(KeyPart::Name(name)) => name,
            _ => "",
        }
    }

    /// True when `prefix` is equal to, or a leading sub-tuple of, this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}
