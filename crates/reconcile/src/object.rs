//! Monitoring objects and their stable identifiers
//!
//! A monitoring object is anything a provider knows how to push to a backend
//! (a folder, an alert rule). The engine only needs two facts about it: which
//! kind of object it is and a key that identifies it within that kind.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Separator between the type name and the key of a stable identifier
pub const ID_SEPARATOR: char = '.';

/// Core trait for desired objects
///
/// Implementors are usually an enum over every object kind a deployment
/// manages, so that one `Monitor` can route all of them.
///
/// # Example
///
/// ```ignore
/// use reconcile::MonitoringObject;
///
/// #[derive(Debug, Clone, serde::Serialize)]
/// enum Grafana {
///     Folder { title: String },
///     Alert { folder: String, title: String, expr: String },
/// }
///
/// impl MonitoringObject for Grafana {
///     fn type_name(&self) -> &str {
///         match self {
///             Self::Folder { .. } => "Folder",
///             Self::Alert { .. } => "Alert",
///         }
///     }
///
///     fn local_key(&self) -> String {
///         match self {
///             Self::Folder { title } => title.clone(),
///             Self::Alert { folder, title, .. } => format!("{folder}/{title}"),
///         }
///     }
/// }
/// ```
pub trait MonitoringObject: Clone + fmt::Debug + Serialize + Send + Sync {
    /// Object kind, e.g. "Folder" or "Alert"
    ///
    /// Used to route the object to its provider and to namespace its key.
    fn type_name(&self) -> &str;

    /// Caller-assigned key, stable across runs and unique within the type
    fn local_key(&self) -> String;

    /// Stable identifier of this object: `"<TypeName>.<key>"`
    fn local_id(&self) -> Result<LocalId> {
        LocalId::new(self.type_name(), self.local_key())
    }
}

/// Whether two objects share a type (and therefore an identifier namespace)
pub fn is_same_type<O: MonitoringObject>(a: &O, b: &O) -> bool {
    a.type_name() == b.type_name()
}

/// Stable identifier of a monitoring object
///
/// The identifier is what the state store keys its mapping by. Type names
/// cannot contain the separator; keys can, since parsing splits at the first
/// separator only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId {
    type_name: String,
    key: String,
}

impl LocalId {
    /// Build an identifier from its parts
    pub fn new(type_name: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let type_name = type_name.into();
        let key = key.into();

        if type_name.is_empty() {
            return Err(Error::InvalidIdentifier {
                value: format!("{type_name}{ID_SEPARATOR}{key}"),
                reason: "type name is empty",
            });
        }
        if type_name.contains(ID_SEPARATOR) {
            return Err(Error::InvalidIdentifier {
                value: type_name,
                reason: "type name contains the '.' separator",
            });
        }
        if key.is_empty() {
            return Err(Error::InvalidIdentifier {
                value: format!("{type_name}{ID_SEPARATOR}"),
                reason: "key is empty",
            });
        }

        Ok(Self { type_name, key })
    }

    /// Parse a persisted identifier
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once(ID_SEPARATOR) {
            Some((type_name, key)) => Self::new(type_name, key),
            None => Err(Error::InvalidIdentifier {
                value: value.to_string(),
                reason: "missing '.' separator",
            }),
        }
    }

    /// The type name part
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The key part
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether both identifiers live in the same type namespace
    pub fn is_same_type(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.type_name, ID_SEPARATOR, self.key)
    }
}

impl Serialize for LocalId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for LocalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Primitive {
        key: String,
    }

    impl MonitoringObject for Primitive {
        fn type_name(&self) -> &str {
            "Primitive"
        }

        fn local_key(&self) -> String {
            self.key.clone()
        }
    }

    #[test]
    fn test_local_id_format() {
        let obj = Primitive { key: "foo".into() };
        assert_eq!(obj.local_id().unwrap().to_string(), "Primitive.foo");
    }

    #[test]
    fn test_empty_key_names_the_identifier() {
        let err = LocalId::new("Alert", "").unwrap_err();
        assert_eq!(err.to_string(), "invalid identifier \"Alert.\": key is empty");
    }

    #[test]
    fn test_round_trip() {
        for key in ["foo", "cpu-high", "a b c", "42"] {
            let id = LocalId::new("Primitive", key).unwrap();
            let parsed: LocalId = id.to_string().parse().unwrap();
            assert_eq!(parsed, id);
            assert_eq!(parsed.type_name(), "Primitive");
            assert_eq!(parsed.key(), key);
        }
    }

    #[test]
    fn test_key_with_separator_round_trips() {
        let id = LocalId::new("Alert", "infra.cpu.high").unwrap();
        assert_eq!(id.to_string(), "Alert.infra.cpu.high");

        let parsed = LocalId::parse("Alert.infra.cpu.high").unwrap();
        assert_eq!(parsed.type_name(), "Alert");
        assert_eq!(parsed.key(), "infra.cpu.high");
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(LocalId::new("", "foo").is_err());
        assert!(LocalId::new("Grafana.Alert", "foo").is_err());
        assert!(LocalId::new("Alert", "").is_err());
        assert!(LocalId::parse("no-separator").is_err());
        assert!(LocalId::parse(".foo").is_err());
    }

    #[test]
    fn test_same_type() {
        let a = LocalId::new("Folder", "ops").unwrap();
        let b = LocalId::new("Folder", "dev").unwrap();
        let c = LocalId::new("Alert", "ops").unwrap();
        assert!(a.is_same_type(&b));
        assert!(!a.is_same_type(&c));

        let x = Primitive { key: "x".into() };
        let y = Primitive { key: "y".into() };
        assert!(is_same_type(&x, &y));
    }
}
