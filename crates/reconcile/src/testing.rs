//! Shared test fixtures

use crate::object::MonitoringObject;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fixture {
    Primitive { key: String, name: String },
    Nested { key: String, items: Vec<String> },
    Folder { key: String, title: String },
    Alert {
        key: String,
        folder: String,
        uid: Option<String>,
    },
}

impl Fixture {
    pub fn primitive(key: &str, name: &str) -> Self {
        Self::Primitive {
            key: key.into(),
            name: name.into(),
        }
    }

    pub fn nested(key: &str, items: &[&str]) -> Self {
        Self::Nested {
            key: key.into(),
            items: items.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn folder(key: &str, title: &str) -> Self {
        Self::Folder {
            key: key.into(),
            title: title.into(),
        }
    }

    pub fn alert(key: &str, folder: &str) -> Self {
        Self::Alert {
            key: key.into(),
            folder: folder.into(),
            uid: None,
        }
    }
}

impl MonitoringObject for Fixture {
    fn type_name(&self) -> &str {
        match self {
            Self::Primitive { .. } => "Primitive",
            Self::Nested { .. } => "Nested",
            Self::Folder { .. } => "Folder",
            Self::Alert { .. } => "Alert",
        }
    }

    fn local_key(&self) -> String {
        match self {
            Self::Primitive { key, .. }
            | Self::Nested { key, .. }
            | Self::Folder { key, .. }
            | Self::Alert { key, .. } => key.clone(),
        }
    }
}
