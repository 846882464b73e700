// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class index to label mapping
//!
//! Names come from the `names` entry that Ultralytics embeds in exported ONNX
//! metadata (a Python dict literal such as `{0: 'person', 1: 'bicycle'}`), or
//! from a plain labels file with one name per line.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassNamesError {
    #[error("Invalid class names metadata: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid class index: {0}")]
    InvalidIndex(String),
    #[error("Class {0} has a non-string name")]
    InvalidName(usize),
}

/// Mapping from class index to human-readable label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNames {
    names: HashMap<usize, String>,
}

impl ClassNames {
    pub fn new(names: HashMap<usize, String>) -> Self {
        Self { names }
    }

    /// Build a dense mapping where each name's position is its index
    pub fn from_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .enumerate()
                .map(|(i, name)| (i, name.into()))
                .collect(),
        }
    }

    /// Load a labels file: one class name per line, blank lines ignored
    pub fn from_labels_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read labels file {}", path.display()))?;

        let names = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        Ok(Self::from_list(names))
    }

    /// Parse the `names` metadata value written by Ultralytics exporters
    ///
    /// The Python dict literal is a YAML flow mapping. Keys may also be quoted,
    /// so JSON objects like `{"0": "person"}` parse as well.
    pub fn from_ultralytics_metadata(raw: &str) -> std::result::Result<Self, ClassNamesError> {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(raw)?;

        let mut names = HashMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            let index = match &key {
                serde_yaml::Value::Number(n) => n.as_u64().map(|i| i as usize),
                serde_yaml::Value::String(s) => s.trim().parse::<usize>().ok(),
                _ => None,
            }
            .ok_or_else(|| ClassNamesError::InvalidIndex(format!("{:?}", key)))?;

            let name = match value {
                serde_yaml::Value::String(name) => name,
                _ => return Err(ClassNamesError::InvalidName(index)),
            };
            names.insert(index, name);
        }

        Ok(Self::new(names))
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(&index).map(String::as_str)
    }

    /// Resolve a label, falling back to the stringified index when unmapped
    pub fn label(&self, index: usize) -> String {
        match self.get(index) {
            Some(name) => name.to_string(),
            None => index.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
