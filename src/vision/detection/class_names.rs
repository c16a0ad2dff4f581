// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class-index to label table

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Label used when a class index falls outside the table.
///
/// Clients key on this exact string; do not change it.
pub const FALLBACK_CLASS_NAME: &str = "caries";

/// Ordered class names, index `i` naming class `i`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load a table with one class name per line
    ///
    /// Blank lines are skipped; surrounding whitespace is trimmed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .context(format!("Failed to open class names: {}", path.display()))?;

        let mut names = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.context("Failed to read class names line")?;
            let name = line.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }

        Ok(Self { names })
    }

    /// Label for `index`, or [`FALLBACK_CLASS_NAME`] when out of range
    pub fn label(&self, index: i64) -> &str {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.names.len())
            .map(|i| self.names[i].as_str())
            .unwrap_or(FALLBACK_CLASS_NAME)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}
