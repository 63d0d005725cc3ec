//! Placeholder substitution for typesetting templates
//!
//! Templates are plain text with fixed `XX...XX` tokens. Substitution is
//! single-pass: text inserted for one token is never scanned for others, so
//! a paper title that happens to contain a token survives unchanged.

use std::path::Path;

use crate::error::{Error, Result};

pub const START_PAGE: &str = "XXStartPageXX";
pub const AUTHORS: &str = "XXAuthorsXX";
pub const TITLE: &str = "XXTitleXX";
pub const PAGE_RANGE: &str = "XXPageRangeXX";
pub const INSERT_PAGES: &str = "XXInsertPagesXX";
pub const INSERT_TOC_ENTRIES: &str = "XXInsertTocEntriesXX";

/// Ordered token → value pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitutions {
    pairs: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the value for `token`
    pub fn set(&mut self, token: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let token = token.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(t, _)| *t == token) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((token, value)),
        }
        self
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }
}

/// A text template with placeholder tokens
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read a template from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    /// Whether the template mentions `token` at all
    pub fn contains(&self, token: &str) -> bool {
        self.text.contains(token)
    }

    /// Replace every token occurrence with its value
    pub fn render(&self, subs: &Substitutions) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        loop {
            let next = subs
                .iter()
                .filter(|(token, _)| !token.is_empty())
                .filter_map(|(token, value)| rest.find(token).map(|pos| (pos, token, value)))
                .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, token, value)) => {
                    out.push_str(&rest[..pos]);
                    out.push_str(value);
                    rest = &rest[pos + token.len()..];
                }
                None => {
                    out.push_str(rest);
                    break;
                }
            }
        }

        out
    }
}
