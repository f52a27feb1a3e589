/// Department keyword map, loaded once per run and immutable afterwards.
///
/// Input is a two-column CSV (`Department,Keywords`) where the keyword cell
/// is itself comma-separated. Unquoted cells that spill into extra columns
/// are accepted: every field after the first is treated as keyword text.
use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// A normalized keyword phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    /// Normalized phrase: lowercase words joined by single spaces.
    pub phrase: String,
    /// The phrase split into words (at least one).
    pub words: Vec<String>,
}

impl Keyword {
    /// Build a keyword from raw text, returning `None` if nothing remains
    /// after normalization.
    pub fn parse(raw: &str) -> Option<Self> {
        let phrase = normalize_phrase(raw);
        if phrase.is_empty() {
            return None;
        }
        let words = phrase.split(' ').map(str::to_owned).collect();
        Some(Self { phrase, words })
    }

    #[inline]
    pub fn is_multi_word(&self) -> bool {
        self.words.len() > 1
    }
}

/// A department and its ordered, de-duplicated keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub name: String,
    pub keywords: Vec<Keyword>,
}

/// Department name → ordered keyword set. Departments keep input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMap {
    departments: Vec<Department>,
}

/// Separators that split names and keywords into words.
///
/// Underscores are equivalent to spaces, hyphens, dots and path separators.
#[inline]
pub fn is_token_separator(c: char) -> bool {
    matches!(c, '_' | '-' | '.' | '/' | '\\') || c.is_whitespace()
}

/// Lowercase `raw`, turn every separator run into one space, and trim.
pub fn normalize_phrase(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        if is_token_separator(c) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(c.to_lowercase());
    }
    out
}

impl KeywordMap {
    /// Build a map from `(department, keywords)` pairs.
    ///
    /// Repeated departments are merged; duplicate and empty keywords dropped.
    pub fn from_pairs<I, D, K, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, K)>,
        D: AsRef<str>,
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::default();
        for (dept, keywords) in pairs {
            map.insert(dept.as_ref(), keywords);
        }
        map
    }

    fn insert<K, S>(&mut self, department: &str, keywords: K)
    where
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = department.trim();
        if name.is_empty() {
            return;
        }
        let pos = match self.departments.iter().position(|d| d.name == name) {
            Some(pos) => {
                debug!("Merging repeated keyword row for department {name}");
                pos
            }
            None => {
                self.departments.push(Department {
                    name: name.to_owned(),
                    keywords: Vec::new(),
                });
                self.departments.len() - 1
            }
        };
        let dept = &mut self.departments[pos];
        for raw in keywords {
            if let Some(kw) = Keyword::parse(raw.as_ref()) {
                if !dept.keywords.iter().any(|k| k.phrase == kw.phrase) {
                    dept.keywords.push(kw);
                }
            }
        }
    }

    /// Parse the `Department,Keywords` CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut map = Self::default();
        for (line, row) in rdr.records().enumerate() {
            let row = row?;
            let Some(dept) = row.get(0).filter(|d| !d.is_empty()) else {
                warn!("Keyword row {} has no department name; skipped", line + 2);
                continue;
            };
            let keywords: Vec<&str> = row
                .iter()
                .skip(1)
                .flat_map(|cell| cell.split(','))
                .collect();
            map.insert(dept, keywords);
        }

        map.departments.retain(|d| {
            if d.keywords.is_empty() {
                warn!("Department {} has no usable keywords; ignored", d.name);
            }
            !d.keywords.is_empty()
        });

        if map.departments.is_empty() {
            return Err(Error::Keywords(
                "keyword map contains no departments with keywords".into(),
            ));
        }
        Ok(map)
    }

    /// Load the keyword CSV from disk. A missing file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Keywords(format!("cannot open keyword file {}: {e}", path.display()))
        })?;
        Self::from_reader(file)
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }
}
