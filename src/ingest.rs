use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde::Deserialize;

use crate::model::{Stage, TaskRow, DEFAULT_SECTION, STATUS_TODO};

/// Separator used inside the `depends_on` and `tags` cells.
pub const LIST_SEPARATOR: char = '|';

/// Identity of a loaded data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub path: PathBuf,
}

impl DataSource {
    /// Canonicalizes `path` so the same file always maps to the same identity.
    pub fn new(path: &Path) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        Ok(Self { path })
    }

    /// Stable identity string used to namespace persisted state.
    pub fn identity(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// A CSV record before defaulting. Every column is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRow {
    id: String,
    title: String,
    section: String,
    stage: String,
    description: String,
    priority: String,
    depends_on: String,
    status: String,
    tags: String,
}

fn split_list(cell: &str) -> BTreeSet<String> {
    cell.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_or(cell: &str, default: &str) -> String {
    let cell = cell.trim();
    if cell.is_empty() {
        default.to_string()
    } else {
        cell.to_string()
    }
}

impl RawRow {
    fn into_row(self, line: u64) -> Option<TaskRow> {
        let id = self.id.trim();
        if id.is_empty() {
            warn!("line {line}: skipping row with empty id");
            return None;
        }
        let priority = match self.priority.trim() {
            "" => None,
            p => match p.parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    debug!("line {line}: ignoring non-numeric priority '{p}'");
                    None
                }
            },
        };
        Some(TaskRow {
            id: id.to_string(),
            title: self.title.trim().to_string(),
            section: non_empty_or(&self.section, DEFAULT_SECTION),
            stage: Stage::parse(&self.stage),
            description: self.description.trim().to_string(),
            priority,
            depends_on: split_list(&self.depends_on),
            tags: split_list(&self.tags),
            status: non_empty_or(&self.status, STATUS_TODO),
        })
    }
}

/// Parse task rows from CSV text with a header line.
///
/// Missing cells are defaulted; duplicate ids are rejected.
pub fn parse_reader<R: Read>(reader: R) -> Result<Vec<TaskRow>> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = csv.headers().context("failed to read header row")?.clone();

    let mut rows = Vec::new();
    let mut seen: HashMap<String, u64> = HashMap::new();
    let mut record = csv::StringRecord::new();
    while csv
        .read_record(&mut record)
        .context("failed to parse task data")?
    {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let raw: RawRow = record
            .deserialize(Some(&headers))
            .with_context(|| format!("line {line}: malformed record"))?;
        let Some(row) = raw.into_row(line) else {
            continue;
        };
        if let Some(first) = seen.insert(row.id.clone(), line) {
            bail!("duplicate task id '{}' on lines {first} and {line}", row.id);
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn parse_str(text: &str) -> Result<Vec<TaskRow>> {
    parse_reader(text.as_bytes())
}

/// Load rows from a CSV file on disk.
pub fn load_path(path: &Path) -> Result<(DataSource, Vec<TaskRow>)> {
    let source = DataSource::new(path)?;
    let file = std::fs::File::open(&source.path)
        .with_context(|| format!("failed to open {}", source.path.display()))?;
    let rows = parse_reader(file).with_context(|| format!("in {}", source.path.display()))?;
    Ok((source, rows))
}
