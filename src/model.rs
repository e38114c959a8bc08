use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

pub const STATUS_DONE: &str = "done";
pub const STATUS_TODO: &str = "todo";

pub const DEFAULT_SECTION: &str = "General";

/// Status string written back when a row's completion is toggled.
pub fn status_for(done: bool) -> &'static str {
    if done {
        STATUS_DONE
    } else {
        STATUS_TODO
    }
}

/// Coarse lifecycle bucket for a task.
///
/// The four named stages sort in lifecycle order, followed by `Unsorted`
/// and then any unrecognized stage text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Setup,
    Start,
    Early,
    Late,
    Unsorted,
    Other(String),
}

impl Stage {
    /// The stages selected by default when a view starts.
    pub const ALL: [Stage; 4] = [Stage::Setup, Stage::Start, Stage::Early, Stage::Late];

    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "" | "unsorted" => Self::Unsorted,
            "setup" => Self::Setup,
            "start" => Self::Start,
            "early" => Self::Early,
            "late" => Self::Late,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Setup => "Setup",
            Self::Start => "Start",
            Self::Early => "Early",
            Self::Late => "Late",
            Self::Unsorted => "Unsorted",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One task from the data source.
///
/// `status` is kept verbatim for display; only `"done"` counts as complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub section: String,
    pub stage: Stage,
    pub description: String,
    pub priority: Option<u32>,
    pub depends_on: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub status: String,
}

impl TaskRow {
    /// A row with every optional field defaulted.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: String::new(),
            section: DEFAULT_SECTION.to_string(),
            stage: Stage::Unsorted,
            description: String::new(),
            priority: None,
            depends_on: BTreeSet::new(),
            tags: BTreeSet::new(),
            status: STATUS_TODO.to_string(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == STATUS_DONE
    }

    /// Returns display icon: x=done, .=anything else
    pub fn icon(&self) -> &'static str {
        if self.is_done() {
            "x"
        } else {
            "."
        }
    }

    /// Title, or the id when the title is blank.
    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    /// Lower-cased text searched by the free-text filter.
    pub fn search_haystack(&self) -> String {
        let mut parts: Vec<&str> = vec![
            &self.title,
            &self.description,
            &self.section,
            self.stage.as_str(),
        ];
        parts.extend(self.tags.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }
}
