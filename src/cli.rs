use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "depflow", about = "Dependency flowchart for CSV task lists")]
pub struct Cli {
    /// Path to the SQLite database holding saved statuses [default: ~/.depflow/depflow.db]
    #[arg(long, env = "DEPFLOW_DB", global = true)]
    pub db: Option<String>,

    /// Path to the config file [default: ~/.depflow/config.toml]
    #[arg(long, env = "DEPFLOW_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Filters shared by every command that shows a subset of rows.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Case-insensitive text search over title, description, section, stage and tags
    #[arg(long)]
    pub search: Option<String>,
    /// Status filter (all, todo, done)
    #[arg(long)]
    pub status: Option<String>,
    /// Stage to show (repeatable; replaces the default Setup/Start/Early/Late)
    #[arg(long = "stage")]
    pub stages: Vec<String>,
    /// Section to show (repeatable; default: every section)
    #[arg(long = "section")]
    pub sections: Vec<String>,
    /// Tag to require (repeatable; a row matches if it has any of them)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Only rows whose dependencies are all done
    #[arg(long)]
    pub actionable: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Open the interactive flowchart
    View {
        /// CSV task list
        csv: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Layout direction (LR, TB)
        #[arg(long)]
        direction: Option<String>,
        /// Input poll interval in milliseconds
        #[arg(long)]
        poll_interval: Option<u64>,
    },

    /// List visible rows
    List {
        /// CSV task list
        csv: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the laid-out graph as JSON
    Graph {
        /// CSV task list
        csv: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Layout direction (LR, TB)
        #[arg(long)]
        direction: Option<String>,
    },

    /// List rows that can be started now
    Actionable {
        /// CSV task list
        csv: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one row with its blockers and dependents
    Show {
        /// CSV task list
        csv: PathBuf,
        /// Task id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark a task as done
    Done {
        /// CSV task list
        csv: PathBuf,
        /// Task id
        id: String,
    },

    /// Mark a task as not done
    Reopen {
        /// CSV task list
        csv: PathBuf,
        /// Task id
        id: String,
    },

    /// Forget every saved status for a CSV file
    Reset {
        /// CSV task list
        csv: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repeatable_filters() {
        let cli = Cli::try_parse_from([
            "depflow", "list", "tasks.csv", "--stage", "setup", "--stage", "late", "--tag", "ui",
            "--actionable",
        ])
        .unwrap();
        match cli.command {
            Command::List { filter, json, .. } => {
                assert_eq!(filter.stages, vec!["setup", "late"]);
                assert_eq!(filter.tags, vec!["ui"]);
                assert!(filter.actionable);
                assert!(!json);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn global_db_flag() {
        let cli =
            Cli::try_parse_from(["depflow", "done", "t.csv", "a", "--db", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.db.as_deref(), Some("/tmp/x.db"));
    }
}
