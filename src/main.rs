mod cli;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, LevelFilter};

use cli::{Cli, Command, FilterArgs};
use depflow::config::Config;
use depflow::filter::{FilterState, StatusFilter};
use depflow::ingest::{self, DataSource};
use depflow::layout::Direction;
use depflow::model::{Stage, TaskRow};
use depflow::output::{self, GraphExport, TaskDetail};
use depflow::persist::{SqliteKv, StatusOverrides};
use depflow::pipeline::Session;
use depflow::store::RowStore;
use depflow::{closure, tui};

const LOG_ENV: &str = "DEPFLOW_LOG";

fn depflow_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".depflow"))
}

fn resolve_db_path(cli_db: Option<String>) -> Result<String> {
    match cli_db {
        Some(p) => Ok(p),
        None => {
            let path = depflow_dir()?.join("depflow.db");
            Ok(path
                .to_str()
                .context("default DB path is not valid UTF-8")?
                .to_string())
        }
    }
}

/// Log to stderr, or to `~/.depflow/depflow.log` while the TUI owns the
/// terminal. `DEPFLOW_LOG` overrides the default `warn` level.
fn setup_logging(to_file: bool) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .parse_env(LOG_ENV)
        .format_timestamp_secs();

    if to_file {
        let dir = depflow_dir()?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("depflow.log"))
            .context("failed to open log file")?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn open_overrides(db_path: &str, source: &DataSource) -> Result<StatusOverrides> {
    let kv = SqliteKv::open(db_path)?;
    Ok(StatusOverrides::new(Box::new(kv), &source.identity()))
}

/// Start from the default filters and apply whatever flags were given.
fn build_filter(store: &RowStore, args: &FilterArgs) -> Result<FilterState> {
    let mut filter = FilterState::new(store);
    if let Some(q) = &args.search {
        filter.query = q.clone();
    }
    if let Some(s) = &args.status {
        filter.status = StatusFilter::parse(s)?;
    }
    if !args.stages.is_empty() {
        filter.stages = args.stages.iter().map(|s| Stage::parse(s)).collect();
    }
    if !args.sections.is_empty() {
        let known = store.sections();
        for section in &args.sections {
            if !known.contains(section) {
                bail!("unknown section '{section}'");
            }
        }
        filter.sections = args.sections.iter().cloned().collect();
    }
    filter.tags = args.tags.iter().cloned().collect();
    filter.actionable_only = args.actionable;
    Ok(filter)
}

struct Loaded {
    source: DataSource,
    session: Session,
}

fn load(csv: &Path, db_path: &str, config: &Config, direction: Option<&str>) -> Result<Loaded> {
    let (source, rows) = ingest::load_path(csv)?;
    debug!("loaded {} rows from {}", rows.len(), source.path.display());
    let overrides = open_overrides(db_path, &source)?;
    let direction = match direction {
        Some(d) => Direction::parse(d)?,
        None => config.direction()?,
    };
    let session = Session::open(rows, Some(overrides), direction, config.layout_config())?;
    Ok(Loaded { source, session })
}

fn load_filtered(
    csv: &Path,
    db_path: &str,
    config: &Config,
    filter: &FilterArgs,
    direction: Option<&str>,
) -> Result<Loaded> {
    let mut loaded = load(csv, db_path, config, direction)?;
    let filter = build_filter(loaded.session.store(), filter)?;
    loaded.session.set_filter(filter);
    Ok(loaded)
}

fn find_row<'a>(session: &'a Session, id: &str) -> Result<&'a TaskRow> {
    session
        .store()
        .get(id)
        .with_context(|| format!("task '{id}' not found"))
}

fn set_status(csv: &Path, db_path: &str, config: &Config, id: &str, done: bool) -> Result<bool> {
    let mut loaded = load(csv, db_path, config, None)?;
    loaded.session.commit_done(id, done)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(matches!(cli.command, Command::View { .. }))?;
    let db_path = resolve_db_path(cli.db)?;
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::View {
            csv,
            filter,
            direction,
            poll_interval,
        } => {
            let loaded = load_filtered(&csv, &db_path, &config, &filter, direction.as_deref())?;
            let poll = poll_interval.unwrap_or_else(|| config.poll_interval());
            tui::run(&loaded.source, loaded.session, poll)?;
        }

        Command::List { csv, filter, json } => {
            let loaded = load_filtered(&csv, &db_path, &config, &filter, None)?;
            let session = &loaded.session;
            let visible: Vec<&TaskRow> = session
                .snapshot()
                .visible
                .iter()
                .filter_map(|id| session.store().get(id))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                print!("{}", output::format_task_list(&visible, &session.snapshot().closure));
            }
        }

        Command::Graph {
            csv,
            filter,
            direction,
        } => {
            let loaded = load_filtered(&csv, &db_path, &config, &filter, direction.as_deref())?;
            let export = GraphExport::new(loaded.session.snapshot());
            println!("{}", serde_json::to_string_pretty(&export)?);
        }

        Command::Actionable { csv, json } => {
            let loaded = load(&csv, &db_path, &config, None)?;
            let session = &loaded.session;
            let closure = &session.snapshot().closure;
            let rows: Vec<&TaskRow> = session
                .store()
                .rows()
                .iter()
                .filter(|r| closure.is_actionable(&r.id))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", output::format_task_list(&rows, closure));
            }
        }

        Command::Show { csv, id, json } => {
            let loaded = load(&csv, &db_path, &config, None)?;
            let session = &loaded.session;
            let row = find_row(session, &id)?;
            let snapshot = session.snapshot();
            let dependents = output::dependents(session.store().rows(), &id);
            if json {
                let blocked_by = closure::blockers(row, &snapshot.closure.done);
                let detail = TaskDetail {
                    task: row,
                    actionable: snapshot.closure.is_actionable(&id),
                    blocked_by: &blocked_by,
                    blocks: &dependents,
                };
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                print!("{}", output::format_task_detail(row, &snapshot.closure, &dependents));
            }
        }

        Command::Done { csv, id } => {
            if set_status(&csv, &db_path, &config, &id, true)? {
                eprintln!("Marked '{id}' done");
            } else {
                eprintln!("'{id}' is already done");
            }
        }

        Command::Reopen { csv, id } => {
            if set_status(&csv, &db_path, &config, &id, false)? {
                eprintln!("Reopened '{id}'");
            } else {
                eprintln!("'{id}' is not done");
            }
        }

        Command::Reset { csv } => {
            let source = DataSource::new(&csv)?;
            open_overrides(&db_path, &source)?.clear()?;
            eprintln!("Cleared saved statuses for {}", source.path.display());
        }
    }

    Ok(())
}
