mod progress;
mod reporter;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};

use otterdog_config::{OtterdogSettings, resolve_credentials};
use otterdog_model::{Loader, Planner, PlannerMode, parse_declarative_config, render_organization, render_plan};
use otterdog_provider::ForgeProvider;
use otterdog_store::{Snapshot, SnapshotStore};
use otterdog_types::OtterdogError;

use progress::ProgressReporter;
use reporter::{CliReporter, Reporter};

#[derive(Parser, Debug)]
#[command(name = "otterdog", version)]
#[command(about = "Manages GitHub organization configuration as code")]
struct Cli {
    /// Path to the process-wide settings file.
    #[arg(long, default_value = "otterdog.toml")]
    settings: PathBuf,

    /// Overrides the declarative config directory from settings.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Overrides the snapshot state directory from settings.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Skip the headless-browser settings scrape entirely (the default —
    /// this binary never attaches a browser session).
    #[arg(long)]
    no_web_ui: bool,

    /// Overwrite an existing snapshot (`import`) without asking.
    #[arg(long)]
    force: bool,

    /// Treat REMOVE patches as real removals instead of demoting them to
    /// extras.
    #[arg(long)]
    delete_extras: bool,

    /// Diff against the last fetched snapshot instead of a fresh live read.
    #[arg(long)]
    local: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the live organization state into a snapshot.
    Fetch { org: String },
    /// Like fetch, but refuses to overwrite an existing snapshot without --force.
    Import { org: String },
    /// Print the patch between the declarative config and a live read.
    Plan { org: String },
    /// Print the patch between the declarative config and the last snapshot.
    LocalPlan { org: String },
    /// Execute the patch between the declarative config and a live read.
    Apply { org: String },
    /// Render the live model back to declarative form and diff it against
    /// the on-disk config, ignoring comment lines.
    CanonicalDiff { org: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut reporter = CliReporter;

    match run(&cli, &mut reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.error(&format!("{e:#}"));
            let code = e
                .downcast_ref::<OtterdogError>()
                .map(OtterdogError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn run(cli: &Cli, reporter: &mut dyn Reporter) -> Result<()> {
    let settings = OtterdogSettings::load(&cli.settings)?;
    let config_dir = cli.config_dir.clone().unwrap_or_else(|| settings.config_dir.clone());
    let state_dir = cli.state_dir.clone().unwrap_or_else(|| settings.state_dir.clone());
    let delete_extras = cli.delete_extras || settings.planner.delete_extras;
    if cli.no_web_ui {
        reporter.info("--no-web-ui has no effect: this binary never attaches a browser session");
    }

    match &cli.cmd {
        Commands::Fetch { org } => fetch(org, &state_dir, &settings, reporter),
        Commands::Import { org } => import(org, &state_dir, &settings, cli.force, reporter),
        Commands::Plan { org } => {
            plan(org, &config_dir, &state_dir, &settings, cli.local, PlannerMode::Plan, reporter)
        }
        Commands::LocalPlan { org } => {
            plan(org, &config_dir, &state_dir, &settings, true, PlannerMode::LocalPlan, reporter)
        }
        Commands::Apply { org } => apply(org, &config_dir, &settings, delete_extras, reporter),
        Commands::CanonicalDiff { org } => canonical_diff(org, &config_dir, &state_dir, &settings, cli.local, reporter),
    }
}

fn build_provider(org: &str) -> Result<ForgeProvider<'static>> {
    let creds = resolve_credentials(org)?;
    let token = creds
        .api_token
        .ok_or_else(|| anyhow!("no API token available for org '{org}'"))?;
    Ok(ForgeProvider::new(token)?)
}

fn declared_config_path(config_dir: &std::path::Path, org: &str) -> PathBuf {
    config_dir.join(format!("{org}.json"))
}

fn load_declared(config_dir: &std::path::Path, org: &str) -> Result<serde_json::Value> {
    let path = declared_config_path(config_dir, org);
    let text =
        fs::read_to_string(&path).with_context(|| format!("reading declarative config: {}", path.display()))?;
    Ok(parse_declarative_config(&text)?)
}

fn load_live(org: &str, settings: &OtterdogSettings, reporter: &mut dyn Reporter) -> Result<otterdog_model::Organization> {
    let provider = build_provider(org)?;
    let loader = Loader::new().with_worker_pool_size(settings.loader.worker_pool_size);
    let progress = ProgressReporter::new();
    progress.set_status(&format!("fetching live configuration for {org}..."));
    let (organization, errors) = loader.load_from_live(org, &provider, false);
    progress.finish(&format!("fetched {org}"));
    for error in &errors {
        reporter.warn(&error.to_string());
    }
    Ok(organization)
}

fn load_snapshot_as_organization(org: &str, state_dir: &std::path::Path) -> Result<otterdog_model::Organization> {
    let store = SnapshotStore::new(state_dir);
    let snapshot = store
        .load(org)?
        .ok_or_else(|| anyhow!("no snapshot for '{org}' in {}; run `fetch` first", state_dir.display()))?;
    let loader = Loader::new();
    Ok(loader.load_from_declared(org, &snapshot.organization))
}

fn fetch(org: &str, state_dir: &std::path::Path, settings: &OtterdogSettings, reporter: &mut dyn Reporter) -> Result<()> {
    let organization = load_live(org, settings, reporter)?;
    let store = SnapshotStore::new(state_dir);
    store.save(&Snapshot::new(org, render_organization(&organization)))?;
    reporter.info(&format!("wrote snapshot for {org} to {}", state_dir.display()));
    Ok(())
}

fn import(
    org: &str,
    state_dir: &std::path::Path,
    settings: &OtterdogSettings,
    force: bool,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let store = SnapshotStore::new(state_dir);
    if store.exists(org) && !force {
        bail!("a snapshot for '{org}' already exists in {}; pass --force to overwrite", state_dir.display());
    }
    fetch(org, state_dir, settings, reporter)
}

#[allow(clippy::too_many_arguments)]
fn plan(
    org: &str,
    config_dir: &std::path::Path,
    state_dir: &std::path::Path,
    settings: &OtterdogSettings,
    local: bool,
    mode: PlannerMode,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let declared = load_declared(config_dir, org)?;
    let loader = Loader::new().with_worker_pool_size(settings.loader.worker_pool_size);
    let expected = loader.load_from_declared(org, &declared);
    let current = if local {
        load_snapshot_as_organization(org, state_dir)?
    } else {
        load_live(org, settings, reporter)?
    };

    let outcome = Planner::new().plan(org, &expected, &current);
    println!("{}", render_plan(&outcome.patches));
    println!("{}", outcome.validation.summary_line());
    println!("{}", outcome.summary_line(mode));

    if outcome.validation.has_errors() {
        return Err(OtterdogError::ValidationBlocked {
            error_count: outcome.validation.error_count(),
        }
        .into());
    }
    Ok(())
}

fn apply(
    org: &str,
    config_dir: &std::path::Path,
    settings: &OtterdogSettings,
    delete_extras: bool,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let declared = load_declared(config_dir, org)?;
    let loader = Loader::new().with_worker_pool_size(settings.loader.worker_pool_size);
    let expected = loader.load_from_declared(org, &declared);
    let provider = build_provider(org)?;

    let progress = ProgressReporter::new();
    progress.set_status(&format!("reading live configuration for {org}..."));
    let (current, errors) = loader.load_from_live(org, &provider, false);
    progress.finish(&format!("read live configuration for {org}"));
    for error in &errors {
        reporter.warn(&error.to_string());
    }

    let outcome = Planner::new().with_delete_extras(delete_extras).apply(org, &expected, &current, &provider)?;
    println!("{}", render_plan(&outcome.patches));
    println!("{}", outcome.validation.summary_line());
    println!("{}", outcome.summary_line(PlannerMode::Apply));
    Ok(())
}

fn canonical_diff(
    org: &str,
    config_dir: &std::path::Path,
    state_dir: &std::path::Path,
    settings: &OtterdogSettings,
    local: bool,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let path = declared_config_path(config_dir, org);
    let declared_text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;

    let organization = if local {
        load_snapshot_as_organization(org, state_dir)?
    } else {
        load_live(org, settings, reporter)?
    };
    let rendered = serde_json::to_string_pretty(&render_organization(&organization)).context("rendering organization")?;

    let old = strip_comment_lines(&declared_text);
    let new = strip_comment_lines(&rendered);

    let diff = similar::TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(&path.display().to_string(), "<live>")
        .to_string();

    if diff.trim().is_empty() {
        println!("No differences.");
    } else {
        print!("{diff}");
    }
    Ok(())
}

/// `canonical-diff` ignores comment lines the way the teacher's own tests
/// ignore generated boilerplate lines — a jsonnet-evaluated source may carry
/// `//` comments the rendered JSON never does.
fn strip_comment_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_comment_lines() {
        let input = "// a comment\n{\n  \"x\": 1\n}\n";
        assert_eq!(strip_comment_lines(input), "{\n  \"x\": 1\n}");
    }

    #[test]
    fn declared_config_path_joins_org_name() {
        let path = declared_config_path(std::path::Path::new("./orgs"), "acme");
        assert_eq!(path, std::path::PathBuf::from("./orgs/acme.json"));
    }
}
