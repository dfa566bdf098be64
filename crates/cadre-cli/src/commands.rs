//! Subcommand implementations

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cadre_core::{
    Interval, JobSpec, Metadata, Orchestrator, Scheduler, SchedulerConfig, TeamConfig,
    TeamFactory,
};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::info;

use crate::goal_job::GoalAction;

const WATCH_JOB: &str = "watched-goal";

/// `cadre teams`
pub fn teams() -> anyhow::Result<()> {
    let factory = TeamFactory::new();

    println!("Team types:");
    for team_type in factory.team_types() {
        println!("  {}", team_type);
    }
    println!("Worker kinds:");
    for kind in factory.worker_kinds() {
        println!("  {}", kind);
    }
    Ok(())
}

/// `cadre plan`
pub fn plan(
    team_type: &str,
    goal: &str,
    context: Option<&Path>,
    settings: Option<&Path>,
) -> anyhow::Result<()> {
    let context = load_metadata(context)?;
    let settings = load_metadata(settings)?;
    let playbook = TeamFactory::new().playbook(team_type, &settings)?;

    let tasks = playbook.plan(goal, &context);
    let output = json!({
        "team": playbook.team_name(),
        "goal": goal,
        "tasks": tasks,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// `cadre run`
pub async fn run(
    config: &Path,
    goal: &str,
    context: Option<&Path>,
    with_status: bool,
) -> anyhow::Result<()> {
    let context = load_metadata(context)?;
    let mut team = build_team(config)?;

    let report = team.execute_goal(goal, &context).await?;
    let mut output = json!({ "report": report });
    if with_status {
        let status = team.get_team_status();
        output["recommendations"] = json!(status.recommendations());
        output["status"] = serde_json::to_value(status)?;
    }
    team.close();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Arguments of `cadre watch`
pub struct WatchArgs {
    pub config: PathBuf,
    pub goal: String,
    pub context: Option<PathBuf>,
    pub every: u64,
    pub runs: Option<u64>,
    pub scheduler: Option<PathBuf>,
}

/// `cadre watch`: schedule the goal and print the run history on exit
pub async fn watch(args: WatchArgs) -> anyhow::Result<()> {
    let context = load_metadata(args.context.as_deref())?;
    let scheduler_config = match &args.scheduler {
        Some(path) => SchedulerConfig::from_file(path)
            .with_context(|| format!("loading scheduler config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    scheduler_config.validate()?;

    let team = build_team(&args.config)?;
    let team_name = team.team_name().to_string();
    let team = Arc::new(Mutex::new(team));

    let action = GoalAction::new(team.clone(), args.goal.as_str());
    let attempts = action.attempts();

    let scheduler = Scheduler::new(scheduler_config);
    scheduler
        .add_job(
            JobSpec::new(WATCH_JOB, action)
                .every(Interval::Seconds(args.every))
                .with_kwargs(context)
                .run_immediately(),
        )
        .await?;
    scheduler.start().await;
    info!(
        "Watching '{}' for {} every {}s",
        args.goal, team_name, args.every
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut check = tokio::time::interval(Duration::from_millis(200));
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = check.tick() => {
                let done = attempts.load(Ordering::SeqCst);
                if args.runs.is_some_and(|target| done >= target) {
                    break;
                }
            }
        }
    }

    scheduler.stop().await;
    team.lock().await.close();

    let output = json!({
        "jobs": scheduler.get_jobs().await,
        "history": scheduler.get_history(usize::MAX).await,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_team(path: &Path) -> anyhow::Result<Orchestrator> {
    let config = TeamConfig::from_file(path)
        .with_context(|| format!("loading team config {}", path.display()))?;
    Ok(TeamFactory::new().build(&config)?)
}

/// A JSON object from `path`, or an empty map
fn load_metadata(path: Option<&Path>) -> anyhow::Result<Metadata> {
    let Some(path) = path else {
        return Ok(Metadata::new());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} must contain a JSON object", path.display()))
}
