//! Repository management playbook
//!
//! Pull request review, pre-release checklists, documentation, security
//! audits, contributor onboarding and daily maintenance.

use serde_json::{json, Value};

use super::{general_task, route, DomainMetrics, GoalReport, Playbook, Trigger};
use crate::task::{Task, TaskPriority, TaskSpec, TaskStatus};
use crate::types::{ContextExt, Metadata};

#[derive(Debug, Clone, Copy)]
enum Goal {
    PullRequest,
    Release,
    Docs,
    Security,
    Onboarding,
    Maintenance,
}

const TRIGGERS: &[(Trigger, Goal)] = &[
    (Trigger::new(&[&["review", "pr"]]), Goal::PullRequest),
    (Trigger::new(&[&["release"], &["deploy"]]), Goal::Release),
    (Trigger::new(&[&["doc"]]), Goal::Docs),
    (Trigger::new(&[&["security"], &["audit"]]), Goal::Security),
    (Trigger::new(&[&["onboard"], &["contributor"]]), Goal::Onboarding),
    (Trigger::new(&[&["daily"], &["maintenance"]]), Goal::Maintenance),
];

const METRIC_KEYS: &[&str] = &[
    "code_reviews_passed",
    "tests_passed",
    "security_issues_found",
    "documentation_updated",
];

/// Planner and aggregator for a repository maintenance team
#[derive(Debug, Clone)]
pub struct RepositoryPlaybook {
    repo_name: String,
}

impl RepositoryPlaybook {
    pub const TEAM_NAME: &'static str = "Repository Management Team";

    pub fn new(repo_name: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
        }
    }

    /// Reads `repo_name` from team settings
    pub fn from_settings(settings: &Metadata) -> Self {
        Self::new(settings.str_or("repo_name", "my-repo"))
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }
}

impl Default for RepositoryPlaybook {
    fn default() -> Self {
        Self::new("my-repo")
    }
}

impl Playbook for RepositoryPlaybook {
    fn team_name(&self) -> &str {
        Self::TEAM_NAME
    }

    fn plan(&self, goal: &str, context: &Metadata) -> Vec<TaskSpec> {
        match route(goal, TRIGGERS) {
            Some(Goal::PullRequest) => pr_review(context),
            Some(Goal::Release) => pre_release(context),
            Some(Goal::Docs) => vec![documentation(context)],
            Some(Goal::Security) => security_audit(context),
            Some(Goal::Onboarding) => onboarding(context),
            Some(Goal::Maintenance) => maintenance(context),
            None => vec![general_task(goal, context)],
        }
    }

    fn aggregate(&self, tasks: &[Task]) -> GoalReport {
        let mut metrics = DomainMetrics::new("quality_metrics", METRIC_KEYS);
        for task in tasks.iter().filter(|t| t.status() == TaskStatus::Completed) {
            match task.task_type() {
                "code_review" => metrics.add("code_reviews_passed", 1),
                "testing" => metrics.add("tests_passed", 1),
                "security" => {
                    let found = task
                        .result()
                        .and_then(|r| r.get("issues_found"))
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    metrics.add("security_issues_found", found);
                }
                "documentation" => metrics.add("documentation_updated", 1),
                _ => {}
            }
        }

        GoalReport::collect(self.team_name(), tasks)
            .with_label("repository", self.repo_name.as_str())
            .with_metrics(metrics)
    }
}

fn test_command(ctx: &Metadata) -> Value {
    ctx.value_or("test_command", json!("pytest"))
}

fn language(ctx: &Metadata) -> Value {
    ctx.value_or("language", json!("python"))
}

fn pr_review(ctx: &Metadata) -> Vec<TaskSpec> {
    let pr_number = ctx.value_or("pr_number", json!("unknown"));
    let pr_label = match &pr_number {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let code = ctx.value_or("code", json!(""));

    let mut tasks = vec![TaskSpec::new("code_review", format!("Review code for PR #{pr_label}"))
        .with_priority(TaskPriority::High)
        .with_arg("code", code.clone())
        .with_arg("language", language(ctx))
        .with_arg("pr_number", pr_number.clone())];

    if ctx.flag("run_tests", false) {
        tasks.push(
            TaskSpec::new("testing", "Run test suite")
                .with_priority(TaskPriority::High)
                .with_arg("test_command", test_command(ctx))
                .with_arg("pr_number", pr_number),
        );
    }

    if ctx.flag("check_docs", true) {
        tasks.push(
            TaskSpec::new("documentation", "Verify documentation")
                .with_arg("code", code)
                .with_arg("check_type", "completeness"),
        );
    }

    tasks
}

fn pre_release(ctx: &Metadata) -> Vec<TaskSpec> {
    let version = ctx.str_or("version", "1.0.0");

    let mut tasks = vec![
        TaskSpec::new("testing", format!("Run full test suite for v{version}"))
            .with_priority(TaskPriority::Critical)
            .with_arg("test_command", test_command(ctx))
            .with_arg("coverage", true),
        TaskSpec::new("security", "Security vulnerability scan")
            .with_priority(TaskPriority::Critical)
            .with_arg("scan_dependencies", true)
            .with_arg("scan_code", true),
        TaskSpec::new("documentation", "Update release documentation")
            .with_priority(TaskPriority::High)
            .with_arg("version", version.as_str())
            .with_arg("changelog", ctx.value_or("changelog", json!(""))),
    ];

    if ctx.flag("review_changes", true) {
        tasks.push(
            TaskSpec::new("code_review", "Review changes since last release")
                .with_priority(TaskPriority::High)
                .with_arg("code", ctx.value_or("changes", json!("")))
                .with_arg("language", language(ctx)),
        );
    }

    tasks
}

fn documentation(ctx: &Metadata) -> TaskSpec {
    TaskSpec::new("documentation", "Generate/update documentation")
        .with_arg("content", ctx.value_or("content", json!("")))
        .with_arg("doc_type", ctx.value_or("doc_type", json!("api")))
        .with_arg("num_faqs", ctx.value_or("num_faqs", json!(10)))
}

fn security_audit(ctx: &Metadata) -> Vec<TaskSpec> {
    vec![
        TaskSpec::new("code_review", "Security-focused code review")
            .with_priority(TaskPriority::Critical)
            .with_arg("code", ctx.value_or("code", json!("")))
            .with_arg("language", language(ctx))
            .with_arg("focus", "security"),
        TaskSpec::new("security", "Scan dependencies for vulnerabilities")
            .with_priority(TaskPriority::Critical)
            .with_arg("dependencies", ctx.value_or("dependencies", json!([]))),
    ]
}

fn onboarding(ctx: &Metadata) -> Vec<TaskSpec> {
    let overview = ctx.value_or("repo_overview", json!(""));
    let mut tasks = vec![TaskSpec::new("documentation", "Generate contributor onboarding guide")
        .with_arg("content", overview.clone())
        .with_arg("doc_type", "onboarding")];

    if ctx.flag("generate_faq", true) {
        tasks.push(
            TaskSpec::new("faq_generation", "Generate contributor FAQ")
                .with_priority(TaskPriority::Low)
                .with_arg("content", overview)
                .with_arg("num_faqs", 15),
        );
    }

    tasks
}

fn maintenance(ctx: &Metadata) -> Vec<TaskSpec> {
    let mut tasks =
        vec![TaskSpec::new("testing", "Daily test run").with_arg("test_command", test_command(ctx))];

    if ctx.flag("security_check", true) {
        tasks.push(TaskSpec::new("security", "Daily security scan").with_arg("quick_scan", true));
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::metadata;

    fn types(specs: &[TaskSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.task_type.as_str()).collect()
    }

    #[test]
    fn test_pr_review() {
        let ctx = metadata(json!({"pr_number": 42, "code": "fn main() {}", "language": "rust"}));
        let specs = RepositoryPlaybook::default().plan("Review PR #42", &ctx);

        assert_eq!(types(&specs), vec!["code_review", "documentation"]);
        assert_eq!(specs[0].description, "Review code for PR #42");
        assert_eq!(specs[0].metadata["language"], json!("rust"));
        assert_eq!(specs[0].priority, TaskPriority::High);
    }

    #[test]
    fn test_pr_review_with_tests_without_docs() {
        let ctx = metadata(json!({"run_tests": true, "check_docs": false}));
        let specs = RepositoryPlaybook::default().plan("review pr", &ctx);

        assert_eq!(types(&specs), vec!["code_review", "testing"]);
        assert_eq!(specs[0].description, "Review code for PR #unknown");
        assert_eq!(specs[1].metadata["test_command"], json!("pytest"));
    }

    #[test]
    fn test_release_checklist() {
        let ctx = metadata(json!({"version": "2.1.0"}));
        let specs = RepositoryPlaybook::default().plan("Prepare release", &ctx);

        assert_eq!(
            types(&specs),
            vec!["testing", "security", "documentation", "code_review"]
        );
        assert_eq!(specs[0].description, "Run full test suite for v2.1.0");
        assert_eq!(specs[0].priority, TaskPriority::Critical);
        assert_eq!(specs[2].metadata["version"], json!("2.1.0"));
    }

    #[test]
    fn test_trigger_order() {
        let playbook = RepositoryPlaybook::default();
        // "review" without "pr" falls through to later triggers
        assert_eq!(
            types(&playbook.plan("review the docs", &Metadata::new())),
            vec!["documentation"]
        );
        assert_eq!(
            types(&playbook.plan("security audit", &Metadata::new())),
            vec!["code_review", "security"]
        );
        assert_eq!(
            types(&playbook.plan("onboard a contributor", &metadata(json!({"generate_faq": false})))),
            vec!["documentation"]
        );
        assert_eq!(
            types(&playbook.plan("nightly maintenance", &Metadata::new())),
            vec!["testing", "security"]
        );
    }

    #[test]
    fn test_security_issues_summed() {
        let playbook = RepositoryPlaybook::new("cadre");
        let results = [json!({"issues_found": 2}), json!({"issues_found": 3}), json!("clean")];
        let tasks: Vec<Task> = results
            .iter()
            .enumerate()
            .map(|(n, result)| {
                let mut task = Task::new(format!("task_{n}"), TaskSpec::new("security", "scan"));
                task.mark_delegated("scanner").unwrap();
                task.start().unwrap();
                task.complete(result.clone()).unwrap();
                task
            })
            .collect();

        let report = playbook.aggregate(&tasks);
        let metrics = report.metrics.unwrap();

        assert_eq!(metrics.get("security_issues_found"), 5);
        assert_eq!(metrics.get("code_reviews_passed"), 0);
        assert_eq!(report.labels["repository"], "cadre");
    }
}
