//! Online store playbook
//!
//! Order processing, customer support, marketing campaigns, analytics,
//! customer segmentation, plus daily and weekly bundles.

use serde_json::json;

use super::{general_task, route, str_field, DomainMetrics, GoalReport, Playbook, Trigger};
use crate::task::{Task, TaskPriority, TaskSpec, TaskStatus};
use crate::types::{ContextExt, Metadata};

#[derive(Debug, Clone, Copy)]
enum Goal {
    Orders,
    Support,
    Marketing,
    Analytics,
    Segmentation,
    Daily,
    Weekly,
}

const TRIGGERS: &[(Trigger, Goal)] = &[
    (Trigger::new(&[&["order", "process"]]), Goal::Orders),
    (Trigger::new(&[&["customer", "support"]]), Goal::Support),
    (Trigger::new(&[&["marketing"], &["campaign"]]), Goal::Marketing),
    (Trigger::new(&[&["analytics"], &["forecast"]]), Goal::Analytics),
    (Trigger::new(&[&["segment"], &["customer", "review"]]), Goal::Segmentation),
    (Trigger::new(&[&["daily"]]), Goal::Daily),
    (Trigger::new(&[&["weekly"]]), Goal::Weekly),
];

const METRIC_KEYS: &[&str] = &[
    "orders_processed",
    "inquiries_handled",
    "content_pieces_created",
    "forecasts_generated",
    "segmentations_run",
];

const DEFAULT_PLATFORMS: &[&str] = &["instagram", "facebook", "twitter"];

/// Planner and aggregator for an online store team
#[derive(Debug, Clone)]
pub struct StorePlaybook {
    store_name: String,
}

impl StorePlaybook {
    pub const TEAM_NAME: &'static str = "Shopify Store Team";

    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
        }
    }

    /// Reads `store_name` from team settings
    pub fn from_settings(settings: &Metadata) -> Self {
        Self::new(settings.str_or("store_name", "My Store"))
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }
}

impl Default for StorePlaybook {
    fn default() -> Self {
        Self::new("My Store")
    }
}

impl Playbook for StorePlaybook {
    fn team_name(&self) -> &str {
        Self::TEAM_NAME
    }

    fn plan(&self, goal: &str, context: &Metadata) -> Vec<TaskSpec> {
        match route(goal, TRIGGERS) {
            Some(Goal::Orders) => vec![order_processing(context)],
            Some(Goal::Support) => customer_support(context),
            Some(Goal::Marketing) => marketing(context),
            Some(Goal::Analytics) => vec![analytics(context)],
            Some(Goal::Segmentation) => vec![segmentation(context)],
            Some(Goal::Daily) => daily(context),
            Some(Goal::Weekly) => weekly(context),
            None => vec![general_task(goal, context)],
        }
    }

    fn aggregate(&self, tasks: &[Task]) -> GoalReport {
        let mut metrics = DomainMetrics::new("store_metrics", METRIC_KEYS);
        for task in tasks.iter().filter(|t| t.status() == TaskStatus::Completed) {
            let key = match task.task_type() {
                "order_processing" => "orders_processed",
                "customer_support" => "inquiries_handled",
                "social_media" | "email_marketing" => "content_pieces_created",
                "sales_forecasting" => "forecasts_generated",
                "customer_segmentation" => "segmentations_run",
                _ => continue,
            };
            metrics.add(key, 1);
        }

        GoalReport::collect(self.team_name(), tasks)
            .with_label("store", self.store_name.as_str())
            .with_metrics(metrics)
    }
}

fn order_processing(ctx: &Metadata) -> TaskSpec {
    TaskSpec::new("order_processing", "Process incoming orders")
        .with_priority(TaskPriority::High)
        .with_arg("orders", ctx.value_or("orders", json!([])))
        .with_arg("auto_fulfill", ctx.flag("auto_fulfill", false))
}

fn customer_support(ctx: &Metadata) -> Vec<TaskSpec> {
    ctx.list("inquiries")
        .iter()
        .map(|inquiry| {
            TaskSpec::new(
                "customer_support",
                format!("Handle customer inquiry: {}", str_field(inquiry, "subject", "N/A")),
            )
            .with_arg("message", str_field(inquiry, "message", ""))
            .with_arg("customer_email", str_field(inquiry, "email", ""))
        })
        .collect()
}

fn marketing(ctx: &Metadata) -> Vec<TaskSpec> {
    let product = ctx.value_or("product", json!("our products"));
    let platforms: Vec<String> = if ctx.contains_key("platforms") {
        ctx.list("platforms")
            .iter()
            .filter_map(|p| p.as_str().map(str::to_string))
            .collect()
    } else {
        DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect()
    };

    let mut tasks: Vec<TaskSpec> = platforms
        .into_iter()
        .map(|platform| {
            TaskSpec::new("social_media", format!("Generate {platform} content"))
                .with_arg("topic", product.clone())
                .with_arg("platform", platform)
                .with_arg("content_type", ctx.value_or("content_type", json!("promotional")))
        })
        .collect();

    if ctx.flag("include_email", true) {
        tasks.push(
            TaskSpec::new("email_marketing", "Generate email campaign")
                .with_arg("content_type", "email_campaign")
                .with_arg("product", product)
                .with_arg("target_audience", ctx.value_or("audience", json!("all customers")))
                .with_arg("tone", ctx.value_or("tone", json!("friendly"))),
        );
    }

    tasks
}

fn analytics(ctx: &Metadata) -> TaskSpec {
    TaskSpec::new("sales_forecasting", "Generate sales forecast")
        .with_arg("historical_data", ctx.value_or("sales_data", json!([])))
        .with_arg("forecast_days", ctx.value_or("forecast_days", json!(30)))
}

fn segmentation(ctx: &Metadata) -> TaskSpec {
    TaskSpec::new("customer_segmentation", "Segment customers")
        .with_arg("customers", ctx.value_or("customers", json!([])))
}

fn daily(ctx: &Metadata) -> Vec<TaskSpec> {
    let mut tasks = vec![order_processing(ctx)];
    if ctx.is_set("inquiries") {
        tasks.extend(customer_support(ctx));
    }
    tasks.push(analytics(ctx));
    tasks
}

fn weekly(ctx: &Metadata) -> Vec<TaskSpec> {
    let mut tasks = vec![analytics(ctx), segmentation(ctx)];
    if ctx.flag("plan_social_media", true) {
        tasks.push(
            TaskSpec::new("social_media", "Plan next week's social media")
                .with_priority(TaskPriority::Low)
                .with_arg("topic", "weekly highlights")
                .with_arg("platform", "instagram")
                .with_arg("content_type", "recap"),
        );
    }
    tasks
}
