//! Bakery operations playbook
//!
//! Production planning, custom orders, quality control, recipe management,
//! demand forecasting, customer inquiries and the daily bundle that chains
//! several of them.

use serde_json::{json, Value};

use super::{general_task, route, str_field, DomainMetrics, GoalReport, Playbook, Trigger};
use crate::task::{Task, TaskPriority, TaskSpec, TaskStatus};
use crate::types::{metadata, ContextExt, Metadata};

#[derive(Debug, Clone, Copy)]
enum Goal {
    Production,
    CustomOrder,
    Quality,
    Recipe,
    Forecast,
    Customer,
    Daily,
}

const TRIGGERS: &[(Trigger, Goal)] = &[
    (Trigger::new(&[&["production"], &["plan"]]), Goal::Production),
    (Trigger::new(&[&["custom"], &["order"]]), Goal::CustomOrder),
    (Trigger::new(&[&["quality"], &["inspection"]]), Goal::Quality),
    (Trigger::new(&[&["recipe"]]), Goal::Recipe),
    (Trigger::new(&[&["forecast"], &["demand"]]), Goal::Forecast),
    (Trigger::new(&[&["customer"], &["inquiry"]]), Goal::Customer),
    (Trigger::new(&[&["daily"]]), Goal::Daily),
];

const METRIC_KEYS: &[&str] = &[
    "recipes_managed",
    "quality_checks_passed",
    "customer_inquiries_handled",
    "production_plans_created",
    "forecasts_generated",
];

/// Planner and aggregator for a bakery team
#[derive(Debug, Clone)]
pub struct BakeryPlaybook {
    bakery_name: String,
    specialties: Vec<String>,
}

impl BakeryPlaybook {
    pub const TEAM_NAME: &'static str = "Bakery Operations Team";

    pub fn new(bakery_name: impl Into<String>) -> Self {
        Self {
            bakery_name: bakery_name.into(),
            ..Self::default()
        }
    }

    /// Reads `bakery_name` and `specialties` from team settings
    pub fn from_settings(settings: &Metadata) -> Self {
        let defaults = Self::default();
        let specialties: Vec<String> = settings
            .list("specialties")
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        Self {
            bakery_name: settings.str_or("bakery_name", &defaults.bakery_name),
            specialties: if specialties.is_empty() {
                defaults.specialties
            } else {
                specialties
            },
        }
    }

    pub fn bakery_name(&self) -> &str {
        &self.bakery_name
    }

    pub fn specialties(&self) -> &[String] {
        &self.specialties
    }
}

impl Default for BakeryPlaybook {
    fn default() -> Self {
        Self {
            bakery_name: "Artisan Bakery".to_string(),
            specialties: vec![
                "bread".to_string(),
                "cakes".to_string(),
                "pastries".to_string(),
            ],
        }
    }
}

impl Playbook for BakeryPlaybook {
    fn team_name(&self) -> &str {
        Self::TEAM_NAME
    }

    fn plan(&self, goal: &str, context: &Metadata) -> Vec<TaskSpec> {
        match route(goal, TRIGGERS) {
            Some(Goal::Production) => production(context),
            Some(Goal::CustomOrder) => custom_order(context),
            Some(Goal::Quality) => quality_check(context),
            Some(Goal::Recipe) => recipe(context),
            Some(Goal::Forecast) => vec![forecast(context, 30, TaskPriority::Medium)],
            Some(Goal::Customer) => customer_service(context),
            Some(Goal::Daily) => daily(context),
            None => vec![general_task(goal, context)],
        }
    }

    fn aggregate(&self, tasks: &[Task]) -> GoalReport {
        let mut metrics = DomainMetrics::new("operational_metrics", METRIC_KEYS);
        for task in tasks.iter().filter(|t| t.status() == TaskStatus::Completed) {
            let key = match task.task_type() {
                t if t.contains("recipe") => "recipes_managed",
                "quality_control" => "quality_checks_passed",
                "customer_support" => "customer_inquiries_handled",
                "production_report" => "production_plans_created",
                "sales_forecasting" => "forecasts_generated",
                _ => continue,
            };
            metrics.add(key, 1);
        }

        GoalReport::collect(self.team_name(), tasks)
            .with_label("bakery", self.bakery_name.as_str())
            .with_metrics(metrics)
    }
}

fn forecast(ctx: &Metadata, default_days: u64, priority: TaskPriority) -> TaskSpec {
    TaskSpec::new("sales_forecasting", "Forecast product demand")
        .with_priority(priority)
        .with_arg("historical_data", ctx.value_or("sales_data", json!([])))
        .with_arg("forecast_days", ctx.value_or("forecast_days", json!(default_days)))
}

fn production(ctx: &Metadata) -> Vec<TaskSpec> {
    let mut tasks = vec![forecast(ctx, 7, TaskPriority::High)];

    for recipe in ctx.list("recipes") {
        let servings = recipe.get("target_servings").cloned().unwrap_or(json!(100));
        tasks.push(
            TaskSpec::new(
                "recipe_scale",
                format!("Scale recipe: {}", str_field(&recipe, "name", "Unknown")),
            )
            .with_arg("action", "scale")
            .with_arg("recipe", recipe)
            .with_arg("servings", servings),
        );
    }

    if ctx.flag("generate_report", true) {
        tasks.push(
            TaskSpec::new("production_report", "Generate production report")
                .with_arg("products", ctx.value_or("products", json!([]))),
        );
    }

    tasks
}

fn custom_order(ctx: &Metadata) -> Vec<TaskSpec> {
    let order = ctx.object("order");
    let mut tasks = vec![TaskSpec::new("customer_support", "Respond to custom order inquiry")
        .with_priority(TaskPriority::High)
        .with_arg("message", order.str_or("message", ""))
        .with_arg("customer_email", order.str_or("customer_email", ""))];

    // Both follow-ups need the recipe itself.
    if order.is_set("recipe") {
        let recipe = order.value_or("recipe", json!({}));
        tasks.push(
            TaskSpec::new("recipe_allergens", "Check allergens in recipe")
                .with_priority(TaskPriority::High)
                .with_arg("action", "allergens")
                .with_arg("recipe", recipe.clone()),
        );

        if order.is_set("nutrition_info") {
            tasks.push(
                TaskSpec::new("recipe_nutrition", "Calculate nutrition information")
                    .with_arg("action", "nutrition")
                    .with_arg("recipe", recipe),
            );
        }
    }

    tasks
}

fn quality_check(ctx: &Metadata) -> Vec<TaskSpec> {
    ctx.list("products")
        .iter()
        .map(|product| {
            TaskSpec::new(
                "quality_control",
                format!("Quality check: {}", str_field(product, "name", "Unknown")),
            )
            .with_priority(TaskPriority::High)
            .with_arg("product_type", str_field(product, "type", "cake"))
            .with_arg("image_path", str_field(product, "image", ""))
            .with_arg("description", str_field(product, "description", ""))
        })
        .collect()
}

fn recipe(ctx: &Metadata) -> Vec<TaskSpec> {
    let action = ctx.str_or("action", "scale");
    let recipe = ctx.value_or("recipe", json!({}));
    let task_type = match action.as_str() {
        "substitute" => "recipe_substitute",
        "allergens" => "recipe_allergens",
        "nutrition" => "recipe_nutrition",
        "optimize" => "recipe_optimize",
        _ => "recipe_scale",
    };

    let mut args = ctx.clone();
    args.insert("action".to_string(), Value::String(action.clone()));
    args.insert("recipe".to_string(), recipe.clone());

    vec![TaskSpec::new(
        task_type,
        format!("Recipe {}: {}", action, str_field(&recipe, "name", "Unknown")),
    )
    .with_metadata(args)]
}

fn customer_service(ctx: &Metadata) -> Vec<TaskSpec> {
    let inquiries = if ctx.contains_key("inquiries") {
        ctx.list("inquiries")
    } else {
        vec![Value::Object(ctx.clone())]
    };

    inquiries
        .iter()
        .map(|inquiry| {
            TaskSpec::new(
                "customer_support",
                format!("Handle inquiry: {}", str_field(inquiry, "subject", "General")),
            )
            .with_arg("message", str_field(inquiry, "message", ""))
            .with_arg("customer_email", str_field(inquiry, "customer_email", ""))
        })
        .collect()
}

fn daily(ctx: &Metadata) -> Vec<TaskSpec> {
    let mut tasks = Vec::new();

    if ctx.flag("plan_production", true) {
        tasks.extend(production(&metadata(json!({
            "sales_data": ctx.value_or("sales_data", json!([])),
            "recipes": ctx.value_or("recipes", json!([])),
            "forecast_days": 1,
            "generate_report": false,
        }))));
    }

    if ctx.is_set("products_to_check") {
        tasks.extend(quality_check(&metadata(json!({
            "products": ctx.value_or("products_to_check", json!([])),
        }))));
    }

    if ctx.is_set("inquiries") {
        tasks.extend(customer_service(&metadata(json!({
            "inquiries": ctx.value_or("inquiries", json!([])),
        }))));
    }

    tasks
}
