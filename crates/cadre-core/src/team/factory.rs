//! Team factory
//!
//! Builds orchestrators from [`TeamConfig`]s. Team types map to playbook
//! constructors; worker kinds map to worker constructors. Both registries
//! are open, so embedders can add their own domains and agents.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{MemberConfig, TeamConfig};
use crate::error::{Result, TeamError};
use crate::playbook::{BakeryPlaybook, Playbook, RepositoryPlaybook, StorePlaybook};
use crate::team::orchestrator::Orchestrator;
use crate::team::worker::{EchoWorker, FailingWorker, Worker};
use crate::types::{ContextExt, Metadata};

/// Builds a playbook from team settings
pub type PlaybookCtor = Box<dyn Fn(&Metadata) -> Box<dyn Playbook> + Send + Sync>;

/// Builds a worker from its member entry
pub type WorkerCtor = Box<dyn Fn(&MemberConfig) -> Arc<dyn Worker> + Send + Sync>;

/// Registry of team types and worker kinds
pub struct TeamFactory {
    team_types: BTreeMap<String, PlaybookCtor>,
    worker_kinds: BTreeMap<String, WorkerCtor>,
}

impl TeamFactory {
    /// Factory with the built-in team types (`bakery`, `repository`,
    /// `shopify_store`) and worker kinds (`echo`, `failing`)
    pub fn new() -> Self {
        let mut factory = Self::empty();

        factory.team_types.insert(
            "bakery".to_string(),
            Box::new(|s: &Metadata| Box::new(BakeryPlaybook::from_settings(s)) as Box<dyn Playbook>),
        );
        factory.team_types.insert(
            "repository".to_string(),
            Box::new(|s: &Metadata| {
                Box::new(RepositoryPlaybook::from_settings(s)) as Box<dyn Playbook>
            }),
        );
        factory.team_types.insert(
            "shopify_store".to_string(),
            Box::new(|s: &Metadata| Box::new(StorePlaybook::from_settings(s)) as Box<dyn Playbook>),
        );

        factory.register_worker_kind("echo", |m: &MemberConfig| {
            Arc::new(EchoWorker::new(m.name.as_str())) as Arc<dyn Worker>
        });
        factory.register_worker_kind("failing", |m: &MemberConfig| {
            let message = m.config.str_or("message", "worker configured to fail");
            Arc::new(FailingWorker::new(m.name.as_str(), message)) as Arc<dyn Worker>
        });

        factory
    }

    /// Factory with nothing registered
    pub fn empty() -> Self {
        Self {
            team_types: BTreeMap::new(),
            worker_kinds: BTreeMap::new(),
        }
    }

    /// Add a team type. Fails if the name is taken.
    pub fn register_team_type<F>(&mut self, name: impl Into<String>, ctor: F) -> Result<()>
    where
        F: Fn(&Metadata) -> Box<dyn Playbook> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.team_types.contains_key(&name) {
            return Err(TeamError::DuplicateTeamType(name).into());
        }
        tracing::info!("Registered team type: {}", name);
        self.team_types.insert(name, Box::new(ctor));
        Ok(())
    }

    /// Add or replace a worker kind
    pub fn register_worker_kind<F>(&mut self, kind: impl Into<String>, ctor: F)
    where
        F: Fn(&MemberConfig) -> Arc<dyn Worker> + Send + Sync + 'static,
    {
        self.worker_kinds.insert(kind.into(), Box::new(ctor));
    }

    pub fn team_types(&self) -> Vec<&str> {
        self.team_types.keys().map(String::as_str).collect()
    }

    pub fn worker_kinds(&self) -> Vec<&str> {
        self.worker_kinds.keys().map(String::as_str).collect()
    }

    /// Just the playbook of a team type, for planning without workers
    pub fn playbook(&self, team_type: &str, settings: &Metadata) -> Result<Box<dyn Playbook>> {
        let ctor = self
            .team_types
            .get(team_type)
            .ok_or_else(|| TeamError::UnknownTeamType(team_type.to_string()))?;
        Ok(ctor(settings))
    }

    /// Build an orchestrator and register its members.
    ///
    /// Members of an unknown kind are skipped with a warning.
    pub fn build(&self, config: &TeamConfig) -> Result<Orchestrator> {
        let playbook = self.playbook(&config.team_type, &config.settings)?;
        let mut team = Orchestrator::from_boxed(playbook).with_config(config.orchestrator.clone());

        for member in &config.members {
            let Some(ctor) = self.worker_kinds.get(&member.kind) else {
                tracing::warn!(
                    "Unknown worker kind '{}' for member '{}', skipping",
                    member.kind,
                    member.name
                );
                continue;
            };
            team.register_worker(member.name.as_str(), ctor(member), member.capabilities.iter().cloned())?;
        }

        tracing::info!(
            "Built {} with {} members",
            team.team_name(),
            team.registry().len()
        );
        Ok(team)
    }
}

impl Default for TeamFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TeamFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamFactory")
            .field("team_types", &self.team_types())
            .field("worker_kinds", &self.worker_kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CadreError;
    use crate::types::metadata;
    use serde_json::json;

    #[test]
    fn test_builtin_registrations() {
        let factory = TeamFactory::new();
        assert_eq!(factory.team_types(), vec!["bakery", "repository", "shopify_store"]);
        assert_eq!(factory.worker_kinds(), vec!["echo", "failing"]);
    }

    #[test]
    fn test_duplicate_team_type_rejected() {
        let mut factory = TeamFactory::new();
        let err = factory
            .register_team_type("bakery", |s: &Metadata| {
                Box::new(BakeryPlaybook::from_settings(s)) as Box<dyn Playbook>
            })
            .unwrap_err();

        assert!(matches!(err, CadreError::Team(TeamError::DuplicateTeamType(_))));

        factory
            .register_team_type("patisserie", |_: &Metadata| {
                Box::new(BakeryPlaybook::new("Patisserie")) as Box<dyn Playbook>
            })
            .unwrap();
        assert_eq!(factory.team_types().len(), 4);
    }

    #[test]
    fn test_unknown_team_type() {
        let err = TeamFactory::new()
            .build(&TeamConfig::new("spaceship"))
            .unwrap_err();
        assert!(matches!(err, CadreError::Team(TeamError::UnknownTeamType(_))));
    }

    #[test]
    fn test_build_skips_unknown_kind() {
        let config = TeamConfig::new("shopify_store")
            .with_settings(metadata(json!({"store_name": "Cozy Candles"})))
            .with_member(MemberConfig::new("orders", "echo").with_capabilities(["order_processing"]))
            .with_member(MemberConfig::new("voice", "telephony").with_capabilities(["voice"]));

        let team = TeamFactory::new().build(&config).unwrap();

        assert_eq!(team.team_name(), "Shopify Store Team");
        assert_eq!(team.registry().names(), vec!["orders"]);
    }

    #[test]
    fn test_build_rejects_duplicate_members() {
        let config = TeamConfig::new("repository")
            .with_member(MemberConfig::new("reviewer", "echo"))
            .with_member(MemberConfig::new("reviewer", "echo"));

        let err = TeamFactory::new().build(&config).unwrap_err();
        assert!(matches!(err, CadreError::Team(TeamError::DuplicateWorker(_))));
    }

    #[tokio::test]
    async fn test_failing_kind_uses_configured_message() {
        let config = TeamConfig::new("repository").with_member(
            MemberConfig::new("ci", "failing")
                .with_capabilities(["testing"])
                .with_config(metadata(json!({"message": "runner offline"}))),
        );
        let mut team = TeamFactory::new().build(&config).unwrap();

        let report = team
            .execute_goal("daily maintenance", &metadata(json!({"security_check": false})))
            .await
            .unwrap();

        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.failures[0].error, "runner offline");
    }

    #[test]
    fn test_playbook_only() {
        let factory = TeamFactory::new();
        let playbook = factory
            .playbook("bakery", &metadata(json!({"bakery_name": "Crumb"})))
            .unwrap();
        assert_eq!(playbook.team_name(), "Bakery Operations Team");
        assert!(factory.playbook("nope", &Metadata::new()).is_err());
    }
}
