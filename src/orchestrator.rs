//! Update check orchestration for the command line
//!
//! This module provides:
//! - Workflow coordination: load config → read files → build checker → decide
//! - Merging of CLI flags with the project configuration file
//! - The `CheckReport` rendered by the output formatters

use crate::checker::{ComposerUpdateChecker, UpdateChecker};
use crate::cli::CliArgs;
use crate::config::Config;
use crate::domain::{
    Dependency, RequirementsToUnlock, SourceKind, UpdateDecision, UpdateStrategy,
};
use crate::error::{AppError, CheckerError};
use crate::manifest::{parse_dependency, DependencyFiles};
use crate::package_manager::DEFAULT_COMPOSER_BINARY;
use crate::progress::Progress;
use crate::registry::{HttpClient, PackagistAdapter, RegistryAdapter};
use crate::resolver::{ComposerProcessResolver, ResolverOracle};
use crate::version::VersionRef;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything known about one dependency after a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub dependency: String,
    pub current_version: Option<VersionRef>,
    pub source: SourceKind,
    pub strategy: UpdateStrategy,
    pub vulnerable: bool,
    pub latest_version: Option<VersionRef>,
    pub decision: UpdateDecision,
    /// The dependency after the update, when one is possible
    pub updated_dependency: Option<Dependency>,
}

impl CheckReport {
    /// Version the dependency would move to
    pub fn target_version(&self) -> Option<&VersionRef> {
        self.updated_dependency
            .as_ref()
            .and_then(|dep| dep.version.as_ref())
    }
}

/// Run the decision queries of `checker`
///
/// With an explicit unlock level only that level is tried; otherwise the
/// lowest sufficient level is picked.
pub async fn check(
    checker: &dyn UpdateChecker,
    source: SourceKind,
    strategy: UpdateStrategy,
    unlock: Option<RequirementsToUnlock>,
) -> Result<CheckReport, CheckerError> {
    let dependency = checker.dependency();
    let latest_version = checker.latest_version().await?;

    let decision = match unlock {
        Some(level) => {
            if checker.is_up_to_date().await? {
                UpdateDecision::UpToDate
            } else if checker.can_update(level).await? {
                UpdateDecision::CanUpdate(level)
            } else {
                UpdateDecision::CannotUpdate
            }
        }
        None => checker.decide().await?,
    };

    let updated_dependency = match decision {
        UpdateDecision::CanUpdate(level) => {
            checker.updated_dependencies(level).await?.into_iter().next()
        }
        _ => None,
    };

    Ok(CheckReport {
        dependency: dependency.name.clone(),
        current_version: dependency.version.clone(),
        source,
        strategy,
        vulnerable: checker.is_vulnerable(),
        latest_version,
        decision,
        updated_dependency,
    })
}

/// Orchestrator for a single dependency check
pub struct Orchestrator {
    args: CliArgs,
    config: Config,
    registry: Arc<dyn RegistryAdapter>,
    oracle: Arc<dyn ResolverOracle>,
}

impl Orchestrator {
    /// Create an orchestrator backed by Packagist and the composer binary
    pub fn new(args: CliArgs) -> Result<Self, AppError> {
        let config = Config::load_for(&args.path, args.config.as_deref())?;
        let client = HttpClient::new()?;
        let binary = args
            .composer
            .clone()
            .or_else(|| config.composer_binary.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPOSER_BINARY));
        log::debug!("using composer at {}", binary.display());

        Ok(Self {
            args,
            config,
            registry: Arc::new(PackagistAdapter::new(client)),
            oracle: Arc::new(ComposerProcessResolver::with_binary(binary)),
        })
    }

    /// Create an orchestrator with custom collaborators (for testing)
    pub fn with_collaborators(
        args: CliArgs,
        config: Config,
        registry: Arc<dyn RegistryAdapter>,
        oracle: Arc<dyn ResolverOracle>,
    ) -> Self {
        Self {
            args,
            config,
            registry,
            oracle,
        }
    }

    /// Strategy from the command line, then the config file
    fn strategy(&self) -> UpdateStrategy {
        self.args
            .strategy
            .or(self.config.strategy)
            .unwrap_or_default()
    }

    /// Ignored ranges from the config file followed by `--ignore` flags
    fn ignored_versions(&self) -> Vec<String> {
        let mut ignored = self.config.ignored_versions(&self.args.dependency);
        ignored.extend(self.args.ignore.iter().cloned());
        ignored
    }

    /// Build the checker for the requested dependency
    pub fn build_checker(&self, files: DependencyFiles) -> Result<ComposerUpdateChecker, AppError> {
        let dependency = parse_dependency(&files, &self.args.dependency)?;
        Ok(ComposerUpdateChecker::new(
            dependency,
            files,
            Arc::clone(&self.registry),
            Arc::clone(&self.oracle),
        )
        .with_credentials(self.config.credentials.clone())
        .with_ignored_versions(self.ignored_versions())
        .with_advisories(self.config.advisories_for(&self.args.dependency))
        .with_strategy(self.strategy()))
    }

    /// Run the check
    pub async fn run(&self) -> Result<CheckReport, AppError> {
        self.run_with_progress(!self.args.quiet && !self.args.json)
            .await
    }

    /// Run the check with optional progress display
    pub async fn run_with_progress(&self, show_progress: bool) -> Result<CheckReport, AppError> {
        let mut progress = Progress::new(show_progress);

        progress.step("Reading composer files...");
        let files = DependencyFiles::from_dir(&self.args.path)?;
        let checker = self.build_checker(files)?;
        log::info!(
            "checking {} ({} source)",
            self.args.dependency,
            checker.source_kind()
        );

        progress.step(&format!("Checking {}...", self.args.dependency));
        let report = check(
            &checker,
            checker.source_kind(),
            checker.strategy(),
            self.args.unlock,
        )
        .await;
        progress.finish();

        Ok(report?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IgnoreRule;
    use crate::domain::Credential;
    use crate::error::RegistryError;
    use crate::registry::RegistrySet;
    use crate::resolver::{Resolution, ResolutionFailure, ResolveRequest};
    use crate::update::VersionInfo;
    use async_trait::async_trait;
    use clap::Parser;
    use tempfile::TempDir;

    struct StaticRegistry;

    #[async_trait]
    impl RegistryAdapter for StaticRegistry {
        fn registry_name(&self) -> &'static str {
            "static"
        }

        async fn fetch_versions(
            &self,
            _package: &str,
            _registries: &RegistrySet,
            _credentials: &[Credential],
        ) -> Result<Vec<VersionInfo>, RegistryError> {
            Ok(["1.0.1", "1.1.0", "1.2.0", "2.0.0"]
                .iter()
                .filter_map(|v| VersionInfo::parse(v, None))
                .collect())
        }
    }

    /// Resolves to 2.0.0 only when the requirement is fully unlocked up to it
    struct ManifestOracle;

    #[async_trait]
    impl ResolverOracle for ManifestOracle {
        async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolutionFailure> {
            let version = if request.manifest.contains(">= 1.0.1, <= 2.0.0") {
                "2.0.0"
            } else {
                "1.2.0"
            };
            Ok(Resolution::new(version, None))
        }
    }

    const MANIFEST: &str = r#"{"require": {"acme/widget": "^1.0"}}"#;
    const LOCKFILE: &str = r#"{"packages": [{"name": "acme/widget", "version": "1.0.1"}]}"#;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("composer.json"), MANIFEST).unwrap();
        std::fs::write(dir.path().join("composer.lock"), LOCKFILE).unwrap();
        dir
    }

    fn make_args(dir: &TempDir, extra: &[&str]) -> CliArgs {
        let path = dir.path().to_string_lossy().to_string();
        let mut args = vec!["composer-update-checker", "acme/widget", path.as_str()];
        args.extend_from_slice(extra);
        CliArgs::parse_from(args)
    }

    fn orchestrator(args: CliArgs, config: Config) -> Orchestrator {
        Orchestrator::with_collaborators(
            args,
            config,
            Arc::new(StaticRegistry),
            Arc::new(ManifestOracle),
        )
    }

    #[test]
    fn test_strategy_cli_overrides_config() {
        let dir = project();
        let config = Config {
            strategy: Some(UpdateStrategy::LockfileOnly),
            ..Config::default()
        };

        let orch = orchestrator(make_args(&dir, &[]), config.clone());
        assert_eq!(orch.strategy(), UpdateStrategy::LockfileOnly);

        let orch = orchestrator(make_args(&dir, &["--strategy", "widen-ranges"]), config);
        assert_eq!(orch.strategy(), UpdateStrategy::WidenRanges);
    }

    #[test]
    fn test_ignored_versions_are_merged() {
        let dir = project();
        let config = Config {
            ignore: vec![IgnoreRule {
                dependency: "acme/widget".to_string(),
                versions: vec!["2.x".to_string()],
            }],
            ..Config::default()
        };
        let orch = orchestrator(make_args(&dir, &["--ignore", "1.2.0"]), config);
        assert_eq!(orch.ignored_versions(), vec!["2.x", "1.2.0"]);
    }

    #[tokio::test]
    async fn test_run_reports_update() {
        let dir = project();
        let orch = orchestrator(make_args(&dir, &[]), Config::default());
        let report = orch.run_with_progress(false).await.unwrap();

        assert_eq!(report.dependency, "acme/widget");
        assert_eq!(report.source, SourceKind::Registry);
        assert_eq!(report.latest_version.as_ref().unwrap().to_string(), "2.0.0");
        assert_eq!(
            report.decision,
            UpdateDecision::CanUpdate(RequirementsToUnlock::None)
        );
        assert_eq!(report.target_version().unwrap().to_string(), "1.2.0");
    }

    #[tokio::test]
    async fn test_run_with_explicit_unlock_level() {
        let dir = project();
        let orch = orchestrator(make_args(&dir, &["--unlock", "own"]), Config::default());
        let report = orch.run_with_progress(false).await.unwrap();

        assert_eq!(
            report.decision,
            UpdateDecision::CanUpdate(RequirementsToUnlock::Own)
        );
        let updated = report.updated_dependency.unwrap();
        assert_eq!(updated.version.unwrap().to_string(), "2.0.0");
        assert_eq!(
            updated.requirements[0].requirement.as_deref(),
            Some("^2.0")
        );
    }

    #[tokio::test]
    async fn test_run_with_ignored_major() {
        let dir = project();
        let orch = orchestrator(
            make_args(&dir, &["--ignore", ">= 2.0.0.a", "--unlock", "own"]),
            Config::default(),
        );
        let report = orch.run_with_progress(false).await.unwrap();
        assert_eq!(report.latest_version.unwrap().to_string(), "1.2.0");
        assert_eq!(
            report.decision,
            UpdateDecision::CanUpdate(RequirementsToUnlock::Own)
        );
    }

    #[tokio::test]
    async fn test_run_unknown_dependency() {
        let dir = project();
        let path = dir.path().to_string_lossy().to_string();
        let args = CliArgs::parse_from(["composer-update-checker", "acme/missing", path.as_str()]);
        let result = orchestrator(args, Config::default())
            .run_with_progress(false)
            .await;
        assert!(matches!(result, Err(AppError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_run_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let result = orchestrator(make_args(&dir, &[]), Config::default())
            .run_with_progress(false)
            .await;
        assert!(matches!(result, Err(AppError::Manifest(_))));
    }
}
