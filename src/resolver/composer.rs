//! Resolution through the composer binary
//!
//! Every call writes the request's files into a fresh scratch directory,
//! runs `composer update` without installing anything, and reads the
//! version composer locked for the dependency.

use crate::domain::Credential;
use crate::manifest::{ComposerLock, ManifestWriter, LOCKFILE_FILENAME, MANIFEST_FILENAME};
use crate::package_manager::{ComposerRunner, SystemComposer};
use crate::registry::host_of;
use crate::resolver::{
    FailureReason, Resolution, ResolutionFailure, ResolveRequest, ResolverOracle, UnlockScope,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::LazyLock;

/// Flags passed to every `composer update`
const UPDATE_FLAGS: [&str; 6] = [
    "--no-install",
    "--no-scripts",
    "--no-plugins",
    "--no-interaction",
    "--no-progress",
    "--no-audit",
];

const GITHUB_HOST: &str = "github.com";

static CONFLICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)could not be resolved to an installable set of packages|conflicts? with|no matching package found").unwrap()
});

static MISSING_EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)requires ((?:ext|lib)-[\w.-]+)\b[^\n]*?(?:it is )?missing from your system").unwrap()
});

static MISSING_EXTENSION_LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)the requested PHP extension ([\w.-]+) is missing from your system").unwrap()
});

static UNREACHABLE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"Failed to execute git clone --(?:mirror|no-checkout)[^']*'([^']+)'",
        r"Failed to clone the (\S+) repository",
        r"fatal: repository '([^']+)' not found",
        r#"The "(https?://[^"]+)" file could not be downloaded \(HTTP/\S+ 404"#,
        r"Failed to download [^\s]+ from source: .*?'([^']+)'",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static AUTH_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)could not be authenticated|invalid credentials|HTTP/\S+ 40[13]|status code 40[13]|authentication required").unwrap()
});

static TIMEOUT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)timed out|timeout was reached").unwrap());

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:https?|ssh|git)://[^\s'"]+|git@[^\s'":]+:[^\s'"]+"#).unwrap());

/// Oracle backed by a real `composer` process
pub struct ComposerProcessResolver<R: ComposerRunner = SystemComposer> {
    runner: R,
}

impl ComposerProcessResolver<SystemComposer> {
    /// Resolve with the composer executable at `binary`
    pub fn with_binary(binary: impl Into<std::path::PathBuf>) -> Self {
        Self::new(SystemComposer::new(binary))
    }
}

impl<R: ComposerRunner> ComposerProcessResolver<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn update_args(request: &ResolveRequest) -> Vec<String> {
        let mut args = vec!["update".to_string()];
        if request.lockfile.is_some() && request.unlock == UnlockScope::Dependency {
            args.push(request.dependency_name.clone());
            args.push("--with-dependencies".to_string());
        }
        args.extend(UPDATE_FLAGS.iter().map(|f| f.to_string()));
        args
    }

    async fn write_files(request: &ResolveRequest, dir: &Path) -> Result<(), ResolutionFailure> {
        let mut writer = ManifestWriter::parse(&request.manifest)
            .map_err(|e| ResolutionFailure::other(e.to_string()))?;
        writer.with_platform_overrides(&request.platform_overrides);
        let manifest = writer
            .render()
            .map_err(|e| ResolutionFailure::other(e.to_string()))?;

        write_file(&dir.join(MANIFEST_FILENAME), &manifest).await?;
        if let Some(lockfile) = &request.lockfile {
            write_file(&dir.join(LOCKFILE_FILENAME), lockfile).await?;
        }
        Ok(())
    }

    async fn read_resolution(
        request: &ResolveRequest,
        dir: &Path,
    ) -> Result<Resolution, ResolutionFailure> {
        let path = dir.join(LOCKFILE_FILENAME);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ResolutionFailure::other(format!("composer did not write {}: {}", LOCKFILE_FILENAME, e))
        })?;
        let lock: ComposerLock = serde_json::from_str(&content)
            .map_err(|e| ResolutionFailure::other(format!("invalid {}: {}", LOCKFILE_FILENAME, e)))?;

        let package = lock.package(&request.dependency_name).ok_or_else(|| {
            ResolutionFailure::other(format!(
                "{} is missing from the resolved {}",
                request.dependency_name, LOCKFILE_FILENAME
            ))
        })?;
        Ok(Resolution::new(
            package.version.clone(),
            package.reference().map(str::to_string),
        ))
    }
}

#[async_trait]
impl<R: ComposerRunner> ResolverOracle for ComposerProcessResolver<R> {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolutionFailure> {
        let dir = tempfile::TempDir::new()
            .map_err(|e| ResolutionFailure::other(format!("failed to create scratch directory: {}", e)))?;
        Self::write_files(request, dir.path()).await?;

        let args = Self::update_args(request);
        let mut env = vec![("COMPOSER_NO_INTERACTION".to_string(), "1".to_string())];
        if let Some(auth) = composer_auth(&request.credentials) {
            env.push(("COMPOSER_AUTH".to_string(), auth));
        }

        log::debug!(
            "resolving {} ({:?} unlock, {} platform override(s))",
            request.dependency_name,
            request.unlock,
            request.platform_overrides.len()
        );
        let output = self
            .runner
            .run(&args, dir.path(), &env)
            .await
            .map_err(|e| ResolutionFailure::other(format!("failed to run composer: {}", e)))?;

        if !output.success {
            let failure = classify_failure(&output.combined_output());
            log::debug!("`{}` failed: {:?}", output.command, failure.reason);
            return Err(failure);
        }

        Self::read_resolution(request, dir.path()).await
    }
}

async fn write_file(path: &Path, content: &str) -> Result<(), ResolutionFailure> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ResolutionFailure::other(format!("failed to write {}: {}", path.display(), e)))
}

/// `COMPOSER_AUTH` JSON for the given credentials
///
/// Registry credentials become `http-basic` entries. Git credentials for
/// github.com become a `github-oauth` token, other git hosts `http-basic`.
fn composer_auth(credentials: &[Credential]) -> Option<String> {
    if credentials.is_empty() {
        return None;
    }

    let mut http_basic = Map::new();
    let mut github_oauth = Map::new();
    for credential in credentials {
        let host = host_of(credential.host());
        match credential {
            Credential::GitSource { password, .. } if host == GITHUB_HOST => {
                github_oauth.insert(host, Value::String(password.clone()));
            }
            _ => {
                http_basic.insert(
                    host,
                    json!({"username": credential.username(), "password": credential.password()}),
                );
            }
        }
    }

    let mut auth = Map::new();
    if !http_basic.is_empty() {
        auth.insert("http-basic".to_string(), Value::Object(http_basic));
    }
    if !github_oauth.is_empty() {
        auth.insert("github-oauth".to_string(), Value::Object(github_oauth));
    }
    Some(Value::Object(auth).to_string())
}

/// Classify composer's output for a failed update
///
/// Checked in order: authentication, timeouts, unreachable sources,
/// missing platform packages, conflicts.
pub fn classify_failure(output: &str) -> ResolutionFailure {
    let detail = output.trim().to_string();

    if let Some(line) = output.lines().find(|l| AUTH_LINE_RE.is_match(l)) {
        let host = find_url(line)
            .map(host_of)
            .unwrap_or_else(|| "unknown host".to_string());
        return ResolutionFailure::new(FailureReason::AuthenticationFailure { host }, detail);
    }

    if let Some(line) = output.lines().find(|l| TIMEOUT_LINE_RE.is_match(l)) {
        if let Some(url) = find_url(line) {
            return ResolutionFailure::new(
                FailureReason::TimedOut {
                    url: url.to_string(),
                },
                detail,
            );
        }
    }

    let mut urls: Vec<String> = UNREACHABLE_RES
        .iter()
        .flat_map(|re| re.captures_iter(output))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();
    if !urls.is_empty() {
        urls.sort();
        urls.dedup();
        return ResolutionFailure::new(FailureReason::UnreachableSource { urls }, detail);
    }

    let missing = MISSING_EXTENSION_RE
        .captures(output)
        .map(|caps| caps[1].to_ascii_lowercase())
        .or_else(|| {
            MISSING_EXTENSION_LEGACY_RE
                .captures(output)
                .map(|caps| format!("ext-{}", caps[1].to_ascii_lowercase()))
        });
    if let Some(name) = missing {
        return ResolutionFailure::new(FailureReason::MissingPlatformRequirement { name }, detail);
    }

    if CONFLICT_RE.is_match(output) {
        return ResolutionFailure::new(FailureReason::Conflict, detail);
    }

    ResolutionFailure::other(detail)
}

/// First URL in `line`, without trailing punctuation
fn find_url(line: &str) -> Option<&str> {
    URL_RE
        .find(line)
        .map(|m| m.as_str().trim_end_matches(|c| matches!(c, ':' | ',' | '.' | ')')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_manager::CommandResult;
    use std::sync::Mutex;

    /// Runner that records its invocation and writes a canned lockfile
    struct FakeComposer {
        lockfile: Option<String>,
        stderr: String,
        calls: Mutex<Vec<(Vec<String>, Vec<(String, String)>, String)>>,
    }

    impl FakeComposer {
        fn succeeding(lockfile: &str) -> Self {
            Self {
                lockfile: Some(lockfile.to_string()),
                stderr: String::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(stderr: &str) -> Self {
            Self {
                lockfile: None,
                stderr: stderr.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ComposerRunner for FakeComposer {
        async fn run(
            &self,
            args: &[String],
            working_dir: &Path,
            env: &[(String, String)],
        ) -> std::io::Result<CommandResult> {
            let manifest = tokio::fs::read_to_string(working_dir.join(MANIFEST_FILENAME)).await?;
            self.calls
                .lock()
                .unwrap()
                .push((args.to_vec(), env.to_vec(), manifest));
            match &self.lockfile {
                Some(lock) => {
                    tokio::fs::write(working_dir.join(LOCKFILE_FILENAME), lock).await?;
                    Ok(CommandResult::success(args.join(" "), String::new(), String::new()))
                }
                None => Ok(CommandResult::failure(
                    args.join(" "),
                    String::new(),
                    self.stderr.clone(),
                )),
            }
        }
    }

    const RESOLVED_LOCK: &str = r#"{"packages": [
        {"name": "monolog/monolog", "version": "1.22.1", "source": {"type": "git", "url": "https://github.com/Seldaek/monolog.git", "reference": "1e044bc4b34e91743943479f1be7a1d5eb93add0"}}
    ]}"#;

    fn request() -> ResolveRequest {
        ResolveRequest::new(
            r#"{"require": {"monolog/monolog": ">= 1.0.1, <= 1.22.1"}}"#,
            Some(r#"{"packages": []}"#.to_string()),
            "monolog/monolog",
        )
    }

    #[tokio::test]
    async fn test_resolve_reads_locked_version() {
        let resolver = ComposerProcessResolver::new(FakeComposer::succeeding(RESOLVED_LOCK));
        let resolution = resolver.resolve(&request()).await.unwrap();
        assert_eq!(resolution.version, "1.22.1");
        assert_eq!(
            resolution.reference.as_deref(),
            Some("1e044bc4b34e91743943479f1be7a1d5eb93add0")
        );

        let calls = resolver.runner.calls.lock().unwrap();
        let (args, env, _) = &calls[0];
        assert_eq!(&args[..3], &["update", "monolog/monolog", "--with-dependencies"]);
        assert!(args.contains(&"--no-install".to_string()));
        assert!(env.iter().all(|(k, _)| k != "COMPOSER_AUTH"));
    }

    #[tokio::test]
    async fn test_full_unlock_updates_everything() {
        let resolver = ComposerProcessResolver::new(FakeComposer::succeeding(RESOLVED_LOCK));
        let req = request().with_unlock(UnlockScope::All);
        resolver.resolve(&req).await.unwrap();

        let calls = resolver.runner.calls.lock().unwrap();
        assert_eq!(calls[0].0[0], "update");
        assert_eq!(calls[0].0[1], "--no-install");
    }

    #[tokio::test]
    async fn test_platform_overrides_and_auth_are_passed() {
        let resolver = ComposerProcessResolver::new(FakeComposer::succeeding(RESOLVED_LOCK));
        let mut overrides = std::collections::BTreeMap::new();
        overrides.insert("ext-intl".to_string(), "0.0.0".to_string());
        let req = request()
            .with_platform_overrides(overrides)
            .with_credentials(vec![Credential::PackageRegistry {
                registry: "https://php.fury.io/acme".to_string(),
                username: "token".to_string(),
                password: "secret".to_string(),
            }]);
        resolver.resolve(&req).await.unwrap();

        let calls = resolver.runner.calls.lock().unwrap();
        let (_, env, manifest) = &calls[0];
        let written: Value = serde_json::from_str(manifest).unwrap();
        assert_eq!(written["config"]["platform"]["ext-intl"], "0.0.0");

        let auth = env
            .iter()
            .find(|(k, _)| k == "COMPOSER_AUTH")
            .map(|(_, v)| v.clone())
            .unwrap();
        let auth: Value = serde_json::from_str(&auth).unwrap();
        assert_eq!(auth["http-basic"]["php.fury.io"]["username"], "token");
    }

    #[tokio::test]
    async fn test_failed_update_is_classified() {
        let resolver = ComposerProcessResolver::new(FakeComposer::failing(
            "Your requirements could not be resolved to an installable set of packages.\n\n  Problem 1\n    - Root composer.json requires monolog/monolog >=1.0.1,<=1.22.1 -> satisfiable by monolog/monolog[1.22.1].\n    - monolog/monolog 1.22.1 conflicts with acme/legacy 1.0.0.",
        ));
        let failure = resolver.resolve(&request()).await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::Conflict);
    }

    #[tokio::test]
    async fn test_dependency_missing_from_result() {
        let resolver =
            ComposerProcessResolver::new(FakeComposer::succeeding(r#"{"packages": []}"#));
        let failure = resolver.resolve(&request()).await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::Other);
    }

    /// Runner that reports success without writing a lockfile
    struct SilentComposer;

    #[async_trait]
    impl ComposerRunner for SilentComposer {
        async fn run(
            &self,
            args: &[String],
            working_dir: &Path,
            _env: &[(String, String)],
        ) -> std::io::Result<CommandResult> {
            tokio::fs::remove_file(working_dir.join(LOCKFILE_FILENAME)).await?;
            Ok(CommandResult::success(args.join(" "), String::new(), String::new()))
        }
    }

    #[tokio::test]
    async fn test_missing_lockfile_after_success() {
        let resolver = ComposerProcessResolver::new(SilentComposer);
        let failure = resolver.resolve(&request()).await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::Other);
        assert!(failure.detail.contains("composer did not write composer.lock"));
    }

    #[test]
    fn test_classify_missing_extension() {
        let failure = classify_failure(
            "Your requirements could not be resolved to an installable set of packages.\n  Problem 1\n    - acme/pdf 2.0.0 requires ext-gd * -> it is missing from your system. Install or enable PHP's gd extension.",
        );
        assert_eq!(
            failure.reason,
            FailureReason::MissingPlatformRequirement {
                name: "ext-gd".to_string()
            }
        );

        let legacy = classify_failure(
            "  Problem 1\n    - The requested PHP extension intl is missing from your system.",
        );
        assert_eq!(
            legacy.reason,
            FailureReason::MissingPlatformRequirement {
                name: "ext-intl".to_string()
            }
        );
    }

    #[test]
    fn test_classify_unreachable_git_source() {
        let failure = classify_failure(
            "Failed to execute git clone --mirror -- 'https://github.com/acme/missing.git' '/tmp/cache/vcs/acme'\n\nCloning into bare repository...\nfatal: repository 'https://github.com/acme/missing.git/' not found",
        );
        match failure.reason {
            FailureReason::UnreachableSource { urls } => {
                assert!(urls.contains(&"https://github.com/acme/missing.git".to_string()));
            }
            other => panic!("unexpected reason {:?}", other),
        }
    }

    #[test]
    fn test_classify_auth_failure_names_host() {
        let failure = classify_failure(
            "The 'https://php.fury.io/acme/packages.json' URL could not be accessed: HTTP/1.1 401 Unauthorized",
        );
        assert_eq!(
            failure.reason,
            FailureReason::AuthenticationFailure {
                host: "php.fury.io".to_string()
            }
        );

        let invalid = classify_failure("Invalid credentials for 'https://repo.example.com/packages.json', aborting.");
        assert_eq!(
            invalid.reason,
            FailureReason::AuthenticationFailure {
                host: "repo.example.com".to_string()
            }
        );
    }

    #[test]
    fn test_classify_timeout() {
        let failure = classify_failure(
            "curl error 28 while downloading https://php.fury.io/acme/packages.json: Operation timed out after 300000 milliseconds",
        );
        assert_eq!(
            failure.reason,
            FailureReason::TimedOut {
                url: "https://php.fury.io/acme/packages.json".to_string()
            }
        );
    }

    #[test]
    fn test_classify_other() {
        let failure = classify_failure("PHP Fatal error: Allowed memory size exhausted");
        assert_eq!(failure.reason, FailureReason::Other);
        assert!(failure.detail.contains("memory size"));
    }

    #[test]
    fn test_composer_auth() {
        assert!(composer_auth(&[]).is_none());
        let auth = composer_auth(&[
            Credential::GitSource {
                host: "github.com".to_string(),
                username: "x-access-token".to_string(),
                password: "ghs_token".to_string(),
            },
            Credential::GitSource {
                host: "gitlab.example.com".to_string(),
                username: "ci".to_string(),
                password: "pw".to_string(),
            },
        ])
        .unwrap();
        let auth: Value = serde_json::from_str(&auth).unwrap();
        assert_eq!(auth["github-oauth"]["github.com"], "ghs_token");
        assert_eq!(auth["http-basic"]["gitlab.example.com"]["username"], "ci");
    }
}
