use cofftool::load_config::{load_config, REPO_TOKEN_VAR, TRAVIS_TOKEN_VAR};
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::tempdir;

/// Static config plus env secrets produces a complete Config.
#[tokio::test]
#[serial]
async fn test_load_config_success_injects_env_secrets() {
    let dir = tempdir().expect("temp dir");
    let config_yaml = r#"
coverage_report: target/site/jacoco/jacoco.xml
source_root: src/main/java
output: target/coveralls.json
extensions: [java, kt]
travis:
  repository: ralleytn/simple-json
"#;
    let config_path = dir.path().join("cofftool.yaml");
    write(&config_path, config_yaml).unwrap();

    env::set_var(REPO_TOKEN_VAR, "repo-secret");
    env::set_var(TRAVIS_TOKEN_VAR, "travis-secret");

    let config = load_config(&config_path).expect("Config should load");

    assert_eq!(
        config.coverage_report,
        dir.path().join("target/site/jacoco/jacoco.xml")
    );
    assert_eq!(config.source_root, dir.path().join("src/main/java"));
    assert_eq!(config.output, dir.path().join("target/coveralls.json"));
    assert_eq!(config.extensions, vec!["java", "kt"]);
    assert_eq!(config.service_name, "travis-ci");
    assert_eq!(config.repo_token.as_deref(), Some("repo-secret"));
    let travis = config.travis.expect("travis section");
    assert_eq!(travis.repository, "ralleytn/simple-json");
    assert_eq!(travis.token.as_deref(), Some("travis-secret"));

    env::remove_var(REPO_TOKEN_VAR);
    env::remove_var(TRAVIS_TOKEN_VAR);
}

/// Optional sections default sensibly and absent secrets stay unset.
#[tokio::test]
#[serial]
async fn test_load_config_defaults_without_env() {
    env::remove_var(REPO_TOKEN_VAR);
    env::remove_var(TRAVIS_TOKEN_VAR);

    let dir = tempdir().expect("temp dir");
    let config_path = dir.path().join("cofftool.yaml");
    write(
        &config_path,
        "coverage_report: /abs/jacoco.xml\nsource_root: /abs/src\nservice_job_id: \"42\"\n",
    )
    .unwrap();

    let config = load_config(&config_path).expect("Config should load");
    assert_eq!(config.coverage_report, std::path::PathBuf::from("/abs/jacoco.xml"));
    assert_eq!(config.output, dir.path().join("coveralls.json"));
    assert_eq!(config.extensions, vec!["java"]);
    assert_eq!(config.service_job_id.as_deref(), Some("42"));
    assert!(config.repo_token.is_none());
    assert!(config.travis.is_none());
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_on_missing_file_or_bad_yaml() {
    let dir = tempdir().expect("temp dir");
    assert!(load_config(dir.path().join("missing.yaml")).is_err());

    let config_path = dir.path().join("broken.yaml");
    write(&config_path, "source_root: [unterminated\n").unwrap();
    let err = load_config(&config_path).unwrap_err();
    assert!(
        format!("{err:#}").contains("Failed to parse config YAML"),
        "unexpected error: {err:#}"
    );
}

use cofftool::cli::{resolve_config, RunArgs};
use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Collects the Debug rendering of every event.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

/// Secrets of a config file are read from the environment exactly once, and a Travis
/// repository given on the command line still picks up the token.
#[test]
#[serial]
fn resolve_config_reads_env_secrets_once() {
    let dir = tempdir().expect("temp dir");
    let config_path = dir.path().join("cofftool.yaml");
    write(
        &config_path,
        "coverage_report: jacoco.xml\nsource_root: src\n",
    )
    .unwrap();

    env::set_var(REPO_TOKEN_VAR, "repo-secret");
    env::set_var(TRAVIS_TOKEN_VAR, "travis-secret");

    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector {
        events: events.clone(),
    });
    let config = tracing::subscriber::with_default(subscriber, || {
        resolve_config(&RunArgs {
            config: Some(config_path.clone()),
            travis_repository: Some("ralleytn/simple-json".into()),
            ..RunArgs::default()
        })
    })
    .expect("config resolves");

    env::remove_var(REPO_TOKEN_VAR);
    env::remove_var(TRAVIS_TOKEN_VAR);

    assert_eq!(config.repo_token.as_deref(), Some("repo-secret"));
    let travis = config.travis.expect("travis section from flag");
    assert_eq!(travis.repository, "ralleytn/simple-json");
    assert_eq!(travis.token.as_deref(), Some("travis-secret"));

    let events = events.lock().unwrap();
    let repo_token_logs = events
        .iter()
        .filter(|msg| msg.contains("COVERALLS_REPO_TOKEN found in env"))
        .count();
    assert_eq!(repo_token_logs, 1, "events: {:?}", events);
}
