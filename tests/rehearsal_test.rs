use account_purge::utils::validation::Validate;
use account_purge::{build_ports, AccountDeletionOrchestrator, DeletionStep, FailurePolicy, PurgeConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_rehearsal_from_config_file() {
    let file = write_config(
        r#"
[orchestrator]
failure_policy = "stop"
concurrent_dependents = true

[backend]
type = "memory"
rehearsal_user = "demo"
rehearsal_records = 5
"#,
    );

    let config = PurgeConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();

    let orchestrator =
        AccountDeletionOrchestrator::new(build_ports(&config).unwrap()).with_options(config.deletion_options());
    assert_eq!(orchestrator.options().failure_policy, FailurePolicy::StopOnFirstFailure);
    assert_eq!(orchestrator.plan(), &DeletionStep::ALL);

    let result = tokio_test::block_on(orchestrator.delete_account());
    assert!(result.succeeded);
    assert_eq!(result.user_id.as_deref(), Some("demo"));

    let again = tokio_test::block_on(orchestrator.delete_account());
    assert!(again.is_not_authenticated());
}

#[tokio::test]
async fn test_memory_backend_without_session_deletes_nothing() {
    let file = write_config("[backend]\ntype = \"memory\"\n");
    let config = PurgeConfig::from_file(file.path()).unwrap();

    let result = AccountDeletionOrchestrator::new(build_ports(&config).unwrap())
        .delete_account()
        .await;

    assert!(result.is_not_authenticated());
    let summary = result.summary();
    assert_eq!(summary.get("steps_attempted").unwrap(), &serde_json::json!(0));
    assert_eq!(summary.get("failure").unwrap(), &serde_json::json!("not authenticated"));
}

#[test]
fn test_http_backend_from_config() {
    let file = write_config(
        r#"
[backend]
type = "http"
base_url = "https://accounts.example.com/api"
timeout_seconds = 5
"#,
    );
    let config = PurgeConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();

    assert!(build_ports(&config).is_ok());
}
