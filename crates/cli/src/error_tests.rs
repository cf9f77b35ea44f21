use super::*;
use std::path::PathBuf;

#[test]
fn error_display() {
    let err = KitError::new("Something went wrong", Exit::Generic)
        .with_context("First context")
        .with_context("Second context")
        .with_suggestion("Try this")
        .with_suggestion("Or this");

    let output = format!("{}", err);
    assert!(output.contains("error: Something went wrong"));
    assert!(output.contains("-> First context"));
    assert!(output.contains("-> Second context"));
    assert!(output.contains("1. Try this"));
    assert!(output.contains("2. Or this"));
}

#[test]
fn unknown_task_carries_suggestions_and_exit_code() {
    let err: KitError = RegistryError::UnknownTask {
        name: "deplyo".to_string(),
        suggestions: vec!["deploy".to_string()],
    }
    .into();

    assert_eq!(err.exit, Exit::UnknownTask);
    assert!(err.to_string().contains("Did you mean: kit run deploy"));
}

#[test]
fn not_found_is_a_configuration_error() {
    let err: KitError = LoadError::NotFound(PathBuf::from("/tmp/x")).into();

    assert_eq!(err.exit, Exit::Configuration);
    assert!(err.to_string().contains("kit --config"));
}

#[test]
fn filtered_task_explains_why() {
    let err: KitError = RunError::TaskFiltered {
        task: "deploy".to_string(),
        stage: "local".to_string(),
        reason: "only runs on remote targets".to_string(),
    }
    .into();

    assert_eq!(err.exit, Exit::Configuration);
    assert!(err.to_string().contains("-> only runs on remote targets"));
}

#[test]
fn exit_codes() {
    assert_eq!(Exit::Success.code(), 0);
    assert_eq!(Exit::UnknownTask.code(), 2);
    assert_eq!(Exit::Failed.code(), 3);
    assert_eq!(Exit::Configuration.code(), 4);
    assert_eq!(Exit::Cancelled.code(), 130);
}
