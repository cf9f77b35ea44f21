// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::outcome::FailureKind;
use kit_adapters::FakeExecutor;
use kit_core::HostDescriptor;

fn ctx() -> Context {
    Context::new("/srv/app")
}

#[tokio::test]
async fn shell_step_runs_interpolated_command() {
    let fake = FakeExecutor::new();
    let step = Step::shell("push", "docker push {image}");
    let ctx = ctx().with_extra("image", "shop:1.2");

    let outcome = step.execute(&ctx, &fake).await;

    assert!(outcome.is_success());
    assert_eq!(fake.commands(), vec!["docker push shop:1.2"]);
}

#[tokio::test]
async fn undefined_template_variable_is_left_in_place() {
    let fake = FakeExecutor::new();
    let step = Step::shell("push", "docker push {image}");

    step.execute(&ctx(), &fake).await;

    assert_eq!(fake.commands(), vec!["docker push {image}"]);
}

#[tokio::test]
async fn non_zero_exit_is_command_failed() {
    let fake = FakeExecutor::new();
    fake.fail_with("make", 2, "no rule");

    let outcome = Step::shell("build", "make").execute(&ctx(), &fake).await;

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::CommandFailed);
    assert_eq!(failure.command.as_deref(), Some("make"));
    assert_eq!(outcome.result().unwrap().exit_code(), 2);
    assert_eq!(outcome.result().unwrap().stderr_lossy(), "no rule");
}

#[tokio::test]
async fn allow_failure_turns_non_zero_exit_into_success() {
    let fake = FakeExecutor::new();
    fake.fail_on("grep", 1);

    let outcome = Step::shell("grep-log", "grep x log")
        .allow_failure()
        .execute(&ctx(), &fake)
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.result().unwrap().exit_code(), 1);
}

#[tokio::test]
async fn timeout_is_reported_as_timeout() {
    let fake = FakeExecutor::new();
    fake.timeout_on("sleep");

    let outcome = Step::shell("wait", "sleep 100")
        .timeout(Duration::from_secs(1))
        .execute(&ctx(), &fake)
        .await;

    assert_eq!(outcome.failure().unwrap().kind, FailureKind::Timeout);
    assert!(outcome.result().unwrap().timed_out());
}

#[tokio::test]
async fn configuration_error_is_fatal() {
    let fake = FakeExecutor::new();
    fake.configuration_error_on("deploy", "no host");

    let outcome = Step::shell("deploy", "deploy").execute(&ctx(), &fake).await;

    assert!(outcome.is_fatal());
    assert_eq!(outcome.failure().unwrap().kind, FailureKind::Configuration);
}

#[tokio::test]
async fn options_are_passed_to_the_executor() {
    let fake = FakeExecutor::new();
    Step::shell("build", "make")
        .timeout(Duration::from_secs(5))
        .local()
        .execute(&ctx(), &fake)
        .await;

    let calls = fake.calls();
    let call = &calls[0];
    assert_eq!(call.opts.timeout, Some(Duration::from_secs(5)));
    assert!(call.opts.local);
    assert!(!call.opts.allow_failure);
}

#[tokio::test]
async fn only_remote_step_is_skipped_locally() {
    let fake = FakeExecutor::new();
    let step = Step::shell("restart", "systemctl restart app").only(Target::Remote);

    let outcome = step.execute(&ctx(), &fake).await;

    assert!(matches!(outcome, StepOutcome::Skipped(_)));
    assert!(fake.commands().is_empty());

    let remote = ctx().with_host(HostDescriptor::new("web1"));
    assert!(step.execute(&remote, &fake).await.is_success());
    assert_eq!(fake.commands().len(), 1);
}

#[tokio::test]
async fn wait_for_succeeds_on_first_passing_check() {
    let fake = FakeExecutor::new();
    let step = Step::wait_for("ready", "curl -sf localhost/health");

    let outcome = step.execute(&ctx(), &fake).await;

    assert!(outcome.is_success());
    assert_eq!(fake.commands().len(), 1);
    assert!(fake.calls()[0].opts.allow_failure);
}

#[tokio::test]
async fn wait_for_gives_up_after_max_checks() {
    let fake = FakeExecutor::new();
    fake.fail_on("curl", 7);
    let step = Step::wait_for("ready", "curl -sf localhost/health").checks(Duration::ZERO, 3);

    let outcome = step.execute(&ctx(), &fake).await;

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::ConditionNotMet);
    assert_eq!(failure.result.as_ref().unwrap().exit_code(), 7);
    assert_eq!(fake.commands().len(), 3);
}

#[tokio::test]
async fn wait_for_stops_on_configuration_error() {
    let fake = FakeExecutor::new();
    fake.configuration_error_on("curl", "no host");
    let step = Step::wait_for("ready", "curl").checks(Duration::ZERO, 5);

    let outcome = step.execute(&ctx(), &fake).await;

    assert!(outcome.is_fatal());
    assert_eq!(fake.commands().len(), 1);
}

#[tokio::test]
async fn dry_run_records_instead_of_running() {
    let fake = FakeExecutor::new();
    fake.fail_on("make", 2);

    let outcome = Step::shell("build", "make")
        .execute(&ctx().with_dry_run(true), &fake)
        .await;

    let result = outcome.result().unwrap();
    assert!(result.is_dry_run());
    assert_eq!(result.stdout_lossy(), "[dry-run] make\n");
}

#[tokio::test]
async fn rollback_hook_runs_its_own_command() {
    let fake = FakeExecutor::new();
    let step = Step::shell("migrate", "migrate up").with_rollback("migrate down");

    let outcome = step.execute_rollback(&ctx(), &fake).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(fake.commands(), vec!["migrate down"]);
    assert!(Step::shell("build", "make")
        .execute_rollback(&ctx(), &fake)
        .await
        .is_none());
}

#[tokio::test]
async fn local_step_rollback_is_also_local() {
    let step = Step::shell("tag", "git tag v1").local().with_rollback("git tag -d v1");

    match step.rollback().unwrap() {
        Action::Shell { options, .. } => assert!(options.local),
        other => panic!("unexpected rollback action {:?}", other),
    }
}

struct Announce;

#[async_trait]
impl CustomAction for Announce {
    fn describe(&self) -> String {
        "announce the release".to_string()
    }

    async fn run(&self, ctx: &Context, executor: &dyn CommandExecutor) -> StepOutcome {
        let channel = ctx.capability::<String>();
        let Some(channel) = channel else {
            return StepOutcome::failed(FailureKind::Action, "no channel configured");
        };
        match executor
            .run(&format!("notify {}", channel), ctx, &RunOptions::default())
            .await
        {
            Ok(result) => StepOutcome::Success(Some(result)),
            Err(e) => StepOutcome::Failed(crate::outcome::StepFailure::from_exec(e, "notify")),
        }
    }
}

#[tokio::test]
async fn custom_action_reads_capabilities_from_context() {
    let fake = FakeExecutor::new();
    let step = Step::custom("announce", Announce);

    let missing = step.execute(&ctx(), &fake).await;
    assert_eq!(missing.failure().unwrap().kind, FailureKind::Action);

    let ctx = ctx().with_capability("#releases".to_string());
    assert!(step.execute(&ctx, &fake).await.is_success());
    assert_eq!(fake.commands(), vec!["notify #releases"]);
    assert_eq!(step.action().describe(), "announce the release");
}

#[tokio::test]
async fn context_env_wins_over_shell_default() {
    let executor = kit_adapters::LocalExecutor::new();
    let ctx = Context::new(std::env::temp_dir()).with_env("KIT_STEP_APP_ENV", "prod");
    let step = Step::shell("show-env", "echo ${KIT_STEP_APP_ENV:-dev}");

    let outcome = step.execute(&ctx, &executor).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.result().unwrap().stdout_lossy(), "prod\n");
}

#[tokio::test]
async fn shell_expansion_named_like_template_var_is_kept() {
    let fake = FakeExecutor::new();
    let ctx = ctx().with_extra("stage", "prod");

    Step::shell("suffix", "echo ${stage}_suffix {stage}")
        .execute(&ctx, &fake)
        .await;

    assert_eq!(fake.commands(), vec!["echo ${stage}_suffix prod"]);
}

#[tokio::test]
async fn copy_step_renders_both_ends() {
    let fake = FakeExecutor::new();
    let ctx = ctx().with_extra("image", "shop");
    let step = Step::copy("ship", "dist/{image}.tar", "/srv/releases/{image}.tar");

    let outcome = step.execute(&ctx, &fake).await;

    assert!(outcome.is_success());
    assert_eq!(
        fake.commands(),
        vec!["copy dist/shop.tar -> /srv/releases/shop.tar"]
    );
}

#[tokio::test]
async fn failed_copy_reports_its_label() {
    let fake = FakeExecutor::new();
    fake.fail_on("copy app.tar", 1);

    let outcome = Step::copy("ship", "app.tar", "/srv").execute(&ctx(), &fake).await;

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::CommandFailed);
    assert_eq!(failure.command.as_deref(), Some("copy app.tar -> /srv"));
}

#[tokio::test]
async fn unreadable_source_is_transfer_failure() {
    let dir = tempfile::tempdir().unwrap();
    let executor = kit_adapters::LocalExecutor::new();
    let ctx = Context::new(dir.path());

    let outcome = Step::copy("ship", "missing.tar", "out.tar")
        .execute(&ctx, &executor)
        .await;

    assert_eq!(outcome.failure().unwrap().kind, FailureKind::Transfer);
    assert!(!outcome.is_fatal());
}

#[tokio::test]
async fn existing_created_path_skips_the_step() {
    let fake = FakeExecutor::new();
    let step = Step::shell("unpack", "tar xf app.tar").creates("app/{stage}");
    let ctx = ctx().with_extra("stage", "prod");

    let outcome = step.execute(&ctx, &fake).await;

    assert!(matches!(outcome, StepOutcome::Skipped(ref reason) if reason == "app/prod already exists"));
    assert_eq!(fake.commands(), vec!["test -e 'app/prod'"]);
}

#[tokio::test]
async fn missing_created_path_runs_the_step() {
    let fake = FakeExecutor::new();
    fake.fail_on("test -e", 1);
    let step = Step::shell("unpack", "tar xf app.tar").creates("app");

    let outcome = step.execute(&ctx(), &fake).await;

    assert!(outcome.is_success());
    assert_eq!(fake.commands(), vec!["test -e 'app'", "tar xf app.tar"]);
}

#[tokio::test]
async fn local_step_checks_created_path_locally() {
    let fake = FakeExecutor::new();
    fake.fail_on("test -e", 1);
    let ctx = ctx().with_host(HostDescriptor::new("web1"));
    let step = Step::shell("build", "make").local().creates("dist");

    step.execute(&ctx, &fake).await;

    let calls = fake.calls();
    assert!(calls[0].host.is_none());
    assert_eq!(calls[1].command, "make");
}

#[tokio::test]
async fn dry_run_never_skips_on_created_path() {
    let fake = FakeExecutor::new();
    let step = Step::shell("unpack", "tar xf app.tar").creates("app");

    let outcome = step.execute(&ctx().with_dry_run(true), &fake).await;

    assert!(outcome.result().unwrap().is_dry_run());
    assert_eq!(fake.commands(), vec!["tar xf app.tar"]);
}

#[test]
fn copy_action_describes_both_ends() {
    let step = Step::copy("ship", "dist/app.tar", "releases/");
    assert_eq!(step.action().describe(), "copy dist/app.tar -> releases/");
}
