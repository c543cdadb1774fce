use std::sync::Arc;
use std::time::Duration;

use fence_cli::apply::{Applier, RetryConfig, RunState, Step, StepStatus, SubState};
use fence_core::{
  BranchTarget, ErrorKind, PresetName, PresetSource, ProtectionSettings, ProtectionState, StatusChecks,
};
use fence_gh::ProtectionError;
use fence_test_utils::{Call, CallKind, FakeProtectionApi};
use tokio_util::sync::CancellationToken;

fn target() -> BranchTarget {
  BranchTarget::new("octo", "service", "main").unwrap()
}

fn applier(fake: &Arc<FakeProtectionApi>) -> Applier<FakeProtectionApi> {
  Applier::new(Arc::clone(fake)).with_retry(RetryConfig::new(3, Duration::ZERO, Duration::ZERO))
}

fn named(preset: PresetName) -> PresetSource {
  PresetSource::Named(preset.as_str().to_string())
}

fn rate_limited() -> ProtectionError {
  ProtectionError::RateLimited {
    retry_after: None,
    message: "You have exceeded a secondary rate limit.".to_string(),
  }
}

fn protected() -> ProtectionState {
  ProtectionState {
    protected: true,
    ..Default::default()
  }
}

#[tokio::test]
async fn test_second_run_is_unchanged_for_every_preset() {
  for preset in PresetName::ALL {
    let fake = Arc::new(FakeProtectionApi::new());
    let applier = applier(&fake);
    let cancel = CancellationToken::new();

    let first = applier.run(&target(), &named(preset), &cancel).await;
    assert_eq!(first.state, RunState::Completed, "first run of {preset}: {first:?}");

    let writes_before = fake.write_calls().len();
    let second = applier.run(&target(), &named(preset), &cancel).await;

    assert_eq!(second.state, RunState::Completed);
    assert_eq!(second.steps.len(), Step::ALL.len());
    assert!(
      second.steps.iter().all(|s| s.status == StepStatus::Unchanged),
      "second run of {preset} changed something: {second:?}"
    );
    assert_eq!(fake.write_calls().len(), writes_before);
  }
}

#[tokio::test]
async fn test_status_checks_applied_with_new_state() {
  let fake = Arc::new(FakeProtectionApi::with_state(ProtectionState {
    status_checks: Some(StatusChecks {
      strict: false,
      contexts: vec![],
    }),
    ..protected()
  }));
  let settings = ProtectionSettings {
    strict: Some(true),
    required_contexts: Some(vec!["a".to_string(), "b".to_string()]),
    ..Default::default()
  };

  let report = applier(&fake)
    .run(&target(), &PresetSource::Settings(settings), &CancellationToken::new())
    .await;

  let step = report.step(Step::StatusChecks).unwrap();
  assert_eq!(step.status, StepStatus::Applied);
  assert_eq!(
    step.prior_state,
    Some(SubState::StatusChecks(StatusChecks {
      strict: false,
      contexts: vec![]
    }))
  );
  assert_eq!(
    step.new_state,
    Some(SubState::StatusChecks(StatusChecks {
      strict: true,
      contexts: vec!["a".to_string(), "b".to_string()]
    }))
  );
  assert!(fake.calls().contains(&Call::SetRequiredStatusChecks {
    strict: true,
    contexts: vec!["a".to_string(), "b".to_string()]
  }));
  assert_eq!(report.state, RunState::Completed);
}

#[tokio::test]
async fn test_rate_limited_step_is_retried() {
  let fake = Arc::new(FakeProtectionApi::new());
  fake.fail_next(CallKind::SetEnforceAdmins, rate_limited());

  let report = applier(&fake)
    .run(&target(), &named(PresetName::Strict), &CancellationToken::new())
    .await;

  let step = report.step(Step::EnforceAdmins).unwrap();
  assert_eq!(step.status, StepStatus::Applied);
  assert_eq!(step.attempts, 2);
  assert_eq!(fake.count_of(CallKind::SetEnforceAdmins), 2);
  assert_eq!(report.state, RunState::Completed);
}

#[tokio::test]
async fn test_rate_limited_step_fails_after_attempt_ceiling() {
  let fake = Arc::new(FakeProtectionApi::new());
  fake.fail_always(CallKind::SetEnforceAdmins, rate_limited());

  let report = applier(&fake)
    .run(&target(), &named(PresetName::Strict), &CancellationToken::new())
    .await;

  let step = report.step(Step::EnforceAdmins).unwrap();
  assert_eq!(step.status, StepStatus::Failed);
  assert_eq!(step.attempts, 3);
  assert_eq!(step.error.as_ref().map(|e| e.kind), Some(ErrorKind::RateLimited));
  assert_eq!(step.prior_state, Some(SubState::Flag(false)));
  assert_eq!(fake.count_of(CallKind::SetEnforceAdmins), 3);
  assert_eq!(report.state, RunState::PartiallyFailed);
}

#[tokio::test]
async fn test_rate_limit_hint_beyond_cap_fails_without_waiting() {
  let fake = Arc::new(FakeProtectionApi::with_state(protected()));
  fake.fail_always(
    CallKind::SetEnforceAdmins,
    ProtectionError::RateLimited {
      retry_after: Some(Duration::from_secs(3600)),
      message: "API rate limit exceeded".to_string(),
    },
  );
  let applier = Applier::new(Arc::clone(&fake)).with_retry(RetryConfig::new(
    3,
    Duration::ZERO,
    Duration::from_secs(30),
  ));

  let report = applier
    .run(&target(), &named(PresetName::Strict), &CancellationToken::new())
    .await;

  let step = report.step(Step::EnforceAdmins).unwrap();
  assert_eq!(step.status, StepStatus::Failed);
  assert_eq!(step.attempts, 1);
  let error = step.error.as_ref().unwrap();
  assert_eq!(error.kind, ErrorKind::RateLimited);
  assert!(error.message.contains("3600s"), "{}", error.message);
  assert_eq!(fake.count_of(CallKind::SetEnforceAdmins), 1);
  assert_eq!(report.state, RunState::PartiallyFailed);
}

#[tokio::test]
async fn test_unprotected_branch_is_created_by_a_full_write() {
  let fake = Arc::new(FakeProtectionApi::new());
  let cancel = CancellationToken::new();

  let report = applier(&fake).run(&target(), &named(PresetName::Recommended), &cancel).await;

  assert_eq!(report.state, RunState::Completed, "{report:?}");
  assert_eq!(report.step(Step::StatusChecks).unwrap().status, StepStatus::Applied);
  assert_eq!(fake.write_calls()[0].kind(), CallKind::ReplaceProtection);
  assert_eq!(fake.count_of(CallKind::SetRequiredStatusChecks), 0);
  assert_eq!(fake.count_of(CallKind::SetPullRequestReviews), 0);

  let state = fake.state();
  assert!(state.protected);
  assert!(state.effective_status_checks().strict);
  assert_eq!(state.pull_request_reviews.map(|r| r.required_approving_review_count), Some(1));

  let writes_before = fake.write_calls().len();
  let second = applier(&fake).run(&target(), &named(PresetName::Recommended), &cancel).await;
  assert_eq!(second.count(StepStatus::Unchanged), Step::ALL.len());
  assert_eq!(fake.write_calls().len(), writes_before);
}

#[tokio::test]
async fn test_signed_commits_on_unprotected_branch_write_after_creation() {
  let fake = Arc::new(FakeProtectionApi::new());
  let settings = ProtectionSettings {
    require_signed_commits: Some(true),
    ..Default::default()
  };

  let report = applier(&fake)
    .run(&target(), &PresetSource::Settings(settings), &CancellationToken::new())
    .await;

  assert_eq!(report.state, RunState::Completed, "{report:?}");
  let kinds: Vec<CallKind> = fake.write_calls().iter().map(Call::kind).collect();
  assert_eq!(kinds, vec![CallKind::ReplaceProtection, CallKind::SetRequiredSignatures]);
  assert!(fake.state().required_signatures);
}

#[tokio::test]
async fn test_not_found_only_fails_its_own_step() {
  let fake = Arc::new(FakeProtectionApi::with_state(ProtectionState {
    status_checks: Some(StatusChecks::default()),
    ..protected()
  }));
  fake.fail_always(
    CallKind::SetRequiredStatusChecks,
    ProtectionError::NotFound {
      message: "Not Found".to_string(),
    },
  );

  let report = applier(&fake)
    .run(&target(), &named(PresetName::Strict), &CancellationToken::new())
    .await;

  let checks = report.step(Step::StatusChecks).unwrap();
  assert_eq!(checks.status, StepStatus::Failed);
  assert_eq!(checks.attempts, 1);
  assert_eq!(checks.error.as_ref().map(|e| e.kind), Some(ErrorKind::NotFound));

  for step in [Step::EnforceAdmins, Step::PullRequestReviews, Step::SignedCommits] {
    assert_eq!(report.step(step).unwrap().status, StepStatus::Applied, "{step}");
  }
  assert!(fake.state().enforce_admins);
  assert_eq!(report.state, RunState::PartiallyFailed);
}

#[tokio::test]
async fn test_invalid_settings_abort_without_calls() {
  let fake = Arc::new(FakeProtectionApi::new());
  let settings = ProtectionSettings {
    required_reviewers: Some(-1),
    ..Default::default()
  };

  let report = applier(&fake)
    .run(&target(), &PresetSource::Settings(settings), &CancellationToken::new())
    .await;

  assert_eq!(report.state, RunState::Aborted);
  assert!(report.steps.is_empty());
  assert_eq!(
    report.abort_reason.as_ref().map(|e| e.kind),
    Some(ErrorKind::InvalidSettings)
  );
  assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_preset_aborts() {
  let fake = Arc::new(FakeProtectionApi::new());

  let report = applier(&fake)
    .run(
      &target(),
      &PresetSource::Named("paranoid".to_string()),
      &CancellationToken::new(),
    )
    .await;

  assert_eq!(report.state, RunState::Aborted);
  assert_eq!(report.abort_reason.as_ref().map(|e| e.kind), Some(ErrorKind::InvalidPreset));
  assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_revoking_disallowed_deletions_is_unchanged() {
  let fake = Arc::new(FakeProtectionApi::new());
  let settings = ProtectionSettings {
    allow_deletions: Some(false),
    ..Default::default()
  };

  let report = applier(&fake)
    .run(&target(), &PresetSource::Settings(settings), &CancellationToken::new())
    .await;

  assert_eq!(report.step(Step::AllowDeletions).unwrap().status, StepStatus::Unchanged);
  assert_eq!(fake.count_of(CallKind::SetAllowDeletions), 0);
}

#[tokio::test]
async fn test_verify_reports_drift() {
  let fake = Arc::new(FakeProtectionApi::new());
  fake.ignore_writes(CallKind::SetRequiredSignatures);

  let report = applier(&fake)
    .run(&target(), &named(PresetName::Strict), &CancellationToken::new())
    .await;

  assert_eq!(report.step(Step::SignedCommits).unwrap().status, StepStatus::Applied);

  let verify = report.step(Step::Verify).unwrap();
  assert_eq!(verify.status, StepStatus::Failed);
  let error = verify.error.as_ref().unwrap();
  assert_eq!(error.kind, ErrorKind::Drift);
  assert!(error.message.contains("required_signatures"));
  assert_eq!(report.state, RunState::PartiallyFailed);
}

#[tokio::test]
async fn test_cancellation_between_steps() {
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  let fake = Arc::new(FakeProtectionApi::new().on_call(move |call| {
    if call.kind() == CallKind::SetEnforceAdmins {
      trigger.cancel();
    }
  }));

  let report = applier(&fake).run(&target(), &named(PresetName::Strict), &cancel).await;

  assert_eq!(report.state, RunState::Cancelled);
  assert_eq!(report.step(Step::EnforceAdmins).unwrap().status, StepStatus::Applied);
  for step in [
    Step::PullRequestReviews,
    Step::SignedCommits,
    Step::ConversationResolution,
    Step::Verify,
  ] {
    let result = report.step(step).unwrap();
    assert_eq!(result.status, StepStatus::Cancelled, "{step}");
    assert_eq!(result.error.as_ref().map(|e| e.kind), Some(ErrorKind::Cancelled));
  }
  assert_eq!(fake.count_of(CallKind::SetPullRequestReviews), 0);
}

#[tokio::test]
async fn test_cancelled_before_start_makes_no_calls() {
  let fake = Arc::new(FakeProtectionApi::new());
  let cancel = CancellationToken::new();
  cancel.cancel();

  let report = applier(&fake).run(&target(), &named(PresetName::Minimal), &cancel).await;

  assert_eq!(report.state, RunState::Cancelled);
  assert_eq!(report.count(StepStatus::Cancelled), Step::ALL.len());
  assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_plan_never_writes() {
  let fake = Arc::new(FakeProtectionApi::new());

  let report = applier(&fake)
    .with_dry_run(true)
    .run(&target(), &named(PresetName::Strict), &CancellationToken::new())
    .await;

  assert!(report.dry_run);
  assert_eq!(report.state, RunState::Completed);
  assert!(fake.write_calls().is_empty());
  assert_eq!(report.step(Step::EnforceAdmins).unwrap().status, StepStatus::Applied);
  assert_eq!(report.step(Step::AllowDeletions).unwrap().status, StepStatus::Unchanged);
  assert_eq!(report.step(Step::Verify).unwrap().status, StepStatus::Unchanged);
  assert_eq!(fake.state(), ProtectionState::default());
}

#[tokio::test]
async fn test_conversation_resolution_keeps_earlier_writes() {
  let fake = Arc::new(FakeProtectionApi::new());

  let report = applier(&fake)
    .run(&target(), &named(PresetName::Recommended), &CancellationToken::new())
    .await;

  assert_eq!(report.state, RunState::Completed);
  let state = fake.state();
  assert!(state.required_conversation_resolution);
  assert_eq!(state.pull_request_reviews.as_ref().map(|r| r.required_approving_review_count), Some(1));
  assert!(state.effective_status_checks().strict);
}

#[tokio::test]
async fn test_run_all_keeps_target_order() {
  let fake = Arc::new(FakeProtectionApi::new());
  let targets = vec![
    BranchTarget::new("octo", "service", "main").unwrap(),
    BranchTarget::new("octo", "service", "release/v1").unwrap(),
    BranchTarget::new("octo", "web", "main").unwrap(),
  ];

  let reports = applier(&fake)
    .run_all(&targets, &named(PresetName::Minimal), &CancellationToken::new())
    .await;

  let reported: Vec<&BranchTarget> = reports.iter().map(|r| &r.target).collect();
  assert_eq!(reported, targets.iter().collect::<Vec<_>>());
  assert!(reports.iter().all(|r| r.state == RunState::Completed));
}

#[tokio::test]
async fn test_run_all_aborts_every_target_on_invalid_settings() {
  let fake = Arc::new(FakeProtectionApi::new());
  let settings = ProtectionSettings {
    required_contexts: Some(vec!["build".to_string(), "build".to_string()]),
    ..Default::default()
  };
  let targets = vec![target(), BranchTarget::new("octo", "web", "main").unwrap()];

  let reports = applier(&fake)
    .run_all(&targets, &PresetSource::Settings(settings), &CancellationToken::new())
    .await;

  assert_eq!(reports.len(), 2);
  assert!(reports.iter().all(|r| r.state == RunState::Aborted));
  assert_eq!(fake.call_count(), 0);
}
