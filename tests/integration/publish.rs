//! Publish workflow state machine tests against the in-memory remote.

use std::sync::Arc;

use autoheal::{
	HealError,
	config::RepoInfo,
	mock_github::MockRepoClient,
	publish::{PublishRequest, PublishState, PublishWorkflow},
};

const TARGET: &str = "deploy/config.yaml";

fn seeded_remote() -> Arc<MockRepoClient> {
	let remote = Arc::new(MockRepoClient::new());
	remote.seed_branch("main", &[(TARGET, "replicas: 2\n")]);
	remote
}

fn repo() -> RepoInfo {
	RepoInfo::new("acme", "deployments")
}

fn request() -> PublishRequest {
	PublishRequest::new(TARGET.to_string(), "replicas: 4\n".to_string(), "main".to_string())
}

#[tokio::test]
async fn test_publish_happy_path_walks_all_states() {
	let remote = seeded_remote();
	let mut workflow = PublishWorkflow::new(remote.clone(), repo());
	let req = request();

	let report = workflow.run(&req).await.expect("publish failed");

	assert_eq!(report.branch, req.branch_name);
	assert_eq!(report.pr_url.as_deref(), Some("https://github.com/acme/deployments/pull/1"));
	assert!(matches!(workflow.state(), PublishState::PrCreated { pr_url: Some(_) }));

	// Strict step ordering: each remote effect confirmed before the next begins.
	let calls = remote.calls();
	assert_eq!(calls.len(), 5);
	assert_eq!(calls[0], "get_head_sha(main)");
	assert!(calls[1].starts_with(&format!("create_ref({}", req.branch_name)));
	assert_eq!(calls[2], format!("get_file_sha({TARGET}, {})", req.branch_name));
	assert_eq!(calls[3], format!("update_file({TARGET}, {})", req.branch_name));
	assert_eq!(calls[4], format!("create_pull_request({} -> main)", req.branch_name));

	assert_eq!(remote.file_content(&req.branch_name, TARGET).as_deref(), Some("replicas: 4\n"));
	// The base branch is untouched.
	assert_eq!(remote.file_content("main", TARGET).as_deref(), Some("replicas: 2\n"));
}

#[tokio::test]
async fn test_branch_creation_is_idempotent() {
	let remote = seeded_remote();
	let req = request();

	let first = PublishWorkflow::new(remote.clone(), repo()).run(&req).await;
	assert!(first.is_ok());

	// Same branch name again, as a retried CI run would produce. The second
	// create_ref reports "already exists" and the run still succeeds.
	let mut second_workflow = PublishWorkflow::new(remote.clone(), repo());
	let second = second_workflow.run(&req).await.expect("second run must succeed");

	// The PR for this head already exists, so no new URL.
	assert_eq!(second.pr_url, None);
	assert!(matches!(second_workflow.state(), PublishState::PrCreated { pr_url: None }));
	assert_eq!(remote.pull_requests().len(), 1);
}

#[tokio::test]
async fn test_pull_request_creation_is_idempotent() {
	let remote = seeded_remote();
	let req = request();

	PublishWorkflow::new(remote.clone(), repo()).run(&req).await.expect("first run failed");
	PublishWorkflow::new(remote.clone(), repo()).run(&req).await.expect("second run failed");

	assert_eq!(remote.pull_requests().len(), 1);
}

#[tokio::test]
async fn test_permission_denied_is_fatal_and_actionable() {
	let remote = seeded_remote();
	remote.deny_pull_requests();

	let mut workflow = PublishWorkflow::new(remote.clone(), repo());
	let err = workflow.run(&request()).await.expect_err("expected permission failure");

	match &err {
		HealError::Permission { message } => {
			assert!(message.contains("acme/deployments"), "message should name the repo: {message}");
			assert!(message.contains("scope"), "message should name the missing scope: {message}");
		}
		other => panic!("expected Permission, got {other:?}"),
	}
	assert!(matches!(workflow.state(), PublishState::Failed { .. }));
}

#[tokio::test]
async fn test_blob_sha_conflict_is_fatal_not_retried() {
	let remote = seeded_remote();
	remote.conflict_next_update();

	let mut workflow = PublishWorkflow::new(remote.clone(), repo());
	let err = workflow.run(&request()).await.expect_err("expected conflict failure");

	assert!(matches!(err, HealError::RemoteApi(_)), "got {err:?}");
	assert!(matches!(workflow.state(), PublishState::Failed { .. }));

	// Exactly one update attempt: a conflict means another actor mutated the
	// branch mid-run, and retrying cannot be safe.
	let updates = remote.calls().iter().filter(|c| c.starts_with("update_file")).count();
	assert_eq!(updates, 1);
	assert!(remote.pull_requests().is_empty());
}

#[tokio::test]
async fn test_missing_base_branch_fails() {
	let remote = Arc::new(MockRepoClient::new()); // nothing seeded

	let mut workflow = PublishWorkflow::new(remote, repo());
	let err = workflow.run(&request()).await.expect_err("expected failure");

	assert!(matches!(err, HealError::RemoteApi(_)), "got {err:?}");
	assert!(matches!(workflow.state(), PublishState::Failed { .. }));
}
