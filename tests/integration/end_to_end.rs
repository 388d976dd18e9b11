//! Full pipeline scenarios: error detection → proposal → merge → format →
//! publish, with both collaborators mocked.

use autoheal::{HealError, workflow::Outcome};

use crate::common::TestContext;

const TFVARS: &str = "region = \"us-east-1\"\ninstance_type = \"t2.micro\"";

#[tokio::test]
async fn test_region_fix_is_merged_and_published() {
	let ctx = TestContext::new("Error: InvalidParameterValue: region us-east-1 not permitted\n", "terraform.tfvars", TFVARS);

	let response = "The region needs to change:\n```hcl\nregion = \"us-west-2\"\n```\n";
	let outcome = ctx.run(response).await.expect("workflow failed");

	let Outcome::Published { branch, pr_url } = outcome else {
		panic!("expected Published");
	};
	assert!(branch.starts_with("autoheal-fix-"));
	assert!(pr_url.is_some());

	// Only the region line changed; the merge never grows or reorders.
	let expected = "region = \"us-west-2\"\ninstance_type = \"t2.micro\"";
	assert_eq!(ctx.read_target(), expected);
	assert_eq!(ctx.remote_content(&branch).as_deref(), Some(expected));

	// The raw suggestion, fences and prose included, lands in the audit file.
	assert_eq!(ctx.read_audit().as_deref(), Some(response));

	let prs = ctx.remote.pull_requests();
	assert_eq!(prs.len(), 1);
	assert_eq!(prs[0].base, "main");
	assert_eq!(prs[0].head, branch);
	assert_eq!(prs[0].title, "Automated fix for deployment error");
}

#[tokio::test]
async fn test_clean_log_contacts_no_remote() {
	let ctx = TestContext::new("Deployment finished successfully in 42s\n", "terraform.tfvars", TFVARS);

	let outcome = ctx.run("```\nregion = \"eu-west-1\"\n```").await.expect("workflow failed");

	assert!(matches!(outcome, Outcome::NoErrorDetected));
	assert!(ctx.remote.calls().is_empty(), "no repository operation may run: {:?}", ctx.remote.calls());
	assert_eq!(ctx.read_audit(), None, "no suggestion should be requested or saved");
	assert_eq!(ctx.read_target(), TFVARS, "target file must be untouched");
}

#[tokio::test]
async fn test_missing_error_log_is_source_not_found() {
	let ctx = TestContext::new("Error: boom\n", "terraform.tfvars", TFVARS);
	std::fs::remove_file(&ctx.settings.error_log).unwrap();

	let err = ctx.run("whatever").await.expect_err("expected failure");
	assert!(matches!(err, HealError::SourceNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_missing_target_file_is_source_not_found() {
	let ctx = TestContext::new("Error: boom\n", "terraform.tfvars", TFVARS);
	std::fs::remove_file(ctx.target_path()).unwrap();

	let err = ctx.run("whatever").await.expect_err("expected failure");
	assert!(matches!(err, HealError::SourceNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_proposal_with_only_new_keys_publishes_nothing() {
	let ctx = TestContext::new("Error: something\n", "terraform.tfvars", TFVARS);

	// "availability_zone" exists nowhere in the original: the conservative
	// merge discards it rather than appending, leaving nothing to publish.
	let outcome = ctx.run("```\navailability_zone = \"us-east-1a\"\n```").await.expect("workflow failed");

	assert!(matches!(outcome, Outcome::NothingToApply));
	assert_eq!(ctx.read_target(), TFVARS);
	assert!(ctx.remote.pull_requests().is_empty());
	assert!(ctx.remote.calls().is_empty());
	// The suggestion is still audited even though it was unusable.
	assert!(ctx.read_audit().is_some());
}

#[tokio::test]
async fn test_unfenced_response_is_used_verbatim() {
	let ctx = TestContext::new("Error: bad instance type\n", "terraform.tfvars", TFVARS);

	let outcome = ctx.run("instance_type = \"t3.small\"").await.expect("workflow failed");

	let Outcome::Published { .. } = outcome else {
		panic!("expected Published");
	};
	assert_eq!(ctx.read_target(), "region = \"us-east-1\"\ninstance_type = \"t3.small\"");
}

#[tokio::test]
async fn test_yaml_target_is_canonicalized_after_merge() {
	let ctx = TestContext::new("Error: CrashLoopBackOff\n", "deploy.yaml", "replicas: 2\nimage: registry/app\n");

	let outcome = ctx.run("```yaml\nreplicas: 4\n```").await.expect("workflow failed");

	let Outcome::Published { branch, .. } = outcome else {
		panic!("expected Published");
	};

	let merged = ctx.read_target();
	let value: serde_yaml::Value = serde_yaml::from_str(&merged).expect("formatted output must stay parseable");
	assert_eq!(value["replicas"], serde_yaml::Value::from(4));
	assert_eq!(value["image"], serde_yaml::Value::from("registry/app"));
	assert_eq!(ctx.remote_content(&branch), Some(merged));
}

#[tokio::test]
async fn test_duplicate_key_first_match_wins_end_to_end() {
	let ctx = TestContext::new("Error: duplicate setting\n", "app.properties", "a=1\na=2\n");

	let outcome = ctx.run("a=9").await.expect("workflow failed");

	assert!(matches!(outcome, Outcome::Published { .. }));
	assert_eq!(ctx.read_target(), "a=9\na=2\n");
}
