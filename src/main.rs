use std::sync::Arc;

use autoheal::{
	config::{Cli, Settings},
	github::{BoxedRepoClient, RealRepoClient},
	mock_github::MockRepoClient,
	proposal::{FixProposer, MockProposer, OpenAiProposer},
	workflow::{self, Outcome},
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
	color_eyre::install().expect("color_eyre hook already set");
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();

	let settings = match Settings::new(&cli) {
		Ok(s) => s,
		Err(e) => {
			eprintln!("Error: {e}");
			std::process::exit(1);
		}
	};

	// All the functions past this point can rely on config being correct.
	let (proposer, repo_client): (Arc<dyn FixProposer>, BoxedRepoClient) = if cli.mock {
		let mock = MockRepoClient::new();
		// Seed the mock remote from the local working copy so a --mock run
		// exercises the full pipeline.
		if let Ok(content) = std::fs::read_to_string(&settings.target_file) {
			mock.seed_branch(&settings.base_branch, &[(settings.repo_path().as_str(), content.as_str())]);
		}
		let canned = std::env::var("AUTOHEAL_MOCK_PROPOSAL").unwrap_or_default();
		(Arc::new(MockProposer::new(&canned)), Arc::new(mock))
	} else {
		let proposer = match OpenAiProposer::new(&settings) {
			Ok(p) => p,
			Err(e) => {
				eprintln!("Error: {e}");
				std::process::exit(1);
			}
		};
		let client = match RealRepoClient::new(&settings) {
			Ok(c) => c,
			Err(e) => {
				eprintln!("Error: {e}");
				std::process::exit(1);
			}
		};
		(Arc::new(proposer), Arc::new(client))
	};

	match workflow::run(&settings, proposer.as_ref(), repo_client).await {
		Ok(Outcome::NoErrorDetected) => println!("No deployment error detected."),
		Ok(Outcome::NothingToApply) => println!("Proposed fix did not apply to any existing configuration key."),
		Ok(Outcome::Published { branch, pr_url }) => match pr_url {
			Some(url) => println!("Published fix on `{branch}`: {url}"),
			None => println!("Fix committed on `{branch}`; a pull request for it is already open."),
		},
		Err(e) => {
			eprintln!("Error: {e}");
			std::process::exit(1);
		}
	}
}
