//! Integration tests entry point, following https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

#[ctor::ctor]
fn init() {
	color_eyre::install().expect("color_eyre hook already set");
}

pub use common::*;

mod end_to_end;
mod publish;
