//! Tracing subscriber setup

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber. `RUST_LOG` wins over the passed
/// default directive; repeated calls are no-ops so embedders and tests can
/// both call this freely.
pub fn init(default_directive: &str) {
	let directive = default_directive.to_string();
	INIT.get_or_init(move || {
		let filter =
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_target(false)
			.init();
	});
}
