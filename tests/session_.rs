#![allow(dead_code)]

use std::sync::Once;
use tracing_subscriber::EnvFilter;
use xylem::{
	node::{ElementKind, Text},
	Config, Error, NodeId, Session, SessionState,
};

/// Installs a test-friendly subscriber once per test binary. Filter with `RUST_LOG`.
pub fn init_tracing() {
	static INIT: Once = Once::new();
	INIT.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::from_default_env())
			.with_test_writer()
			.try_init();
	});
}

pub fn session(config: Config) -> Session {
	init_tracing();
	Session::new(config)
}

/// Creates a `Div` root.
pub fn root(state: &mut SessionState) -> Result<NodeId, Error> {
	let root = state.create(ElementKind::Div);
	state.add_root(root)?;
	Ok(root)
}

/// Creates a `Span` with `html` below `parent`, last.
pub fn text(state: &mut SessionState, parent: NodeId, html: &str) -> Result<NodeId, Error> {
	let text = state.create(Text::new(ElementKind::Span, html));
	state.attach(parent, text, None)?;
	Ok(text)
}

/// Creates a `Div` below `parent`, last.
pub fn div(state: &mut SessionState, parent: NodeId) -> Result<NodeId, Error> {
	let div = state.create(ElementKind::Div);
	state.attach(parent, div, None)?;
	Ok(div)
}
