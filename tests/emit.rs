use xylem::{
	emit::{self, EmitMode},
	node::ElementKind,
	Config, Error,
};

mod session_;
use session_::{div, root, session};

#[test]
fn unattached_nodes_are_refused() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;

	let loose = state.create(ElementKind::Div);
	for &mode in &[EmitMode::Create, EmitMode::Full, EmitMode::Incremental] {
		assert_eq!(emit::emit(state.tree(), loose, mode), Err(Error::Detached(loose)));
	}
	assert_eq!(emit::subtree(state.tree(), loose, 8), Err(Error::Detached(loose)));

	// Detaching a subtree takes its descendants along.
	let root = root(&mut state)?;
	let branch = div(&mut state, root)?;
	let leaf = div(&mut state, branch)?;
	emit::emit(state.tree(), leaf, EmitMode::Full)?;
	state.detach(branch)?;
	assert_eq!(emit::emit(state.tree(), branch, EmitMode::Incremental), Err(Error::Detached(branch)));
	assert_eq!(emit::emit(state.tree(), leaf, EmitMode::Incremental), Err(Error::Detached(leaf)));

	// Destroyed nodes are gone entirely.
	state.destroy(branch)?;
	assert_eq!(emit::emit(state.tree(), leaf, EmitMode::Full), Err(Error::UnknownNode(leaf)));
	Ok(())
}

#[test]
fn depth_limit_is_enforced() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;
	let child = div(&mut state, root)?;
	let grandchild = div(&mut state, child)?;

	assert_eq!(emit::subtree(state.tree(), root, 3)?.children[0].children.len(), 1);
	assert_eq!(emit::subtree(state.tree(), root, 2), Err(Error::DepthLimit(grandchild)));
	Ok(())
}
