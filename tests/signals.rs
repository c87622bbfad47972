use pretty_assertions::assert_eq;
use xylem::{node::ElementKind, signals::signal_key, Config, Error, Operation, RenderMode, ResolveError};

mod session_;
use session_::{div, root, session};

#[test]
fn expose_is_idempotent() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;

	let (key, handle) = state.expose(root, "click")?;
	assert_eq!(key, signal_key("x0", "click"));
	assert_eq!(state.expose(root, "click")?, (key.clone(), handle));
	assert_eq!(state.resolve(&key), Ok(handle));
	assert_eq!(state.signals().len(), 1);

	let (other, other_handle) = state.expose(root, "change")?;
	assert_ne!(other, key);
	assert_ne!(other_handle, handle);
	Ok(())
}

#[test]
fn bound_on_creation() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	{
		let mut state = lock.state()?;
		let button = state.create(ElementKind::Button);
		state.add_root(button)?;
		state.expose(button, "click")?;
	}
	match lock.render(RenderMode::Update)?.operations.as_slice() {
		[Operation::Create { element, .. }] => assert_eq!(element.events, vec![("click".to_owned(), "x0.click".to_owned())]),
		other => panic!("unexpected operations: {:?}", other),
	}
	Ok(())
}

#[test]
fn unexposed_keys_are_remembered_briefly() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let key = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		state.expose(root, "click")?.0
	};
	lock.render(RenderMode::Update)?;

	assert!(lock.state()?.unexpose(&key)?);
	assert!(!lock.state()?.unexpose(&key)?);
	assert_eq!(lock.state()?.resolve(&key), Err(ResolveError::JustRemoved));

	match lock.render(RenderMode::Update)?.operations.as_slice() {
		[Operation::Update(element)] => assert_eq!(element.events, vec![("click".to_owned(), String::new())]),
		other => panic!("unexpected operations: {:?}", other),
	}
	// Still within the window after the cycle it was removed in.
	assert_eq!(lock.state()?.resolve(&key), Err(ResolveError::JustRemoved));

	lock.render(RenderMode::Update)?;
	assert_eq!(lock.state()?.resolve(&key), Err(ResolveError::Unknown));
	Ok(())
}

#[test]
fn unknown_key() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	assert_eq!(lock.state()?.resolve("x0.click"), Err(ResolveError::Unknown));
	Ok(())
}

#[test]
fn detaching_suspends_exposure() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;
	let child = div(&mut state, root)?;
	let (key, handle) = state.expose(child, "click")?;

	state.detach(child)?;
	assert_eq!(state.resolve(&key), Err(ResolveError::JustRemoved));
	assert!(state.signals().is_empty());

	state.attach(root, child, None)?;
	assert_eq!(state.resolve(&key), Ok(handle));
	Ok(())
}

#[test]
fn detached_exposure_enters_on_attach() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;
	let orphan = state.create(ElementKind::Button);

	let (key, handle) = state.expose(orphan, "click")?;
	assert_eq!(state.resolve(&key), Err(ResolveError::Unknown));

	state.attach(root, orphan, None)?;
	assert_eq!(state.resolve(&key), Ok(handle));
	Ok(())
}

#[test]
fn destroying_drops_exposure() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;
	let child = div(&mut state, root)?;
	let (key, _) = state.expose(child, "click")?;

	state.destroy(child)?;
	assert_eq!(state.resolve(&key), Err(ResolveError::JustRemoved));
	assert_eq!(state.expose(child, "click"), Err(Error::UnknownNode(child)));
	Ok(())
}

#[test]
fn client_id_change_moves_keys() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let root = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let (_, handle) = state.expose(root, "click")?;

		state.set_dom_id(root, "main")?;
		assert_eq!(state.resolve("main.click"), Ok(handle));
		assert_eq!(state.resolve("x0.click"), Err(ResolveError::Unknown));
		assert_eq!(state.tree().by_dom_id("main"), Some(root));
		root
	};

	match lock.render(RenderMode::Update)?.operations.as_slice() {
		[Operation::Create { element, .. }] => {
			assert_eq!(element.id, "main");
			assert_eq!(element.events, vec![("click".to_owned(), "main.click".to_owned())]);
		}
		other => panic!("unexpected operations: {:?}", other),
	}

	let mut state = lock.state()?;
	assert_eq!(state.set_dom_id(root, "late"), Err(Error::Rendered(root)));
	let other = state.create(ElementKind::Div);
	assert_eq!(state.set_dom_id(other, "main"), Err(Error::DuplicateDomId("main".to_owned())));
	Ok(())
}
