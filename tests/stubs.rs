use pretty_assertions::assert_eq;
use xylem::{
	emit::{self, EmitMode},
	lifecycle::{self, RenderState},
	node::{ElementKind, Length},
	program::Property,
	Config, Element, Error, Operation, RenderMode,
};

mod session_;
use session_::{div, root, session};

#[test]
fn hidden_child_is_stubbed_then_promoted() -> Result<(), Error> {
	let session = session(Config::default().two_phase_threshold(0));
	let lock = session.lock()?;
	let child = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let child = div(&mut state, root)?;
		state.tree_mut().set_hidden(child, true)?;
		child
	};

	let program = lock.render(RenderMode::Update)?;
	assert!(program.fetch_invisible);
	match program.operations.as_slice() {
		[Operation::Create { element, .. }] => {
			assert_eq!(element.children.len(), 1);
			assert!(element.children[0].stub);
			assert_eq!(element.children[0].id, "x1");
			assert_eq!(element.children[0].property(Property::StyleDisplay), Some("none"));
		}
		other => panic!("unexpected operations: {:?}", other),
	}
	assert_eq!(lock.state()?.tree().get(child)?.render_state(), RenderState::Stubbed);

	// Changes inside a stub go nowhere.
	lock.state()?.tree_mut().set_width(child, Length::Px(5.0))?;
	assert!(lock.render(RenderMode::Update)?.is_empty());

	let expected = {
		let mut state = lock.state()?;
		state.tree_mut().set_hidden(child, false)?;
		emit::emit(state.tree(), child, EmitMode::Create)?
	};
	assert_eq!(expected.property(Property::StyleWidth), Some("5px"));
	assert_eq!(lock.render(RenderMode::Update)?.operations, vec![Operation::Unstub(expected)]);
	assert_eq!(lock.state()?.tree().get(child)?.render_state(), RenderState::Materialized);
	Ok(())
}

#[test]
fn promotion_happens_once() -> Result<(), Error> {
	let session = session(Config::default().two_phase_threshold(0));
	let lock = session.lock()?;
	let child = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let child = div(&mut state, root)?;
		state.tree_mut().set_hidden(child, true)?;
		child
	};
	lock.render(RenderMode::Update)?;

	let mut state = lock.state()?;
	let tree = state.tree_mut();
	lifecycle::promote(tree, child, true, 512)?;
	assert_eq!(
		lifecycle::promote(tree, child, true, 512),
		Err(Error::InvalidTransition {
			node: child,
			from: RenderState::Materialized,
			to: RenderState::Materialized,
		})
	);
	Ok(())
}

#[test]
fn hiding_again_keeps_the_element() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let child = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		div(&mut state, root)?
	};
	lock.render(RenderMode::Update)?;

	lock.state()?.tree_mut().set_hidden(child, true)?;
	let mut expected = Element::new("x1", ElementKind::Div);
	expected.set_property(Property::StyleDisplay, "none");
	assert_eq!(lock.render(RenderMode::Update)?.operations, vec![Operation::Update(expected)]);
	assert_eq!(lock.state()?.tree().get(child)?.render_state(), RenderState::Materialized);
	Ok(())
}

#[test]
fn load_invisible_promotes_remaining_stubs() -> Result<(), Error> {
	let session = session(Config::default().two_phase_threshold(0));
	let lock = session.lock()?;
	let children = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let children = vec![div(&mut state, root)?, div(&mut state, root)?];
		for &child in &children {
			state.tree_mut().set_hidden(child, true)?;
		}
		children
	};
	assert!(lock.render(RenderMode::Update)?.fetch_invisible);

	let program = lock.render(RenderMode::LoadInvisible)?;
	let unstubbed: Vec<_> = program
		.operations
		.iter()
		.map(|operation| match operation {
			Operation::Unstub(element) => element.id.as_str(),
			other => panic!("unexpected operation: {:?}", other),
		})
		.collect();
	assert_eq!(unstubbed, vec!["x1", "x2"]);
	assert!(!program.fetch_invisible);

	let state = lock.state()?;
	for child in children {
		assert_eq!(state.tree().get(child)?.render_state(), RenderState::Materialized);
	}
	Ok(())
}

#[test]
fn small_deferred_content_is_inlined() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	{
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let child = div(&mut state, root)?;
		state.tree_mut().set_hidden(child, true)?;
	}

	let program = lock.render(RenderMode::Update)?;
	assert!(!program.fetch_invisible);
	match program.operations.as_slice() {
		[Operation::Create { element: root, .. }, Operation::Unstub(child)] => {
			assert!(root.children[0].stub);
			assert_eq!(child.id, "x1");
			assert!(!child.stub);
		}
		other => panic!("unexpected operations: {:?}", other),
	}
	Ok(())
}

#[test]
fn load_later_off_is_never_stubbed() -> Result<(), Error> {
	let session = session(Config::default().two_phase_threshold(0));
	let lock = session.lock()?;
	{
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let child = div(&mut state, root)?;
		state.tree_mut().set_hidden(child, true)?;
		state.tree_mut().set_load_later(child, false)?;
	}

	let program = lock.render(RenderMode::Update)?;
	assert!(!program.fetch_invisible);
	match program.operations.as_slice() {
		[Operation::Create { element, .. }] => assert!(!element.children[0].stub),
		other => panic!("unexpected operations: {:?}", other),
	}
	Ok(())
}

#[test]
fn pre_learning_reports_stubs_and_marks_unchanged_values() -> Result<(), Error> {
	let session = session(Config::default().two_phase_threshold(0));
	let lock = session.lock()?;
	let (root, child) = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let child = div(&mut state, root)?;
		state.tree_mut().set_hidden(child, true)?;
		(root, child)
	};
	lock.render(RenderMode::Update)?;

	lock.state()?.tree_mut().set_width(child, Length::Px(1.0))?;
	let program = lock.render(RenderMode::PreLearning)?;
	assert!(!program.learning_complete);
	assert!(program.operations.is_empty());

	// While learning, writing the current value still marks the aspect.
	lock.state()?.tree_mut().set_width(root, Length::Unset)?;
	let mut expected = Element::new("x0", ElementKind::Div);
	expected.set_property(Property::StyleWidth, "");
	let program = lock.render(RenderMode::Update)?;
	assert!(program.learning_complete);
	assert_eq!(program.operations, vec![Operation::Update(expected)]);
	Ok(())
}
