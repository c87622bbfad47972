use proptest::prelude::*;
use xylem::{node::Length, Config, Error, NodeId, RenderMode, SessionState};

mod session_;
use session_::{div, root, session};

#[derive(Debug, Clone)]
enum Mutation {
	Width(u16),
	Hidden(bool),
	AddClass(u8),
	RemoveClass(u8),
	Attribute(u8),
	ToolTip(Option<u8>),
	Script,
	Expose,
	ToggleAttached,
}

fn mutation() -> impl Strategy<Value = Mutation> {
	prop_oneof![
		any::<u16>().prop_map(Mutation::Width),
		any::<bool>().prop_map(Mutation::Hidden),
		(0..4_u8).prop_map(Mutation::AddClass),
		(0..4_u8).prop_map(Mutation::RemoveClass),
		any::<u8>().prop_map(Mutation::Attribute),
		any::<Option<u8>>().prop_map(Mutation::ToolTip),
		Just(Mutation::Script),
		Just(Mutation::Expose),
		Just(Mutation::ToggleAttached),
	]
}

fn apply(state: &mut SessionState, root: NodeId, node: NodeId, mutation: Mutation) -> Result<(), Error> {
	let tree = state.tree_mut();
	match mutation {
		Mutation::Width(width) => tree.set_width(node, Length::Px(width.into())),
		Mutation::Hidden(hidden) => tree.set_hidden(node, hidden),
		Mutation::AddClass(class) => tree.add_style_class(node, &format!("c{}", class)),
		Mutation::RemoveClass(class) => tree.remove_style_class(node, &format!("c{}", class)),
		Mutation::Attribute(value) => tree.set_attribute(node, "data-value", value.to_string()),
		Mutation::ToolTip(tool_tip) => tree.set_tool_tip(node, tool_tip.map(|tool_tip| tool_tip.to_string())),
		Mutation::Script => tree.do_javascript(node, "void 0;"),
		Mutation::Expose => state.expose(node, "click").map(|_| ()),
		Mutation::ToggleAttached => {
			if state.tree().get(node)?.parent().is_some() {
				state.detach(node)
			} else {
				state.attach(root, node, None)
			}
		}
	}
}

proptest! {
	#[test]
	fn second_render_is_empty(
		full in any::<bool>(),
		two_phase_threshold in prop_oneof![Just(0_usize), Just(5000)],
		mutations in proptest::collection::vec((0..4_usize, mutation()), 0..40)
	) {
		let session = session(Config::default().two_phase_threshold(two_phase_threshold));
		let lock = session.lock().unwrap();
		let (root, children) = {
			let mut state = lock.state().unwrap();
			let root = root(&mut state).unwrap();
			let children: Vec<_> = (0..4).map(|_| div(&mut state, root).unwrap()).collect();
			(root, children)
		};
		lock.render(RenderMode::Update).unwrap();

		{
			let mut state = lock.state().unwrap();
			for (index, mutation) in mutations {
				apply(&mut state, root, children[index], mutation).unwrap();
			}
		}
		lock.render(if full { RenderMode::Full } else { RenderMode::Update }).unwrap();

		let program = lock.render(RenderMode::Update).unwrap();
		prop_assert!(program.is_empty(), "{:?}", program);
		prop_assert_eq!(lock.state().unwrap().tree().update_set().count(), 0);
	}
}
