use pretty_assertions::assert_eq;
use xylem::{
	flags::Flag,
	node::ElementKind,
	program::Property,
	Config, Element, Error, Operation, RenderMode, Widget,
};

mod session_;
use session_::{root, session};

/// A coloured label that carries its own class and sets itself up client-side once.
#[derive(Debug)]
struct Badge {
	color: &'static str,
}

impl Widget for Badge {
	fn kind(&self) -> ElementKind {
		ElementKind::Span
	}

	fn update_content(&self, element: &mut Element, creating: bool) {
		// Only amend a class string that's being written anyway.
		if creating || element.property(Property::Class).is_some() {
			element.add_class("badge");
		}
		element.set_property(Property::Style, format!("color: {}", self.color));
		if creating {
			element.call_javascript(format!("badge({:?});", element.id));
		}
	}
}

fn single(operations: &[Operation]) -> &Element {
	match operations {
		[Operation::Create { element, .. }] | [Operation::Update(element)] => element,
		other => panic!("unexpected operations: {:?}", other),
	}
}

#[test]
fn content_is_written_by_the_widget() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let badge = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let badge = state.create(Badge { color: "red" });
		state.tree_mut().set_style_class(badge, "big")?;
		state.attach(root, badge, None)?;
		badge
	};

	let program = lock.render(RenderMode::Update)?;
	let element = &single(&program.operations).children[0];
	assert_eq!(element.property(Property::Class), Some("big badge"));
	assert_eq!(element.property(Property::Style), Some("color: red"));
	assert_eq!(element.scripts, vec![r#"badge("x1");"#.to_owned()]);

	let javascript = program.to_javascript("X");
	assert!(javascript.contains("style.cssText"), "{}", javascript);
	assert!(javascript.contains(r#"badge("x1");"#), "{}", javascript);

	// Class deltas leave the widget's own class alone.
	lock.state()?.tree_mut().add_style_class(badge, "small")?;
	let program = lock.render(RenderMode::Update)?;
	let element = single(&program.operations);
	assert_eq!(element.added_classes, vec!["small".to_owned()]);
	assert_eq!(element.property(Property::Class), None);
	assert_eq!(element.property(Property::Style), None);

	// Re-deriving everything keeps it, but doesn't repeat the setup.
	lock.state()?.tree_mut().set_flag(badge, Flag::Content)?;
	let program = lock.render(RenderMode::Full)?;
	let element = single(&program.operations);
	assert_eq!(element.property(Property::Class), Some("big small badge"));
	assert_eq!(element.property(Property::Style), Some("color: red"));
	assert!(element.scripts.is_empty());
	Ok(())
}
