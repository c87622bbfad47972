//! Update-Program Emitter.
//!
//! Each [`Flag`] maps to one emission function in [`ASPECTS`], which is iterated in [`Flag`] declaration order.
//! Emission only *reads* node state. Consuming flags happens separately once the render cycle accepts the result,
//! so flags that are irrelevant in a node's current render state can be cleared without producing anything.
//!
//! Aspects that touch the same client property (for example [`Flag::Geometry`] and [`Flag::Hidden`] both writing
//! `style.display`) compute it through shared helpers and are merged last-writer-wins by [`Element::set_property`].

use crate::{
	error::Error,
	flags::{Flag, StatusFlag},
	lifecycle::RenderState,
	node::{Length, Node, NodeId, PositionScheme, Side, VerticalAlign},
	program::{Element, Operation, Property},
	signals::signal_key,
	tree::Tree,
};
use tracing::{instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
	/// A new element: every aspect, omitting default values.
	Create,
	/// Every aspect regardless of flags, for an element that already exists client-side.
	/// Default values are written too, since the client may still hold an older one.
	Full,
	/// Only aspects whose flag is set.
	Incremental,
}

impl EmitMode {
	/// Whether every aspect is re-derived, as opposed to only the flagged ones.
	#[must_use]
	pub fn all(self) -> bool {
		self != EmitMode::Incremental
	}

	/// Whether values equal to the client default can be left out.
	#[must_use]
	pub fn omit_defaults(self) -> bool {
		self == EmitMode::Create
	}
}

type Aspect = fn(&Node, &mut Element, EmitMode);

/// Emission functions in emission order.
const ASPECTS: &[(Flag, Aspect)] = &[
	(Flag::Geometry, geometry),
	(Flag::ZIndex, z_index),
	(Flag::Offsets, offsets),
	(Flag::Width, width),
	(Flag::Height, height),
	(Flag::FloatSide, float_side),
	(Flag::Margins, margins),
	(Flag::StyleClass, style_class),
	(Flag::ToolTip, tool_tip),
	(Flag::TabIndex, tab_index),
	(Flag::Selectable, selectable),
	(Flag::Disabled, disabled),
	(Flag::Attributes, attributes),
	(Flag::Content, content),
	(Flag::Signals, signals),
	(Flag::Script, script),
	(Flag::Children, children),
	(Flag::Hidden, hidden),
];

/// Emits the client changes of the single node `id`, without children.
///
/// This doesn't consume any flags.
///
/// # Errors
///
/// Emitting for an unknown node, a node that is being deleted or a node not reachable from a root is an error.
#[instrument(skip(tree))]
pub fn emit(tree: &Tree, id: NodeId, mode: EmitMode) -> Result<Element, Error> {
	let node = checked(tree, id)?;
	Ok(element(node, mode))
}

/// Emits the full element of `id` including all descendants, as if nothing were stubbed.
///
/// Used to estimate the size of deferred content. This doesn't consume any flags.
#[instrument(skip(tree))]
pub fn subtree(tree: &Tree, id: NodeId, depth_limit: usize) -> Result<Element, Error> {
	if depth_limit == 0 {
		return Err(tree.fail(Error::DepthLimit(id), id));
	}
	let node = checked(tree, id)?;
	let mut element = element(node, EmitMode::Create);
	element.scripts.extend(node.delayed_js.iter().cloned());
	for &child in &node.children {
		element.children.push(subtree(tree, child, depth_limit - 1)?);
	}
	Ok(element)
}

fn checked(tree: &Tree, id: NodeId) -> Result<&Node, Error> {
	let node = tree.get(id)?;
	if node.status.get(StatusFlag::BeingDeleted) {
		return Err(tree.fail(Error::BeingDeleted(id), id));
	}
	if !tree.is_attached(id) {
		return Err(tree.fail(Error::Detached(id), id));
	}
	Ok(node)
}

pub(crate) fn element(node: &Node, mode: EmitMode) -> Element {
	let span = trace_span!("element", id = %node.id, ?mode);
	let _enter = span.enter();

	let mut element = Element::new(node.dom_id.clone(), node.widget.kind());
	for &(flag, aspect) in ASPECTS {
		if mode.all() || node.dirty.get(flag) {
			trace!(?flag, "Emitting aspect.");
			aspect(node, &mut element, mode)
		}
	}

	if cfg!(feature = "dangerous-logging") && STATIC_MAX_LEVEL >= Level::TRACE {
		trace!(?element, "Emitted.");
	}
	element
}

/// The queued child removals of `node`.
///
/// If all children went away and none of them needs a custom removal statement, this collapses into one
/// [`Operation::RemoveChildren`].
pub(crate) fn removals(node: &Node) -> Vec<Operation> {
	let removals = &node.transient.removals;
	if node.render_state != RenderState::Materialized {
		return Vec::new();
	}
	if removals.len() > 1 && node.children.is_empty() && removals.iter().all(|removal| removal.script.is_none()) {
		trace!(id = %node.id, count = removals.len(), "Batched child removals.");
		return vec![Operation::RemoveChildren { id: node.dom_id.clone() }];
	}
	removals
		.iter()
		.map(|removal| match &removal.script {
			Some(script) => Operation::Script(script.clone()),
			None => Operation::Remove { id: removal.dom_id.clone() },
		})
		.collect()
}

fn is_offscreen(node: &Node) -> bool {
	node.status.get(StatusFlag::Hidden) && node.status.get(StatusFlag::HideWithOffsets)
}

fn display(node: &Node) -> &'static str {
	let inline = node.status.get(StatusFlag::Inline);
	if node.status.get(StatusFlag::Hidden) && !node.status.get(StatusFlag::HideWithVisibility) {
		"none"
	} else if inline == node.widget.is_default_inline() {
		""
	} else if inline {
		"inline"
	} else {
		"block"
	}
}

fn write_display(node: &Node, element: &mut Element, omit_defaults: bool) {
	let display = display(node);
	if !omit_defaults || !display.is_empty() {
		element.set_property(Property::StyleDisplay, display)
	}
}

fn write_position(node: &Node, element: &mut Element, omit_defaults: bool) {
	if is_offscreen(node) {
		element.set_property(Property::StylePosition, PositionScheme::Absolute.css())
	} else if !omit_defaults || node.layout.position != PositionScheme::Static {
		element.set_property(Property::StylePosition, node.layout.position.css())
	}
}

const OFFSET_PROPERTIES: [Property; 4] = [Property::StyleTop, Property::StyleRight, Property::StyleBottom, Property::StyleLeft];
const MARGIN_PROPERTIES: [Property; 4] = [Property::StyleMarginTop, Property::StyleMarginRight, Property::StyleMarginBottom, Property::StyleMarginLeft];

fn write_offsets(node: &Node, element: &mut Element, omit_defaults: bool) {
	let offscreen = is_offscreen(node);
	for (i, (&property, &length)) in OFFSET_PROPERTIES.iter().zip(node.layout.offsets.iter()).enumerate() {
		// Top and left.
		if offscreen && (i == 0 || i == 3) {
			element.set_property(property, "-10000px")
		} else {
			write_length(element, property, length, omit_defaults)
		}
	}
}

fn write_length(element: &mut Element, property: Property, length: Length, omit_defaults: bool) {
	if !omit_defaults || length != Length::Unset {
		element.set_property(property, length.to_string())
	}
}

fn geometry(node: &Node, element: &mut Element, mode: EmitMode) {
	let layout = &node.layout;
	let omit_defaults = mode.omit_defaults();
	write_display(node, element, omit_defaults);
	write_position(node, element, omit_defaults);
	if !omit_defaults || layout.clear != Side::None {
		element.set_property(Property::StyleClear, layout.clear.css())
	}
	write_length(element, Property::StyleMinWidth, layout.min_width, omit_defaults);
	write_length(element, Property::StyleMinHeight, layout.min_height, omit_defaults);
	write_length(element, Property::StyleMaxWidth, layout.max_width, omit_defaults);
	write_length(element, Property::StyleMaxHeight, layout.max_height, omit_defaults);
	if !omit_defaults || layout.vertical_align != VerticalAlign::Baseline {
		element.set_property(Property::StyleVerticalAlign, layout.vertical_align.css())
	}
	write_length(element, Property::StyleLineHeight, layout.line_height, omit_defaults);
}

fn z_index(node: &Node, element: &mut Element, mode: EmitMode) {
	match node.layout.z_index {
		Some(z_index) => element.set_property(Property::StyleZIndex, z_index.to_string()),
		None if !mode.omit_defaults() => element.set_property(Property::StyleZIndex, ""),
		None => (),
	}
}

fn offsets(node: &Node, element: &mut Element, mode: EmitMode) {
	write_offsets(node, element, mode.omit_defaults())
}

fn width(node: &Node, element: &mut Element, mode: EmitMode) {
	write_length(element, Property::StyleWidth, node.layout.width, mode.omit_defaults())
}

fn height(node: &Node, element: &mut Element, mode: EmitMode) {
	write_length(element, Property::StyleHeight, node.layout.height, mode.omit_defaults())
}

fn float_side(node: &Node, element: &mut Element, mode: EmitMode) {
	let float = match node.layout.float_side {
		Side::Left => "left",
		Side::Right => "right",
		Side::None | Side::Both => "none",
	};
	if !mode.omit_defaults() || float != "none" {
		element.set_property(Property::StyleFloat, float)
	}
}

fn margins(node: &Node, element: &mut Element, mode: EmitMode) {
	for (&property, &length) in MARGIN_PROPERTIES.iter().zip(node.layout.margins.iter()) {
		write_length(element, property, length, mode.omit_defaults())
	}
}

fn style_class(node: &Node, element: &mut Element, mode: EmitMode) {
	let transient = &node.transient;
	if mode.all() || transient.class_replaced {
		if !mode.omit_defaults() || !node.look.style_class.is_empty() {
			element.set_property(Property::Class, node.look.style_class.clone())
		}
	} else {
		element.removed_classes.extend(transient.removed_classes.iter().cloned());
		element.added_classes.extend(transient.added_classes.iter().cloned());
	}
}

fn tool_tip(node: &Node, element: &mut Element, mode: EmitMode) {
	match &node.look.tool_tip {
		Some(tool_tip) => element.set_attribute("title", tool_tip.clone()),
		None if !mode.omit_defaults() => element.set_attribute("title", ""),
		None => (),
	}
}

fn tab_index(node: &Node, element: &mut Element, mode: EmitMode) {
	match node.tab_index {
		Some(tab_index) => element.set_attribute("tabindex", tab_index.to_string()),
		None if !mode.omit_defaults() => element.set_attribute("tabindex", ""),
		None => (),
	}
}

fn selectable(node: &Node, element: &mut Element, mode: EmitMode) {
	if node.status.get(StatusFlag::Unselectable) {
		element.set_attribute("unselectable", "on")
	} else if node.status.get(StatusFlag::Selectable) {
		element.set_attribute("unselectable", "off")
	} else if !mode.omit_defaults() {
		element.set_attribute("unselectable", "")
	}
}

fn disabled(node: &Node, element: &mut Element, mode: EmitMode) {
	let disabled = node.status.get(StatusFlag::Disabled);
	if !mode.omit_defaults() || disabled {
		element.set_property(Property::Disabled, if disabled { "true" } else { "false" })
	}
}

fn attributes(node: &Node, element: &mut Element, mode: EmitMode) {
	if mode.all() {
		for (name, value) in &node.attributes {
			element.set_attribute(name.clone(), value.clone())
		}
	} else {
		for name in &node.transient.changed_attributes {
			if let Some(value) = node.attribute(name) {
				element.set_attribute(name.clone(), value)
			}
		}
	}
}

fn content(node: &Node, element: &mut Element, mode: EmitMode) {
	node.widget.update_content(element, mode.omit_defaults())
}

fn signals(node: &Node, element: &mut Element, mode: EmitMode) {
	if !mode.omit_defaults() {
		for event in &node.transient.unbound_events {
			element.set_event(event.clone(), "")
		}
	}
	for (event, _) in &node.events {
		element.set_event(event.clone(), signal_key(&node.dom_id, event))
	}
}

fn script(node: &Node, element: &mut Element, mode: EmitMode) {
	if mode.all() {
		for (name, expression) in &node.js_members {
			element.set_member(name.clone(), expression.clone())
		}
	} else {
		for name in &node.transient.changed_js_members {
			if let Some((_, expression)) = node.js_members.iter().find(|(n, _)| n == name) {
				element.set_member(name.clone(), expression.clone())
			}
		}
	}
	element.scripts.extend(node.transient.statements.iter().cloned())
}

/// Added children are created as separate operations by the render cycle.
fn children(_: &Node, _: &mut Element, _: EmitMode) {}

fn hidden(node: &Node, element: &mut Element, mode: EmitMode) {
	let hidden = node.status.get(StatusFlag::Hidden);
	let omit_defaults = mode.omit_defaults();
	write_display(node, element, omit_defaults);
	if node.status.get(StatusFlag::HideWithVisibility) {
		if hidden {
			element.set_property(Property::StyleVisibility, "hidden")
		} else if !omit_defaults {
			element.set_property(Property::StyleVisibility, "visible")
		}
	}
	if node.status.get(StatusFlag::HideWithOffsets) && (hidden || !omit_defaults) {
		write_position(node, element, omit_defaults);
		write_offsets(node, element, omit_defaults);
	}
}

#[cfg(test)]
mod tests {
	use super::{emit, EmitMode};
	use crate::{error::Error, flags::StatusFlag, node::ElementKind, tree::Tree};

	// Deletion marks nodes only while the tree removes them, so this state isn't reachable through `Session`.
	#[test]
	fn nodes_being_deleted_are_refused() -> Result<(), Error> {
		let mut tree = Tree::new("x");
		let root = tree.create(ElementKind::Div);
		tree.add_root(root)?;
		let child = tree.create(ElementKind::Div);
		tree.attach(root, child, None)?;

		tree.node_mut(child)?.status.set(StatusFlag::BeingDeleted);
		assert_eq!(emit(&tree, child, EmitMode::Full), Err(Error::BeingDeleted(child)));
		assert_eq!(emit(&tree, root, EmitMode::Full).map(|_| ()), Ok(()));
		Ok(())
	}
}
