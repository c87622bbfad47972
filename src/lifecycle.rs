//! Lifecycle Manager: a node's client representation goes from nothing to stub and/or full element, and back.
//!
//! ```text
//! NotRendered ──► Stubbed ──► Materialized
//!      │                           ▲
//!      └───────────────────────────┘
//! ```
//!
//! Promotion happens at most once. A materialized node that becomes hidden again stays materialized.
//! Detaching returns a subtree to `NotRendered` after queueing the removal of whatever the client has.

use crate::{
	emit::{self, EmitMode},
	error::Error,
	flags::{Dirty, StatusFlag},
	node::{ElementKind, Node, NodeId},
	program::{Element, Property},
	tree::Tree,
};
use tracing::{error, instrument, trace, trace_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderState {
	NotRendered,
	/// A placeholder exists client-side.
	Stubbed,
	/// The full element exists client-side.
	Materialized,
}

/// A queued removal of one client element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Removal {
	pub dom_id: String,
	/// A custom removal statement supplied by the widget, if any.
	pub script: Option<String>,
}

/// Whether `node` needs a full representation right away, as opposed to a stub.
pub(crate) fn needs_render(node: &Node, visible_only: bool) -> bool {
	node.status.get(StatusFlag::DoNotStub) || !node.status.get(StatusFlag::Hidden) || !visible_only
}

/// The placeholder element for `node`.
///
/// Offset-hidden nodes are positioned off-screen rather than not displayed, so that their layout space is kept out of
/// the flow without affecting measurements.
#[must_use]
pub fn stub(node: &Node) -> Element {
	let mut element = Element::new(node.dom_id.clone(), ElementKind::Span);
	element.stub = true;
	if node.status.get(StatusFlag::HideWithOffsets) {
		element.set_property(Property::StylePosition, "absolute");
		element.set_property(Property::StyleTop, "-10000px");
		element.set_property(Property::StyleLeft, "-10000px");
		element.set_property(Property::StyleVisibility, "hidden");
	} else {
		element.set_property(Property::StyleDisplay, "none");
	}
	element.set_property(Property::InnerHtml, "...");
	element
}

/// Consumes all pending state of `node` without emitting it.
pub(crate) fn render_ok(node: &mut Node) {
	node.dirty = Dirty::empty();
	node.transient = Default::default();
}

/// Turns a `NotRendered` or `Stubbed` node into a full element, stubbing or materializing its children as needed.
///
/// All pending flags of the visited nodes are consumed.
#[instrument(skip(tree))]
pub(crate) fn materialize(tree: &mut Tree, id: NodeId, visible_only: bool, depth_limit: usize) -> Result<Element, Error> {
	if depth_limit == 0 {
		return Err(tree.fail(Error::DepthLimit(id), id));
	}

	let (mut element, children) = {
		let node = tree.node_mut(id)?;
		if node.render_state == RenderState::Materialized {
			let from = node.render_state;
			return Err(tree.fail(
				Error::InvalidTransition {
					node: id,
					from,
					to: RenderState::Materialized,
				},
				id,
			));
		}
		let mut element = emit::element(node, EmitMode::Create);
		element.scripts.extend(node.delayed_js.drain(..));
		node.render_state = RenderState::Materialized;
		render_ok(node);
		(element, node.children.clone())
	};
	tree.update_set.remove(&id);
	trace!(%id, "Materialized.");

	for child in children {
		let stub_child = {
			let child_node = tree.get(child)?;
			!needs_render(child_node, visible_only)
		};
		if stub_child {
			element.children.push(stub_into(tree, child)?);
		} else {
			element.children.push(materialize(tree, child, visible_only, depth_limit - 1)?);
		}
	}
	Ok(element)
}

/// `NotRendered → Stubbed`
#[instrument(skip(tree))]
pub(crate) fn stub_into(tree: &mut Tree, id: NodeId) -> Result<Element, Error> {
	let node = tree.node_mut(id)?;
	if node.render_state != RenderState::NotRendered {
		let from = node.render_state;
		return Err(tree.fail(
			Error::InvalidTransition {
				node: id,
				from,
				to: RenderState::Stubbed,
			},
			id,
		));
	}
	node.render_state = RenderState::Stubbed;
	render_ok(node);
	let element = stub(node);
	tree.update_set.remove(&id);
	trace!(%id, "Stubbed.");
	Ok(element)
}

/// `Stubbed → Materialized`, yielding the element that atomically replaces the stub.
///
/// # Errors
///
/// Promoting a node that isn't currently stubbed, for example a second time, fails with [`Error::InvalidTransition`].
#[instrument(skip(tree))]
pub fn promote(tree: &mut Tree, id: NodeId, visible_only: bool, depth_limit: usize) -> Result<Element, Error> {
	let from = tree.get(id)?.render_state;
	if from != RenderState::Stubbed {
		return Err(tree.fail(
			Error::InvalidTransition {
				node: id,
				from,
				to: RenderState::Materialized,
			},
			id,
		));
	}
	materialize(tree, id, visible_only, depth_limit)
}

/// Queues removal of `id`'s client representation on its parent (or the root list).
///
/// Nothing is queued if there is nothing to remove client-side, i.e. if `id` was never rendered, its parent isn't
/// materialized or the parent is being deleted itself.
pub(crate) fn queue_removal(tree: &mut Tree, id: NodeId) -> Result<(), Error> {
	let span = trace_span!("queue_removal", %id);
	let _enter = span.enter();

	let node = tree.get(id)?;
	let removal = match node.render_state {
		RenderState::NotRendered => return Ok(()),
		RenderState::Stubbed => Removal {
			dom_id: node.dom_id.clone(),
			script: None,
		},
		RenderState::Materialized => Removal {
			dom_id: node.dom_id.clone(),
			script: node.widget.removal_script(&node.dom_id),
		},
	};

	match node.parent {
		None => tree.root_removals.push(removal),
		Some(parent) => {
			let parent = tree.node_mut(parent)?;
			if parent.status.get(StatusFlag::BeingDeleted) {
				trace!("Removal elided, parent is being deleted.");
			} else if parent.render_state == RenderState::Materialized {
				parent.transient.removals.push(removal)
			} else {
				trace!(parent_state = ?parent.render_state, "Removal elided, parent has no full client representation.");
			}
		}
	}
	Ok(())
}

/// Returns a detached subtree to `NotRendered`, so that it is recreated in full if attached again.
pub(crate) fn reset(tree: &mut Tree, id: NodeId) {
	for id in tree.subtree(id) {
		if let Some(node) = tree.nodes.get_mut(&id) {
			node.render_state = RenderState::NotRendered;
			node.dirty = Dirty::all();
			node.transient = Default::default();
		}
	}
}

/// Whether some ancestor of `id` lacks a full client representation, i.e. `id` lives inside a stub or an unrendered
/// subtree.
pub(crate) fn is_inside_placeholder(tree: &Tree, id: NodeId) -> bool {
	let mut current = tree.node(id).and_then(|node| node.parent);
	while let Some(parent) = current {
		match tree.node(parent) {
			Some(node) if node.render_state == RenderState::Materialized => current = node.parent,
			Some(_) => return true,
			None => {
				error!(%parent, "Dangling parent reference.");
				return true;
			}
		}
	}
	false
}
