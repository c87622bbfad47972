//! The per-session node arena and its mutation entry points.
//!
//! Every setter writes the per-aspect value *and* sets the matching [`Flag`], then records the node in the update set.
//! Outside of learning mode, writing a value equal to the current one is a no-op.
//!
//! Structural changes that also affect the signal table and mirrored values (attaching, detaching, destroying and
//! client id changes) are reached through [`SessionState`](`crate::session::SessionState`).

use crate::{
	error::Error,
	flags::{Flag, StatusFlag},
	lifecycle::{self, Removal, RenderState},
	node::{Edges, Length, Node, NodeId, PositionScheme, Side, VerticalAlign, Widget},
};
use hashbrown::{HashMap, HashSet};
use tracing::{error, instrument, trace};

/// How a hidden node is hidden client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideMethod {
	/// `display: none`
	Display,
	/// `visibility: hidden`, keeping the layout space.
	Visibility,
	/// Moved off-screen, so that the element can still be measured.
	Offsets,
}

#[derive(Debug)]
pub struct Tree {
	pub(crate) nodes: HashMap<NodeId, Node>,
	pub(crate) roots: Vec<NodeId>,
	pub(crate) root_removals: Vec<Removal>,
	pub(crate) update_set: HashSet<NodeId>,
	/// While set, setters mark flags even for unchanged values.
	pub(crate) learning: bool,
	dom_ids: HashMap<String, NodeId>,
	id_prefix: String,
	next_id: u64,
}

impl Tree {
	#[must_use]
	pub fn new(id_prefix: impl Into<String>) -> Self {
		Self {
			nodes: HashMap::new(),
			roots: Vec::new(),
			root_removals: Vec::new(),
			update_set: HashSet::new(),
			learning: false,
			dom_ids: HashMap::new(),
			id_prefix: id_prefix.into(),
			next_id: 0,
		}
	}

	/// Creates a new detached node. All of its dirty bits start set.
	pub fn create(&mut self, widget: impl Widget + 'static) -> NodeId {
		self.create_boxed(Box::new(widget))
	}

	pub fn create_boxed(&mut self, widget: Box<dyn Widget>) -> NodeId {
		let id = loop {
			let id = NodeId(self.next_id);
			self.next_id += 1;
			// Skip ids that collide with an explicitly assigned client id.
			if !self.dom_ids.contains_key(&format!("{}{}", self.id_prefix, id)) {
				break id;
			}
		};
		let dom_id = format!("{}{}", self.id_prefix, id);
		trace!(%id, %dom_id, "Created node.");
		self.dom_ids.insert(dom_id.clone(), id);
		self.nodes.insert(id, Node::new(id, dom_id, widget));
		self.update_set.insert(id);
		id
	}

	pub fn get(&self, id: NodeId) -> Result<&Node, Error> {
		self.nodes.get(&id).ok_or(Error::UnknownNode(id))
	}

	#[must_use]
	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(&id)
	}

	pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, Error> {
		self.nodes.get_mut(&id).ok_or(Error::UnknownNode(id))
	}

	#[must_use]
	pub fn roots(&self) -> &[NodeId] {
		&self.roots
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	#[must_use]
	pub fn by_dom_id(&self, dom_id: &str) -> Option<NodeId> {
		self.dom_ids.get(dom_id).copied()
	}

	/// Nodes with pending changes, in no particular order.
	pub fn update_set(&self) -> impl '_ + Iterator<Item = NodeId> {
		self.update_set.iter().copied()
	}

	/// Whether `id` is reachable from a root.
	#[must_use]
	pub fn is_attached(&self, id: NodeId) -> bool {
		let mut current = id;
		loop {
			match self.nodes.get(&current) {
				None => return false,
				Some(node) => match node.parent {
					Some(parent) => current = parent,
					None => return self.roots.contains(&current),
				},
			}
		}
	}

	/// Number of ancestors.
	pub fn depth(&self, id: NodeId) -> Result<usize, Error> {
		let mut depth = 0;
		let mut current = self.get(id)?;
		while let Some(parent) = current.parent {
			depth += 1;
			current = self.get(parent)?;
		}
		Ok(depth)
	}

	/// Ids from the topmost ancestor down to `id`.
	#[must_use]
	pub fn path(&self, id: NodeId) -> Vec<NodeId> {
		let mut path = vec![id];
		let mut current = id;
		while let Some(parent) = self.nodes.get(&current).and_then(|node| node.parent) {
			path.push(parent);
			current = parent;
		}
		path.reverse();
		path
	}

	/// Logs `error` (with the node's path if enabled) and hands it back for returning.
	pub(crate) fn fail(&self, error: Error, at: NodeId) -> Error {
		if cfg!(feature = "log-paths") {
			error!(path = ?self.path(at), "{}", error);
		} else {
			error!("{}", error);
		}
		error
	}

	/// Ids of `id` and all of its descendants, pre-order.
	pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
		let mut ids = Vec::new();
		let mut stack = vec![id];
		while let Some(id) = stack.pop() {
			if let Some(node) = self.nodes.get(&id) {
				ids.push(id);
				stack.extend(node.children.iter().rev());
			}
		}
		ids
	}

	/// Nodes in tree order, starting from the roots.
	pub(crate) fn attached(&self) -> Vec<NodeId> {
		self.roots.iter().flat_map(|&root| self.subtree(root)).collect()
	}

	#[instrument(skip(self))]
	pub(crate) fn add_root(&mut self, id: NodeId) -> Result<(), Error> {
		let node = self.get(id)?;
		if let Some(parent) = node.parent {
			return Err(self.fail(Error::AlreadyParented { child: id, parent }, id));
		}
		if self.roots.contains(&id) {
			return Err(self.fail(Error::Root(id), id));
		}
		self.roots.push(id);
		self.update_set.insert(id);
		Ok(())
	}

	/// Inserts `child` below `parent` at `index`, or last.
	#[instrument(skip(self))]
	pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> Result<(), Error> {
		let child_node = self.get(child)?;
		let parent_node = self.get(parent)?;
		if let Some(existing) = child_node.parent {
			return Err(self.fail(Error::AlreadyParented { child, parent: existing }, child));
		}
		if self.roots.contains(&child) {
			return Err(self.fail(Error::Root(child), child));
		}
		if parent_node.status.get(StatusFlag::BeingDeleted) {
			return Err(self.fail(Error::BeingDeleted(parent), parent));
		}
		if self.path(parent).contains(&child) {
			return Err(self.fail(Error::Cycle { parent, child }, parent));
		}

		let parent_node = self.node_mut(parent)?;
		let index = index.map_or(parent_node.children.len(), |index| index.min(parent_node.children.len()));
		parent_node.children.insert(index, child);
		parent_node.transient.added_children.push(child);
		parent_node.dirty.set(Flag::Children);
		self.node_mut(child)?.parent = Some(parent);
		self.update_set.insert(parent);
		self.update_set.insert(child);
		Ok(())
	}

	/// Unlinks `id` from its parent (or the root list) and queues the removal of its client representation.
	#[instrument(skip(self))]
	pub(crate) fn detach(&mut self, id: NodeId) -> Result<(), Error> {
		let parent = self.get(id)?.parent;
		match parent {
			Some(parent) => {
				lifecycle::queue_removal(self, id)?;
				let parent_node = self.node_mut(parent)?;
				parent_node.children.retain(|&c| c != id);
				parent_node.transient.added_children.retain(|&c| c != id);
				self.update_set.insert(parent);
				self.node_mut(id)?.parent = None;
			}
			None if self.roots.contains(&id) => {
				lifecycle::queue_removal(self, id)?;
				self.roots.retain(|&r| r != id);
			}
			None => return Err(self.fail(Error::Detached(id), id)),
		}
		lifecycle::reset(self, id);
		Ok(())
	}

	/// Removes `id` and its descendants from the arena, detaching it first if necessary.
	///
	/// Returns the removed nodes along with their event names, so that dependent tables can be cleaned up.
	#[instrument(skip(self))]
	pub(crate) fn destroy(&mut self, id: NodeId) -> Result<Vec<Node>, Error> {
		let subtree = {
			let node = self.get(id)?;
			if node.status.get(StatusFlag::BeingDeleted) {
				return Err(self.fail(Error::BeingDeleted(id), id));
			}
			self.subtree(id)
		};
		for &id in &subtree {
			self.node_mut(id)?.status.set(StatusFlag::BeingDeleted);
		}
		if self.get(id)?.parent.is_some() || self.roots.contains(&id) {
			self.detach(id)?;
		}

		let mut removed = Vec::with_capacity(subtree.len());
		for id in subtree {
			self.update_set.remove(&id);
			if let Some(node) = self.nodes.remove(&id) {
				self.dom_ids.remove(&node.dom_id);
				removed.push(node);
			}
		}
		trace!(count = removed.len(), "Destroyed nodes.");
		Ok(removed)
	}

	/// Assigns an explicit client id. Only possible before the node has a client representation.
	///
	/// Returns the previous client id.
	#[instrument(skip(self))]
	pub(crate) fn set_dom_id(&mut self, id: NodeId, dom_id: String) -> Result<String, Error> {
		let node = self.get(id)?;
		if node.dom_id == dom_id {
			return Ok(dom_id);
		}
		if node.render_state != RenderState::NotRendered {
			return Err(self.fail(Error::Rendered(id), id));
		}
		if self.dom_ids.contains_key(&dom_id) {
			return Err(self.fail(Error::DuplicateDomId(dom_id), id));
		}
		let node = self.node_mut(id)?;
		let previous = core::mem::replace(&mut node.dom_id, dom_id.clone());
		self.dom_ids.remove(&previous);
		self.dom_ids.insert(dom_id, id);
		Ok(previous)
	}

	/// Marks `flag` dirty on `id`.
	pub fn set_flag(&mut self, id: NodeId, flag: Flag) -> Result<(), Error> {
		self.node_mut(id)?.dirty.set(flag);
		self.update_set.insert(id);
		trace!(%id, ?flag, "Set flag.");
		Ok(())
	}

	/// Drops all pending dirty bits of `id` without emitting anything.
	pub fn clear_all_flags(&mut self, id: NodeId) -> Result<(), Error> {
		let node = self.node_mut(id)?;
		node.dirty.clear_all();
		node.transient = Default::default();
		self.update_set.remove(&id);
		Ok(())
	}

	fn update<T: PartialEq>(&mut self, id: NodeId, flag: Flag, value: T, field: impl FnOnce(&mut Node) -> &mut T) -> Result<(), Error> {
		let learning = self.learning;
		let slot = field(self.node_mut(id)?);
		if *slot == value && !learning {
			return Ok(());
		}
		*slot = value;
		self.set_flag(id, flag)
	}

	fn update_status(&mut self, id: NodeId, bit: StatusFlag, value: bool, flag: Option<Flag>) -> Result<(), Error> {
		let learning = self.learning;
		let node = self.node_mut(id)?;
		if node.status.get(bit) == value && !learning {
			return Ok(());
		}
		node.status.set_to(bit, value);
		match flag {
			Some(flag) => self.set_flag(id, flag),
			None => Ok(()),
		}
	}

	pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> Result<(), Error> {
		self.update_status(id, StatusFlag::Hidden, hidden, Some(Flag::Hidden))
	}

	pub fn set_hide_method(&mut self, id: NodeId, method: HideMethod) -> Result<(), Error> {
		let (visibility, offsets) = match method {
			HideMethod::Display => (false, false),
			HideMethod::Visibility => (true, false),
			HideMethod::Offsets => (true, true),
		};
		self.update_status(id, StatusFlag::HideWithVisibility, visibility, Some(Flag::Hidden))?;
		self.update_status(id, StatusFlag::HideWithOffsets, offsets, Some(Flag::Hidden))
	}

	pub fn set_inline(&mut self, id: NodeId, inline: bool) -> Result<(), Error> {
		self.update_status(id, StatusFlag::Inline, inline, Some(Flag::Geometry))
	}

	pub fn set_disabled(&mut self, id: NodeId, disabled: bool) -> Result<(), Error> {
		self.update_status(id, StatusFlag::Disabled, disabled, Some(Flag::Disabled))
	}

	/// `None` leaves text selection up to the client's default.
	pub fn set_selectable(&mut self, id: NodeId, selectable: Option<bool>) -> Result<(), Error> {
		self.update_status(id, StatusFlag::Selectable, selectable == Some(true), Some(Flag::Selectable))?;
		self.update_status(id, StatusFlag::Unselectable, selectable == Some(false), Some(Flag::Selectable))
	}

	/// Whether `id` may be stubbed while hidden. On by default.
	pub fn set_load_later(&mut self, id: NodeId, load_later: bool) -> Result<(), Error> {
		self.update_status(id, StatusFlag::DoNotStub, !load_later, None)
	}

	/// Whether the client should post `id`'s value back with each event.
	pub fn set_form_object(&mut self, id: NodeId, form_object: bool) -> Result<(), Error> {
		self.update_status(id, StatusFlag::FormObject, form_object, None)
	}

	pub fn set_position_scheme(&mut self, id: NodeId, position: PositionScheme) -> Result<(), Error> {
		self.update(id, Flag::Geometry, position, |node| &mut node.layout.position)
	}

	pub fn set_offsets(&mut self, id: NodeId, offsets: Edges) -> Result<(), Error> {
		self.update(id, Flag::Offsets, offsets, |node| &mut node.layout.offsets)
	}

	pub fn set_z_index(&mut self, id: NodeId, z_index: Option<i32>) -> Result<(), Error> {
		self.update(id, Flag::ZIndex, z_index, |node| &mut node.layout.z_index)
	}

	pub fn set_float_side(&mut self, id: NodeId, side: Side) -> Result<(), Error> {
		self.update(id, Flag::FloatSide, side, |node| &mut node.layout.float_side)
	}

	pub fn set_clear_sides(&mut self, id: NodeId, sides: Side) -> Result<(), Error> {
		self.update(id, Flag::Geometry, sides, |node| &mut node.layout.clear)
	}

	pub fn set_minimum_size(&mut self, id: NodeId, width: Length, height: Length) -> Result<(), Error> {
		self.update(id, Flag::Geometry, width, |node| &mut node.layout.min_width)?;
		self.update(id, Flag::Geometry, height, |node| &mut node.layout.min_height)
	}

	pub fn set_maximum_size(&mut self, id: NodeId, width: Length, height: Length) -> Result<(), Error> {
		self.update(id, Flag::Geometry, width, |node| &mut node.layout.max_width)?;
		self.update(id, Flag::Geometry, height, |node| &mut node.layout.max_height)
	}

	pub fn set_width(&mut self, id: NodeId, width: Length) -> Result<(), Error> {
		self.update(id, Flag::Width, width, |node| &mut node.layout.width)
	}

	pub fn set_height(&mut self, id: NodeId, height: Length) -> Result<(), Error> {
		self.update(id, Flag::Height, height, |node| &mut node.layout.height)
	}

	pub fn resize(&mut self, id: NodeId, width: Length, height: Length) -> Result<(), Error> {
		self.set_width(id, width)?;
		self.set_height(id, height)
	}

	pub fn set_margins(&mut self, id: NodeId, margins: Edges) -> Result<(), Error> {
		self.update(id, Flag::Margins, margins, |node| &mut node.layout.margins)
	}

	pub fn set_vertical_alignment(&mut self, id: NodeId, align: VerticalAlign, line_height: Length) -> Result<(), Error> {
		self.update(id, Flag::Geometry, align, |node| &mut node.layout.vertical_align)?;
		self.update(id, Flag::Geometry, line_height, |node| &mut node.layout.line_height)
	}

	/// Replaces the whole class string.
	pub fn set_style_class(&mut self, id: NodeId, style_class: impl Into<String>) -> Result<(), Error> {
		let style_class = style_class.into();
		let learning = self.learning;
		let node = self.node_mut(id)?;
		if node.look.style_class == style_class && !learning {
			return Ok(());
		}
		node.look.style_class = style_class;
		node.transient.class_replaced = true;
		node.transient.added_classes.clear();
		node.transient.removed_classes.clear();
		self.set_flag(id, Flag::StyleClass)
	}

	/// Adds one class. On a rendered node, this is sent as a single class list change.
	pub fn add_style_class(&mut self, id: NodeId, class: &str) -> Result<(), Error> {
		let node = self.node_mut(id)?;
		if class.is_empty() || node.look.style_class.split_whitespace().any(|c| c == class) {
			return Ok(());
		}
		if !node.look.style_class.is_empty() {
			node.look.style_class.push(' ');
		}
		node.look.style_class.push_str(class);
		if !node.transient.class_replaced {
			node.transient.removed_classes.retain(|c| c != class);
			node.transient.added_classes.push(class.to_owned());
		}
		self.set_flag(id, Flag::StyleClass)
	}

	pub fn remove_style_class(&mut self, id: NodeId, class: &str) -> Result<(), Error> {
		let node = self.node_mut(id)?;
		if !node.look.style_class.split_whitespace().any(|c| c == class) {
			return Ok(());
		}
		node.look.style_class = node.look.style_class.split_whitespace().filter(|&c| c != class).collect::<Vec<_>>().join(" ");
		if !node.transient.class_replaced {
			node.transient.added_classes.retain(|c| c != class);
			node.transient.removed_classes.push(class.to_owned());
		}
		self.set_flag(id, Flag::StyleClass)
	}

	pub fn set_tool_tip(&mut self, id: NodeId, tool_tip: Option<String>) -> Result<(), Error> {
		self.update(id, Flag::ToolTip, tool_tip, |node| &mut node.look.tool_tip)
	}

	pub fn set_tab_index(&mut self, id: NodeId, tab_index: Option<i32>) -> Result<(), Error> {
		self.update(id, Flag::TabIndex, tab_index, |node| &mut node.tab_index)
	}

	pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) -> Result<(), Error> {
		let (name, value) = (name.into(), value.into());
		let learning = self.learning;
		let node = self.node_mut(id)?;
		match node.attributes.iter_mut().find(|(n, _)| *n == name) {
			Some((_, existing)) if *existing == value && !learning => return Ok(()),
			Some((_, existing)) => *existing = value,
			None => node.attributes.push((name.clone(), value)),
		}
		if !node.transient.changed_attributes.contains(&name) {
			node.transient.changed_attributes.push(name);
		}
		self.set_flag(id, Flag::Attributes)
	}

	/// Sets a custom JavaScript member of the client element to the result of `expression`.
	pub fn set_js_member(&mut self, id: NodeId, name: impl Into<String>, expression: impl Into<String>) -> Result<(), Error> {
		let (name, expression) = (name.into(), expression.into());
		let learning = self.learning;
		let node = self.node_mut(id)?;
		match node.js_members.iter_mut().find(|(n, _)| *n == name) {
			Some((_, existing)) if *existing == expression && !learning => return Ok(()),
			Some((_, existing)) => *existing = expression,
			None => node.js_members.push((name.clone(), expression)),
		}
		if !node.transient.changed_js_members.contains(&name) {
			node.transient.changed_js_members.push(name);
		}
		self.set_flag(id, Flag::Script)
	}

	/// Queues a statement to run client-side.
	///
	/// Statements for a node without a full client representation are held back until it's materialized.
	pub fn do_javascript(&mut self, id: NodeId, statement: impl Into<String>) -> Result<(), Error> {
		let node = self.node_mut(id)?;
		if node.render_state == RenderState::Materialized {
			node.transient.statements.push(statement.into());
			self.set_flag(id, Flag::Script)
		} else {
			node.delayed_js.push(statement.into());
			Ok(())
		}
	}

	/// Swaps the widget-side content. The element kind must stay the same.
	pub fn replace_widget(&mut self, id: NodeId, widget: impl Widget + 'static) -> Result<(), Error> {
		let node = self.node_mut(id)?;
		if node.widget.kind() != widget.kind() && node.render_state != RenderState::NotRendered {
			return Err(self.fail(Error::Rendered(id), id));
		}
		node.widget = Box::new(widget);
		self.set_flag(id, Flag::Content)
	}
}
