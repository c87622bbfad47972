//! Signal Exposure Table: maps encoded event keys sent by the client to callback handles.
//!
//! Keys have the form `{client id}.{event name}`, so exposing the same event on the same node again yields the same
//! key, while a node with a new client id yields fresh keys.
//!
//! Only attached nodes have entries. Exposures of detached nodes are remembered on the node and entered once it is
//! attached again. Keys that disappear are kept in a short-lived memory, so that [`resolve`](`SignalTable::resolve`)
//! can tell a benign race from a bogus key.

use crate::{
	error::{Error, ResolveError},
	flags::{Flag, StatusFlag},
	node::{Node, NodeId},
	recent::RecentSet,
	tree::Tree,
};
use hashbrown::HashMap;
use tracing::{debug, instrument, trace};

/// Opaque handle the event loop maps to an actual callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallbackHandle(u64);

impl CallbackHandle {
	#[must_use]
	pub fn get(self) -> u64 {
		self.0
	}
}

/// Encodes the client-side key of `event` on the element `dom_id`.
#[must_use]
pub fn signal_key(dom_id: &str, event: &str) -> String {
	format!("{}.{}", dom_id, event)
}

#[derive(Debug, Clone, Copy)]
struct Entry {
	node: NodeId,
	handle: CallbackHandle,
}

#[derive(Debug, Default)]
pub struct SignalTable {
	entries: HashMap<String, Entry>,
	recent: RecentSet,
	next_handle: u64,
}

impl SignalTable {
	#[must_use]
	pub fn new() -> Self {
		Self {
			entries: HashMap::new(),
			recent: RecentSet::new(),
			next_handle: 0,
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// The node a key currently refers to.
	#[must_use]
	pub fn node(&self, key: &str) -> Option<NodeId> {
		self.entries.get(key).map(|entry| entry.node)
	}

	#[instrument(skip(self, tree))]
	pub(crate) fn expose(&mut self, tree: &mut Tree, id: NodeId, event: &str) -> Result<(String, CallbackHandle), Error> {
		let attached = tree.is_attached(id);
		let node = tree.node_mut(id)?;
		if node.status.get(StatusFlag::BeingDeleted) {
			return Err(tree.fail(Error::BeingDeleted(id), id));
		}
		let key = signal_key(&node.dom_id, event);
		if let Some(&(_, handle)) = node.events.iter().find(|(e, _)| e == event) {
			trace!(%key, "Already exposed.");
			return Ok((key, handle));
		}

		let handle = CallbackHandle(self.next_handle);
		self.next_handle += 1;
		node.events.push((event.to_owned(), handle));
		node.transient.unbound_events.retain(|e| e != event);
		if attached {
			self.entries.insert(key.clone(), Entry { node: id, handle });
			self.recent.remove(&key);
		}
		tree.set_flag(id, Flag::Signals)?;
		trace!(%key, ?handle, attached, "Exposed.");
		Ok((key, handle))
	}

	/// Returns whether `key` was exposed.
	#[instrument(skip(self, tree))]
	pub(crate) fn unexpose(&mut self, tree: &mut Tree, key: &str) -> Result<bool, Error> {
		let entry = match self.entries.remove(key) {
			Some(entry) => entry,
			None => return Ok(false),
		};
		self.recent.insert(key.to_owned());

		let node = tree.node_mut(entry.node)?;
		if let Some(position) = node.events.iter().position(|&(_, handle)| handle == entry.handle) {
			let (event, _) = node.events.remove(position);
			node.transient.unbound_events.push(event);
		}
		tree.set_flag(entry.node, Flag::Signals)?;
		trace!("Unexposed.");
		Ok(true)
	}

	/// Looks up the callback of an inbound client event.
	///
	/// # Errors
	///
	/// [`ResolveError::JustRemoved`] for keys removed during the current or previous cycle, which is an expected race.
	/// [`ResolveError::Unknown`] otherwise.
	pub fn resolve(&self, key: &str) -> Result<CallbackHandle, ResolveError> {
		match self.entries.get(key) {
			Some(entry) => Ok(entry.handle),
			None if self.recent.contains(key) => {
				debug!(key, "Signal key was removed recently.");
				Err(ResolveError::JustRemoved)
			}
			None => Err(ResolveError::Unknown),
		}
	}

	/// Removes the entries of the nodes `ids`, remembering the keys as recently removed.
	pub(crate) fn suspend(&mut self, tree: &Tree, ids: &[NodeId]) {
		for node in ids.iter().filter_map(|id| tree.node(*id)) {
			self.forget(node)
		}
	}

	/// Enters the remembered exposures of the nodes `ids`.
	pub(crate) fn restore(&mut self, tree: &Tree, ids: &[NodeId]) {
		for node in ids.iter().filter_map(|id| tree.node(*id)) {
			for (event, handle) in &node.events {
				let key = signal_key(&node.dom_id, event);
				self.recent.remove(&key);
				self.entries.insert(key, Entry { node: node.id, handle: *handle });
			}
		}
	}

	/// Drops the entries of destroyed nodes.
	pub(crate) fn remove_nodes(&mut self, nodes: &[Node]) {
		for node in nodes {
			self.forget(node)
		}
	}

	fn forget(&mut self, node: &Node) {
		for (event, _) in &node.events {
			let key = signal_key(&node.dom_id, event);
			if self.entries.remove(&key).is_some() {
				self.recent.insert(key)
			}
		}
	}

	/// Moves all entries of `node` from `old_dom_id` keys to keys under its current client id.
	///
	/// The replacement entries are computed before anything is removed, so the table is never observable with
	/// entries under both or neither key.
	#[instrument(skip(self, node))]
	pub(crate) fn rekey(&mut self, node: &Node, old_dom_id: &str) {
		let moved: Vec<_> = node
			.events
			.iter()
			.filter(|(event, _)| self.entries.contains_key(&signal_key(old_dom_id, event)))
			.map(|(event, handle)| (signal_key(old_dom_id, event), signal_key(&node.dom_id, event), *handle))
			.collect();
		for (old_key, new_key, handle) in moved {
			self.entries.remove(&old_key);
			self.entries.insert(new_key, Entry { node: node.id, handle });
		}
	}

	/// Ends the "recently removed" window of keys removed before the previous rotation.
	pub(crate) fn rotate(&mut self) {
		trace!(recent = self.recent.len(), "Rotating recently removed signal keys.");
		self.recent.rotate()
	}
}
