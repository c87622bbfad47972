//! Render Cycle Controller.
//!
//! One cycle, in order:
//!
//! 1. All queued removals.
//! 2. The update set, ordered by depth: updates of materialized nodes (followed by creation of their new children),
//!    promotion of stubs that are now needed, creation of new roots.
//! 3. Two-phase delivery: after the first visible-only render, deferred stubs are either promoted inline or left for a
//!    [`RenderMode::LoadInvisible`] cycle.
//! 4. Mirrored value initialisation and the form object list.
//!
//! Every node the cycle reaches consumes its flags, whether or not that produced an operation.

use crate::{
	config::Config,
	emit::{self, EmitMode},
	error::Error,
	flags::StatusFlag,
	lifecycle::{self, RenderState},
	mirror::MirrorStore,
	node::NodeId,
	program::{Element, Operation, Program},
	signals::SignalTable,
	tree::Tree,
};
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub enum RenderMode {
	/// Re-derive all aspects of every changed node.
	Full,
	/// Only what changed.
	Update,
	/// Fallback render before client capabilities are known: nothing new is stubbed, and reaching an existing stub
	/// reports [`Program::learning_complete`] as `false`.
	PreLearning,
	/// The client asks for deferred invisible content. Promotes all remaining stubs.
	LoadInvisible,
}

#[derive(Debug)]
pub(crate) struct Renderer {
	first_render_done: bool,
	visible_only: bool,
	last_form_objects: Vec<String>,
}

impl Renderer {
	pub fn new(config: &Config) -> Self {
		Self {
			first_render_done: false,
			visible_only: config.defer_invisible,
			last_form_objects: Vec::new(),
		}
	}
}

struct Cycle<'a> {
	tree: &'a mut Tree,
	program: Program,
	mode: RenderMode,
	visible_only: bool,
	depth_limit: usize,
}

#[instrument(skip(config, tree, signals, mirror, renderer))]
pub(crate) fn render(config: &Config, tree: &mut Tree, signals: &mut SignalTable, mirror: &mut MirrorStore, renderer: &mut Renderer, mode: RenderMode) -> Result<Program, Error> {
	if mode == RenderMode::LoadInvisible {
		renderer.visible_only = false;
	}

	let mut visit: Vec<(usize, NodeId)> = tree.update_set().filter_map(|id| tree.depth(id).ok().map(|depth| (depth, id))).collect();
	visit.sort_unstable();
	let visit: Vec<NodeId> = visit.into_iter().map(|(_, id)| id).collect();

	let mut cycle = Cycle {
		tree,
		program: Program::new(),
		mode,
		visible_only: renderer.visible_only && mode != RenderMode::PreLearning,
		depth_limit: config.depth_limit,
	};

	cycle.removals(&visit);
	for &id in &visit {
		cycle.visit(id)?;
	}

	if mode == RenderMode::LoadInvisible {
		cycle.promote_stubs()?;
	} else if !renderer.first_render_done && cycle.visible_only && mode != RenderMode::PreLearning {
		let deferred = cycle.deferred_size(&config.client_namespace)?;
		if deferred == 0 {
			trace!("Nothing deferred.");
		} else if deferred < config.two_phase_threshold {
			trace!(deferred, "Inlining deferred content.");
			renderer.visible_only = false;
			cycle.visible_only = false;
			cycle.promote_stubs()?;
		} else {
			trace!(deferred, "Deferring invisible content to a second phase.");
			cycle.program.fetch_invisible = true;
		}
	}

	let Cycle { tree, mut program, .. } = cycle;

	for script in mirror.init_scripts(tree, &config.client_namespace) {
		program.push(Operation::Script(script))
	}

	let form_objects: Vec<String> = tree
		.attached()
		.into_iter()
		.filter_map(|id| tree.node(id))
		.filter(|node| node.status.get(StatusFlag::FormObject) && !node.is_hidden() && node.render_state == RenderState::Materialized)
		.map(|node| node.dom_id.clone())
		.collect();
	if form_objects != renderer.last_form_objects {
		program.push(Operation::SetFormObjects(form_objects.clone()));
		renderer.last_form_objects = form_objects;
	}

	tree.learning = mode == RenderMode::PreLearning;
	signals.rotate();
	if mode != RenderMode::PreLearning {
		renderer.first_render_done = true;
		if STATIC_MAX_LEVEL >= Level::ERROR && !tree.update_set.is_empty() {
			error!(count = tree.update_set.len(), "Nodes are still marked for update after a render cycle.");
		}
	}

	info!(operations = program.operations.len(), learning_complete = program.learning_complete, fetch_invisible = program.fetch_invisible, "Rendered.");
	Ok(program)
}

impl Cycle<'_> {
	fn removals(&mut self, visit: &[NodeId]) {
		let span = trace_span!("removals");
		let _enter = span.enter();

		for removal in self.tree.root_removals.drain(..) {
			self.program.push(match removal.script {
				Some(script) => Operation::Script(script),
				None => Operation::Remove { id: removal.dom_id },
			})
		}
		for id in visit {
			if let Some(node) = self.tree.nodes.get_mut(id) {
				self.program.operations.extend(emit::removals(node));
				node.transient.removals.clear();
			}
		}
	}

	fn visit(&mut self, id: NodeId) -> Result<(), Error> {
		let span = trace_span!("visit", %id);
		let _enter = span.enter();

		if !self.tree.update_set.contains(&id) {
			trace!("Already rendered during this cycle.");
			return Ok(());
		}

		let render_state = match self.tree.node(id) {
			Some(node) if self.tree.is_attached(id) => node.render_state,
			_ => {
				trace!("Not attached, skipping.");
				self.tree.update_set.remove(&id);
				return Ok(());
			}
		};

		match render_state {
			RenderState::Materialized => self.update(id),
			RenderState::Stubbed => self.visit_stub(id),
			RenderState::NotRendered => {
				if let Some(index) = self.tree.roots.iter().position(|&root| root == id) {
					let element = self.create(id)?;
					self.program.push(Operation::Create { parent: None, index, element });
				} else {
					// Created along with its parent, or lives inside a placeholder.
					self.tree.update_set.remove(&id);
				}
				Ok(())
			}
		}
	}

	/// Creates a stub or full element for a `NotRendered` node.
	fn create(&mut self, id: NodeId) -> Result<Element, Error> {
		if lifecycle::needs_render(self.tree.get(id)?, self.visible_only) {
			lifecycle::materialize(self.tree, id, self.visible_only, self.depth_limit)
		} else {
			lifecycle::stub_into(self.tree, id)
		}
	}

	fn update(&mut self, id: NodeId) -> Result<(), Error> {
		let node = self.tree.node_mut(id)?;
		let mode = if self.mode == RenderMode::Full {
			EmitMode::Full
		} else {
			EmitMode::Incremental
		};
		let element = emit::element(node, mode);
		let added: Vec<(usize, NodeId)> = node
			.children
			.iter()
			.enumerate()
			.filter(|(_, child)| node.transient.added_children.contains(*child))
			.map(|(index, &child)| (index, child))
			.collect();
		let dom_id = node.dom_id.clone();
		lifecycle::render_ok(node);
		self.tree.update_set.remove(&id);

		if !element.is_empty() {
			self.program.push(Operation::Update(element));
		}
		for (index, child) in added {
			if self.tree.get(child)?.render_state != RenderState::NotRendered {
				continue;
			}
			let element = self.create(child)?;
			self.program.push(Operation::Create {
				parent: Some(dom_id.clone()),
				index,
				element,
			});
		}
		Ok(())
	}

	fn visit_stub(&mut self, id: NodeId) -> Result<(), Error> {
		let needed = {
			let node = self.tree.get(id)?;
			lifecycle::needs_render(node, self.visible_only) && !lifecycle::is_inside_placeholder(&*self.tree, id)
		};

		if self.mode == RenderMode::PreLearning {
			trace!("Reached a stub while learning.");
			lifecycle::render_ok(self.tree.node_mut(id)?);
			self.program.learning_complete = false;
		} else if needed {
			let element = lifecycle::promote(self.tree, id, self.visible_only, self.depth_limit)?;
			self.program.push(Operation::Unstub(element));
		} else {
			lifecycle::render_ok(self.tree.node_mut(id)?);
			self.tree.update_set.remove(&id);
		}
		Ok(())
	}

	fn stubs(&self) -> Vec<NodeId> {
		self.tree
			.attached()
			.into_iter()
			.filter(|&id| self.tree.node(id).map_or(false, |node| node.render_state == RenderState::Stubbed))
			.collect()
	}

	/// Byte size of the program that would promote all stubs.
	fn deferred_size(&self, namespace: &str) -> Result<usize, Error> {
		let mut program = Program::new();
		for id in self.stubs() {
			program.push(Operation::Unstub(emit::subtree(&*self.tree, id, self.depth_limit)?));
		}
		Ok(program.to_javascript(namespace).len())
	}

	fn promote_stubs(&mut self) -> Result<(), Error> {
		for id in self.stubs() {
			let element = lifecycle::promote(self.tree, id, self.visible_only, self.depth_limit)?;
			self.program.push(Operation::Unstub(element));
		}
		Ok(())
	}
}
