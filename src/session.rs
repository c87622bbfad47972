//! Session context and the Update Lock.
//!
//! All state of one session lives in a [`SessionState`] behind a [`Session`]'s reentrant lock. Every operation takes
//! that state explicitly; there is no ambient "current session".
//!
//! ```rust
//! use xylem::{config::Config, node::ElementKind, render::RenderMode, session::Session};
//!
//! let session = Session::new(Config::default());
//! let lock = session.lock()?;
//! {
//! 	let mut state = lock.state()?;
//! 	let root = state.create(ElementKind::Div);
//! 	state.add_root(root)?;
//! }
//! let program = lock.render(RenderMode::Full)?;
//! assert_eq!(program.operations.len(), 1);
//! # Ok::<(), xylem::error::Error>(())
//! ```

use crate::{
	config::Config,
	error::{Error, ResolveError},
	flags::StatusFlag,
	mirror::{Matrix4, Mirror, MirrorStore, SyncReport, Value},
	node::{NodeId, Widget},
	program::Program,
	render::{self, RenderMode, Renderer},
	signals::{CallbackHandle, SignalTable},
	tree::Tree,
};
use core::{
	cell::{RefCell, RefMut},
	fmt::{self, Debug, Display, Formatter},
	sync::atomic::{AtomicBool, AtomicU64, Ordering},
};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, instrument, trace};

/// Process-unique session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(0);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	#[must_use]
	pub fn get(self) -> u64 {
		self.0
	}
}

impl Display for SessionId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

thread_local! {
	/// Sessions whose lock this thread currently holds, innermost last.
	static HELD: RefCell<Vec<SessionId>> = RefCell::new(Vec::new());
}

type Notifier = Box<dyn Fn(SessionId) + Send + Sync>;

/// One tree with its signal table and mirrored values, and the lock serializing all access to them.
pub struct Session {
	id: SessionId,
	state: ReentrantMutex<RefCell<SessionState>>,
	rendering: AtomicBool,
	update_requested: AtomicBool,
	notifier: Mutex<Option<Notifier>>,
}

impl Debug for Session {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("id", &self.id)
			.field("rendering", &self.rendering)
			.field("update_requested", &self.update_requested)
			.finish_non_exhaustive()
	}
}

impl Session {
	#[must_use]
	pub fn new(config: Config) -> Self {
		let id = SessionId::next();
		Self {
			id,
			state: ReentrantMutex::new(RefCell::new(SessionState::new(id, config))),
			rendering: AtomicBool::new(false),
			update_requested: AtomicBool::new(false),
			notifier: Mutex::new(None),
		}
	}

	#[must_use]
	pub fn id(&self) -> SessionId {
		self.id
	}

	/// Acquires the Update Lock, blocking while another thread holds it.
	///
	/// Reentrant on the same thread, except during a render cycle.
	///
	/// # Errors
	///
	/// [`Error::ForeignSessionLock`] if this thread already holds another session's lock.
	/// [`Error::LockDuringRender`] if this session is rendering on this thread.
	#[instrument(skip(self), fields(session = %self.id))]
	pub fn lock(&self) -> Result<UpdateLock<'_>, Error> {
		let reentrant = HELD.with(|held| {
			let held = held.borrow();
			match held.iter().find(|&&held| held != self.id) {
				Some(&other) => Err(Error::ForeignSessionLock { held: other, requested: self.id }),
				None => Ok(!held.is_empty()),
			}
		})?;
		if reentrant && self.rendering.load(Ordering::Acquire) {
			return Err(Error::LockDuringRender);
		}

		let guard = self.state.lock();
		HELD.with(|held| held.borrow_mut().push(self.id));
		trace!(reentrant, "Locked.");
		Ok(UpdateLock { session: self, guard })
	}

	/// Requests a render cycle for changes made outside of regular event handling.
	///
	/// Calls the notifier installed with [`set_update_notifier`](`Session::set_update_notifier`), if any.
	pub fn trigger_update(&self) {
		self.update_requested.store(true, Ordering::Release);
		debug!(session = %self.id, "Update triggered.");
		if let Some(notifier) = &*self.notifier.lock() {
			notifier(self.id)
		}
	}

	/// Whether [`trigger_update`](`Session::trigger_update`) was called since the last render cycle.
	#[must_use]
	pub fn update_requested(&self) -> bool {
		self.update_requested.load(Ordering::Acquire)
	}

	pub fn set_update_notifier(&self, notifier: impl Fn(SessionId) + Send + Sync + 'static) {
		*self.notifier.lock() = Some(Box::new(notifier))
	}
}

/// Proof of holding a [`Session`]'s Update Lock. Released on drop.
pub struct UpdateLock<'a> {
	session: &'a Session,
	guard: ReentrantMutexGuard<'a, RefCell<SessionState>>,
}

impl Debug for UpdateLock<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("UpdateLock").field("session", &self.session.id).finish_non_exhaustive()
	}
}

impl UpdateLock<'_> {
	/// Borrows the session state.
	///
	/// # Errors
	///
	/// [`Error::StateBorrowed`] if it is already borrowed further up this thread's stack.
	pub fn state(&self) -> Result<RefMut<'_, SessionState>, Error> {
		self.guard.try_borrow_mut().map_err(|_| Error::StateBorrowed)
	}

	/// Runs one render cycle over all changes made so far.
	///
	/// # Errors
	///
	/// Any error means the session's tree can't be trusted anymore and the session should be torn down.
	pub fn render(&self, mode: RenderMode) -> Result<Program, Error> {
		struct Rendering<'a>(&'a AtomicBool);
		impl Drop for Rendering<'_> {
			fn drop(&mut self) {
				self.0.store(false, Ordering::Release)
			}
		}

		let mut state = self.state()?;
		self.session.rendering.store(true, Ordering::Release);
		let _rendering = Rendering(&self.session.rendering);
		self.session.update_requested.store(false, Ordering::Release);

		let state = &mut *state;
		render::render(&state.config, &mut state.tree, &mut state.signals, &mut state.mirror, &mut state.renderer, mode)
	}
}

impl Drop for UpdateLock<'_> {
	fn drop(&mut self) {
		HELD.with(|held| {
			let mut held = held.borrow_mut();
			if let Some(position) = held.iter().rposition(|&id| id == self.session.id) {
				held.remove(position);
			}
		});
	}
}

/// Everything one render cycle operates on.
#[derive(Debug)]
pub struct SessionState {
	config: Config,
	tree: Tree,
	signals: SignalTable,
	mirror: MirrorStore,
	renderer: Renderer,
}

impl SessionState {
	fn new(id: SessionId, config: Config) -> Self {
		Self {
			tree: Tree::new(config.id_prefix.clone()),
			signals: SignalTable::new(),
			mirror: MirrorStore::new(id),
			renderer: Renderer::new(&config),
			config,
		}
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	#[must_use]
	pub fn tree(&self) -> &Tree {
		&self.tree
	}

	/// Access to the tree's setters.
	pub fn tree_mut(&mut self) -> &mut Tree {
		&mut self.tree
	}

	#[must_use]
	pub fn signals(&self) -> &SignalTable {
		&self.signals
	}

	#[must_use]
	pub fn mirror(&self) -> &MirrorStore {
		&self.mirror
	}

	pub fn mirror_mut(&mut self) -> &mut MirrorStore {
		&mut self.mirror
	}

	pub fn create(&mut self, widget: impl Widget + 'static) -> NodeId {
		self.tree.create(widget)
	}

	pub fn add_root(&mut self, id: NodeId) -> Result<(), Error> {
		self.tree.add_root(id)?;
		let subtree = self.tree.subtree(id);
		self.signals.restore(&self.tree, &subtree);
		Ok(())
	}

	/// Inserts `child` below `parent` at `index`, or last.
	pub fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> Result<(), Error> {
		self.tree.attach(parent, child, index)?;
		if self.tree.is_attached(child) {
			let subtree = self.tree.subtree(child);
			self.signals.restore(&self.tree, &subtree);
		}
		Ok(())
	}

	/// Unlinks `id` from its parent or the root list. The subtree is kept and can be attached again.
	pub fn detach(&mut self, id: NodeId) -> Result<(), Error> {
		let subtree = self.tree.subtree(id);
		self.signals.suspend(&self.tree, &subtree);
		self.tree.detach(id)
	}

	/// Removes `id` and its descendants for good, along with their signals and mirrored values.
	pub fn destroy(&mut self, id: NodeId) -> Result<(), Error> {
		let removed = self.tree.destroy(id)?;
		self.signals.remove_nodes(&removed);
		let ids: Vec<_> = removed.iter().map(|node| node.id).collect();
		self.mirror.remove_owned(&ids);
		Ok(())
	}

	/// Assigns an explicit client id, moving the node's signal keys along.
	pub fn set_dom_id(&mut self, id: NodeId, dom_id: impl Into<String>) -> Result<(), Error> {
		let previous = self.tree.set_dom_id(id, dom_id.into())?;
		let node = self.tree.get(id)?;
		if node.dom_id != previous {
			self.signals.rekey(node, &previous);
		}
		Ok(())
	}

	/// Returns the encoded key of `event` on `id` and its callback handle.
	pub fn expose(&mut self, id: NodeId, event: &str) -> Result<(String, CallbackHandle), Error> {
		self.signals.expose(&mut self.tree, id, event)
	}

	/// Returns whether `key` was exposed.
	pub fn unexpose(&mut self, key: &str) -> Result<bool, Error> {
		self.signals.unexpose(&mut self.tree, key)
	}

	pub fn resolve(&self, key: &str) -> Result<CallbackHandle, ResolveError> {
		self.signals.resolve(key)
	}

	fn check_owner(&self, owner: NodeId) -> Result<(), Error> {
		if self.tree.get(owner)?.status.get(StatusFlag::BeingDeleted) {
			return Err(self.tree.fail(Error::BeingDeleted(owner), owner));
		}
		Ok(())
	}

	/// Registers a mirrored matrix that lives as long as `owner`.
	pub fn register_matrix(&mut self, owner: NodeId, matrix: Matrix4<f32>) -> Result<Mirror, Error> {
		self.check_owner(owner)?;
		Ok(self.mirror.register(owner, Value::Matrix(matrix)))
	}

	/// Registers a mirrored vector that lives as long as `owner`.
	pub fn register_vector(&mut self, owner: NodeId, vector: Vec<f32>) -> Result<Mirror, Error> {
		self.check_owner(owner)?;
		Ok(self.mirror.register(owner, Value::Vector(vector)))
	}

	pub fn apply_reverse_sync(&mut self, payload: &str) -> SyncReport {
		self.mirror.apply_reverse_sync(payload)
	}
}
