//! Client-Mirrored Value Store.
//!
//! Small numeric values (4×4 matrices and vectors) that exist both here, authoritatively, and client-side, where
//! client code may change them without a round trip. The client posts its copies back in the [`sync`] wire format.
//!
//! A *base* value can be set from either side. A *derived* value is a pure function of one base value and an
//! operation log, and is recomputed from the base's current value whenever it is read.

mod matrix;
pub mod sync;

pub use matrix::Matrix4;

use crate::{
	error::Error,
	lifecycle::RenderState,
	node::NodeId,
	session::SessionId,
	tree::Tree,
};
use core::fmt::{self, Display, Formatter};
use hashbrown::HashMap;
use tracing::{instrument, trace, warn};

/// Small session-unique id of a mirrored value, assigned sequentially from `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MirrorId(pub(crate) u32);

impl MirrorId {
	#[must_use]
	pub fn get(self) -> u32 {
		self.0
	}
}

impl Display for MirrorId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A mirrored value as seen by application code. Only valid with the session it was created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mirror {
	id: MirrorId,
	session: SessionId,
}

impl Mirror {
	#[must_use]
	pub fn id(self) -> MirrorId {
		self.id
	}

	#[must_use]
	pub fn session(self) -> SessionId {
		self.session
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Matrix(Matrix4<f32>),
	Vector(Vec<f32>),
}

impl Value {
	/// Components in wire order (column-major for matrices).
	#[must_use]
	pub fn components(&self) -> Vec<f32> {
		match self {
			Value::Matrix(matrix) => matrix.to_column_major().to_vec(),
			Value::Vector(vector) => vector.clone(),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		match self {
			Value::Matrix(_) => 16,
			Value::Vector(vector) => vector.len(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Reads `components` (in wire order) as a value shaped like `self`.
	fn reshaped(&self, components: Vec<f32>) -> Option<Self> {
		match self {
			Value::Matrix(_) => Matrix4::from_column_major(&components).map(Value::Matrix),
			Value::Vector(vector) if vector.len() == components.len() => Some(Value::Vector(components)),
			Value::Vector(_) => None,
		}
	}
}

/// One step of a derived value's operation log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Derivation {
	Transpose,
	Invert,
	/// Multiply from the right by a constant.
	Multiply(Matrix4<f32>),
}

#[derive(Debug)]
enum Source {
	Base(Value),
	Derived { base: MirrorId, log: Vec<Derivation> },
}

#[derive(Debug)]
struct Entry {
	owner: NodeId,
	source: Source,
	/// The client copy has to be (re)initialised.
	needs_init: bool,
}

/// Why one reverse-sync record wasn't applied. Rejections never affect other records of the same payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncRejection {
	#[error("record {index} is malformed")]
	Malformed { index: usize, record: String },

	/// Possibly created after the client last rendered.
	#[error("mirrored value {0} is unknown")]
	Unknown(MirrorId),

	#[error("mirrored value {0} is derived")]
	Derived(MirrorId),

	#[error("mirrored value {id} has {expected} components, got {found}")]
	LengthMismatch { id: MirrorId, expected: usize, found: usize },
}

/// The outcome of [`MirrorStore::apply_reverse_sync`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
	pub applied: Vec<MirrorId>,
	pub rejected: Vec<SyncRejection>,
}

#[derive(Debug)]
pub struct MirrorStore {
	session: SessionId,
	entries: HashMap<MirrorId, Entry>,
	next_id: u32,
}

impl MirrorStore {
	#[must_use]
	pub fn new(session: SessionId) -> Self {
		Self {
			session,
			entries: HashMap::new(),
			next_id: 0,
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

	fn check(&self, mirror: Mirror) -> Result<&Entry, Error> {
		if mirror.session != self.session {
			return Err(Error::ForeignSession {
				expected: self.session,
				found: mirror.session,
			});
		}
		self.entries.get(&mirror.id).ok_or(Error::UnknownMirror(mirror.id))
	}

	fn insert(&mut self, owner: NodeId, source: Source) -> Mirror {
		let id = MirrorId(self.next_id);
		self.next_id += 1;
		self.entries.insert(
			id,
			Entry {
				owner,
				source,
				needs_init: true,
			},
		);
		trace!(%id, %owner, "Registered mirrored value.");
		Mirror { id, session: self.session }
	}

	/// Registers a base value whose client copy lives in the context of `owner`.
	///
	/// The value is removed along with `owner`.
	pub(crate) fn register(&mut self, owner: NodeId, value: Value) -> Mirror {
		self.insert(owner, Source::Base(value))
	}

	fn derive(&mut self, mirror: Mirror, derivation: Derivation) -> Result<Mirror, Error> {
		let entry = self.check(mirror)?;
		let (base, mut log) = match &entry.source {
			Source::Base(Value::Matrix(_)) => (mirror.id, Vec::new()),
			Source::Base(Value::Vector(_)) => return Err(Error::NotAMatrix(mirror.id)),
			Source::Derived { base, log } => (*base, log.clone()),
		};
		log.push(derivation);
		let owner = entry.owner;
		Ok(self.insert(owner, Source::Derived { base, log }))
	}

	pub fn derive_transposed(&mut self, mirror: Mirror) -> Result<Mirror, Error> {
		self.derive(mirror, Derivation::Transpose)
	}

	pub fn derive_inverted(&mut self, mirror: Mirror) -> Result<Mirror, Error> {
		self.derive(mirror, Derivation::Invert)
	}

	pub fn derive_multiplied(&mut self, mirror: Mirror, constant: Matrix4<f32>) -> Result<Mirror, Error> {
		self.derive(mirror, Derivation::Multiply(constant))
	}

	/// The operation log of a derived value, empty for base values.
	pub fn log(&self, mirror: Mirror) -> Result<&[Derivation], Error> {
		Ok(match &self.check(mirror)?.source {
			Source::Base(_) => &[][..],
			Source::Derived { log, .. } => log.as_slice(),
		})
	}

	/// The current value. For derived values, the log is replayed on the base's current value.
	pub fn value(&self, mirror: Mirror) -> Result<Value, Error> {
		match &self.check(mirror)?.source {
			Source::Base(value) => Ok(value.clone()),
			Source::Derived { base, log } => {
				let mut matrix = match self.entries.get(base).map(|entry| &entry.source) {
					Some(Source::Base(Value::Matrix(matrix))) => *matrix,
					Some(Source::Base(Value::Vector(_))) => return Err(Error::NotAMatrix(*base)),
					Some(Source::Derived { .. }) | None => return Err(Error::UnknownMirror(*base)),
				};
				for derivation in log {
					matrix = match derivation {
						Derivation::Transpose => matrix.transpose(),
						Derivation::Invert => matrix.inverse().ok_or(Error::SingularMatrix(mirror.id))?,
						Derivation::Multiply(constant) => matrix * *constant,
					}
				}
				Ok(Value::Matrix(matrix))
			}
		}
	}

	/// Overwrites a base value and marks it and its derived values for client-side re-initialisation.
	#[instrument(skip(self, value))]
	pub fn set(&mut self, mirror: Mirror, value: Value) -> Result<(), Error> {
		let current = match &self.check(mirror)?.source {
			Source::Base(current) => current,
			Source::Derived { .. } => return Err(Error::DerivedMirror(mirror.id)),
		};
		if core::mem::discriminant(current) != core::mem::discriminant(&value) || current.len() != value.len() {
			return Err(Error::LengthMismatch {
				id: mirror.id,
				expected: current.len(),
				found: value.len(),
			});
		}

		for (&id, entry) in &mut self.entries {
			match &mut entry.source {
				Source::Base(current) if id == mirror.id => {
					*current = value.clone();
					entry.needs_init = true;
				}
				Source::Derived { base, .. } if *base == mirror.id => entry.needs_init = true,
				_ => (),
			}
		}
		Ok(())
	}

	/// The client-side reference to `mirror`'s client copy.
	pub fn js_ref(&self, mirror: Mirror, namespace: &str) -> Result<String, Error> {
		self.check(mirror)?;
		Ok(js_ref(mirror.id, namespace))
	}

	/// All base values in the reverse-sync wire format, by id.
	#[must_use]
	pub fn wire_format(&self) -> String {
		let mut ids: Vec<_> = self.entries.keys().copied().collect();
		ids.sort_unstable();
		let mut out = String::new();
		for id in ids {
			if let Some(Entry { source: Source::Base(value), .. }) = self.entries.get(&id) {
				sync::format_record(id, &value.components(), &mut out)
			}
		}
		out
	}

	/// Applies client copies posted back by the client, overwriting base values verbatim.
	///
	/// Records for unknown or derived values and malformed records are skipped and reported; all others are still
	/// applied.
	#[instrument(skip(self, payload))]
	pub fn apply_reverse_sync(&mut self, payload: &str) -> SyncReport {
		let mut report = SyncReport::default();
		for record in sync::parse(payload) {
			let rejection = match record {
				Err(rejection) => rejection,
				Ok((id, components)) => match self.entries.get_mut(&id).map(|entry| &mut entry.source) {
					None => SyncRejection::Unknown(id),
					Some(Source::Derived { .. }) => SyncRejection::Derived(id),
					Some(Source::Base(value)) => {
						let found = components.len();
						match value.reshaped(components) {
							Some(reshaped) => {
								if cfg!(feature = "dangerous-logging") {
									trace!(%id, value = ?reshaped, "Applied reverse sync.");
								}
								*value = reshaped;
								report.applied.push(id);
								continue;
							}
							None => SyncRejection::LengthMismatch {
								id,
								expected: value.len(),
								found,
							},
						}
					}
				},
			};
			warn!("Rejected reverse sync record: {}", rejection);
			report.rejected.push(rejection)
		}
		report
	}

	/// Statements (re)initialising client copies, for values whose owner is materialized. Marks them as initialised.
	pub(crate) fn init_scripts(&mut self, tree: &Tree, namespace: &str) -> Vec<String> {
		let mut ids: Vec<_> = self
			.entries
			.iter()
			.filter(|(_, entry)| entry.needs_init && tree.node(entry.owner).map_or(false, |owner| owner.render_state == RenderState::Materialized))
			.map(|(&id, _)| id)
			.collect();
		ids.sort_unstable();

		let mut scripts = Vec::with_capacity(ids.len());
		for id in ids {
			let entry = match self.entries.get_mut(&id) {
				Some(entry) => entry,
				None => continue,
			};
			entry.needs_init = false;
			let mut script = format!("{}=", js_ref(id, namespace));
			match &entry.source {
				Source::Base(value) => float32_array(&value.components(), &mut script),
				Source::Derived { base, log } => {
					let mut expression = js_ref(*base, namespace);
					for derivation in log {
						expression = match derivation {
							Derivation::Transpose => format!("{0}.mat4.transpose({0}.mat4.create(),{1})", namespace, expression),
							Derivation::Invert => format!("{0}.mat4.invert({0}.mat4.create(),{1})", namespace, expression),
							Derivation::Multiply(constant) => {
								let mut constant_array = String::new();
								float32_array(&constant.to_column_major(), &mut constant_array);
								format!("{0}.mat4.multiply({0}.mat4.create(),{1},{2})", namespace, expression, constant_array)
							}
						}
					}
					script.push_str(&expression)
				}
			}
			script.push(';');
			scripts.push(script)
		}
		scripts
	}

	/// Removes all values owned by any of `owners`.
	pub(crate) fn remove_owned(&mut self, owners: &[NodeId]) {
		let before = self.entries.len();
		self.entries.retain(|_, entry| !owners.contains(&entry.owner));
		if before != self.entries.len() {
			trace!(count = before - self.entries.len(), "Removed mirrored values.");
		}
	}
}

fn js_ref(id: MirrorId, namespace: &str) -> String {
	format!("{}.jsValues[{}]", namespace, id)
}

fn float32_array(components: &[f32], out: &mut String) {
	out.push_str("new Float32Array([");
	for (i, &component) in components.iter().enumerate() {
		if i > 0 {
			out.push(',')
		}
		sync::format_float(component, out)
	}
	out.push_str("])");
}
