//! Error taxonomy.
//!
//! [`Error`] covers invariant violations and precondition failures. These indicate a caller bug and leave the
//! affected [`Session`](`crate::session::Session`) in a state that shouldn't be trusted further.
//!
//! Expected races ([`ResolveError`]) and malformed client input ([`SyncRejection`](`crate::mirror::SyncRejection`))
//! are contained by the component that detects them and never escape as [`Error`].

use crate::{
	lifecycle::RenderState,
	mirror::MirrorId,
	node::NodeId,
	session::SessionId,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("node {0} does not exist (anymore)")]
	UnknownNode(NodeId),

	#[error("node {0} is not reachable from a root")]
	Detached(NodeId),

	#[error("node {0} is being deleted")]
	BeingDeleted(NodeId),

	#[error("node {child} already has parent {parent}")]
	AlreadyParented { child: NodeId, parent: NodeId },

	#[error("node {0} is a root")]
	Root(NodeId),

	#[error("attaching {child} below {parent} would create a cycle")]
	Cycle { parent: NodeId, child: NodeId },

	#[error("node {node} can't go from {from:?} to {to:?}")]
	InvalidTransition { node: NodeId, from: RenderState, to: RenderState },

	#[error("node {0} already has a client representation")]
	Rendered(NodeId),

	#[error("client id {0:?} is already in use")]
	DuplicateDomId(String),

	#[error("depth limit reached at node {0}")]
	DepthLimit(NodeId),

	#[error("mirrored value {0} does not exist")]
	UnknownMirror(MirrorId),

	#[error("mirrored value {0} is derived and can't be set")]
	DerivedMirror(MirrorId),

	#[error("mirrored value {0} is not a matrix")]
	NotAMatrix(MirrorId),

	#[error("mirrored value {0} has a singular matrix in its operation log")]
	SingularMatrix(MirrorId),

	#[error("mirrored value {id} has {expected} components, got {found}")]
	LengthMismatch { id: MirrorId, expected: usize, found: usize },

	#[error("handle belongs to session {found}, not {expected}")]
	ForeignSession { expected: SessionId, found: SessionId },

	#[error("this thread already holds the update lock of session {held}, can't lock session {requested}")]
	ForeignSessionLock { held: SessionId, requested: SessionId },

	#[error("the update lock can't be taken while a render cycle is running")]
	LockDuringRender,

	#[error("session state is already borrowed further up this thread's stack")]
	StateBorrowed,
}

/// Why an inbound signal key didn't resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
	/// The key was never exposed, or was removed more than a cycle ago.
	#[error("signal key not exposed")]
	Unknown,

	/// The key was valid until very recently. Typically a double-fired control that removed itself.
	#[error("signal key was removed recently")]
	JustRemoved,
}
