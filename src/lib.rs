#![doc(html_root_url = "https://docs.rs/xylem/0.0.1")]
#![warn(clippy::pedantic)]

//! Incremental reconciliation of a server-held widget tree with its client-side representation.
//!
//! Mutations mark per-node dirty aspects. A render cycle turns everything marked since the previous cycle into a
//! minimal [`Program`](`program::Program`) for the client, stubbing hidden content for later delivery.
//!
//! Start at [`Session`](`session::Session`).

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod config;
pub mod emit;
pub mod error;
pub mod flags;
pub mod lifecycle;
pub mod mirror;
pub mod node;
pub mod program;
mod recent;
pub mod render;
pub mod session;
pub mod signals;
pub mod tree;

pub use config::Config;
pub use error::{Error, ResolveError};
pub use node::{ElementKind, NodeId, Widget};
pub use program::{Element, Operation, Program};
pub use render::RenderMode;
pub use session::{Session, SessionId, SessionState, UpdateLock};
