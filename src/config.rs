//! Runtime configuration of a [`Session`](`crate::session::Session`).

/// Settings that shape emitted programs.
///
/// All setters consume and return `self`:
///
/// ```rust
/// use xylem::config::Config;
///
/// let config = Config::default().two_phase_threshold(0).id_prefix("w");
/// assert_eq!(config.id_prefix, "w");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Config {
	/// Byte size below which deferred invisible content is inlined into a first render.
	///
	/// `0` always defers.
	pub two_phase_threshold: usize,
	/// Whether the first render is visible-only, i.e. whether hidden nodes may be stubbed.
	pub defer_invisible: bool,
	/// Name of the client-side runtime object that receives structural calls.
	pub client_namespace: String,
	/// Prefix of generated client ids.
	pub id_prefix: String,
	/// Maximum tree depth emission will descend to.
	pub depth_limit: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			two_phase_threshold: 5000,
			defer_invisible: true,
			client_namespace: "Xylem".to_owned(),
			id_prefix: "x".to_owned(),
			depth_limit: 512,
		}
	}
}

impl Config {
	#[must_use]
	pub fn two_phase_threshold(mut self, bytes: usize) -> Self {
		self.two_phase_threshold = bytes;
		self
	}

	#[must_use]
	pub fn defer_invisible(mut self, defer_invisible: bool) -> Self {
		self.defer_invisible = defer_invisible;
		self
	}

	#[must_use]
	pub fn client_namespace(mut self, client_namespace: impl Into<String>) -> Self {
		self.client_namespace = client_namespace.into();
		self
	}

	#[must_use]
	pub fn id_prefix(mut self, id_prefix: impl Into<String>) -> Self {
		self.id_prefix = id_prefix.into();
		self
	}

	#[must_use]
	pub fn depth_limit(mut self, depth_limit: usize) -> Self {
		self.depth_limit = depth_limit;
		self
	}
}
