use hashbrown::HashSet;

/// A set whose entries expire after two [`rotate`](`RecentSet::rotate`) calls.
///
/// An entry inserted during one cycle survives that cycle's end and the whole next cycle, so that requests already in
/// flight when it was inserted can still see it.
#[derive(Debug, Default)]
pub(crate) struct RecentSet {
	current: HashSet<String>,
	previous: HashSet<String>,
}

impl RecentSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, key: String) {
		self.previous.remove(&key);
		self.current.insert(key);
	}

	pub fn remove(&mut self, key: &str) {
		self.current.remove(key);
		self.previous.remove(key);
	}

	pub fn contains(&self, key: &str) -> bool {
		self.current.contains(key) || self.previous.contains(key)
	}

	/// Drops the older generation.
	pub fn rotate(&mut self) {
		// Reuses the dropped generation's allocation.
		core::mem::swap(&mut self.current, &mut self.previous);
		self.current.clear();
	}

	/// Retrieves the sets' combined length.
	pub fn len(&self) -> usize {
		self.current.len() + self.previous.len()
	}
}
