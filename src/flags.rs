//! Per-node dirty bits and status bits.
//!
//! Both are fixed-width bitfields over a closed enum, so testing, setting and clearing is O(1)
//! and "which aspect" is checked exhaustively wherever a `match` is used.

use core::fmt::{self, Debug, Formatter};

macro_rules! bit_set {
	(
		$(#[$set_attr:meta])*
		$set:ident($repr:ty) of
		$(#[$enum_attr:meta])*
		$enum:ident {
			$($(#[$variant_attr:meta])* $variant:ident),+$(,)?
		}
	) => {
		$(#[$enum_attr])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
		#[repr(u8)]
		pub enum $enum {
			$($(#[$variant_attr])* $variant),+
		}

		impl $enum {
			/// Every variant, in declaration order.
			pub const ALL: &'static [Self] = &[$(Self::$variant),+];

			#[must_use]
			pub const fn mask(self) -> $repr {
				1 << (self as u8)
			}
		}

		$(#[$set_attr])*
		#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
		pub struct $set($repr);

		impl $set {
			#[must_use]
			pub const fn empty() -> Self {
				Self(0)
			}

			#[must_use]
			pub const fn all() -> Self {
				Self($($enum::$variant.mask())|+)
			}

			#[must_use]
			pub const fn get(self, bit: $enum) -> bool {
				self.0 & bit.mask() != 0
			}

			pub fn set(&mut self, bit: $enum) {
				self.0 |= bit.mask();
			}

			pub fn set_to(&mut self, bit: $enum, value: bool) {
				if value {
					self.set(bit)
				} else {
					self.clear(bit)
				}
			}

			pub fn clear(&mut self, bit: $enum) {
				self.0 &= !bit.mask();
			}

			/// Clears `bit` and returns whether it was set.
			pub fn take(&mut self, bit: $enum) -> bool {
				let was_set = self.get(bit);
				self.clear(bit);
				was_set
			}

			pub fn clear_all(&mut self) {
				self.0 = 0;
			}

			#[must_use]
			pub const fn is_empty(self) -> bool {
				self.0 == 0
			}

			pub fn iter(self) -> impl Iterator<Item = $enum> {
				$enum::ALL.iter().copied().filter(move |bit| self.get(*bit))
			}
		}

		impl Debug for $set {
			fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
				f.debug_set().entries(self.iter()).finish()
			}
		}

		impl From<$enum> for $set {
			fn from(bit: $enum) -> Self {
				Self(bit.mask())
			}
		}

		impl core::iter::FromIterator<$enum> for $set {
			fn from_iter<I: IntoIterator<Item = $enum>>(iter: I) -> Self {
				let mut set = Self::empty();
				for bit in iter {
					set.set(bit)
				}
				set
			}
		}
	};
}

bit_set! {
	/// The dirty bits of one node. Every bit starts set on creation, so that the first render emits full state.
	Dirty(u32) of
	/// One orthogonal aspect of a node's client-visible state.
	///
	/// Declaration order is emission order; see [`emit`](`crate::emit`).
	Flag {
		/// Display mode, position scheme, clear sides, minimum/maximum sizes, vertical alignment and line height.
		Geometry,
		ZIndex,
		/// Top/right/bottom/left offsets.
		Offsets,
		Width,
		Height,
		FloatSide,
		Margins,
		StyleClass,
		ToolTip,
		TabIndex,
		Selectable,
		Disabled,
		/// Custom attributes.
		Attributes,
		/// Widget-specific content, as supplied by [`Widget::update_content`](`crate::node::Widget::update_content`).
		Content,
		/// Event bindings of exposed signals.
		Signals,
		/// Custom JavaScript members, member calls and queued statements.
		Script,
		/// Children were added (removals are queued separately).
		Children,
		/// Visibility.
		Hidden,
	}
}

bit_set! {
	/// Non-dirty per-node state.
	Status(u16) of
	StatusFlag {
		Hidden,
		Inline,
		Disabled,
		/// Hide via `visibility: hidden` instead of `display: none`.
		HideWithVisibility,
		/// Hide by moving off-screen; implies [`StatusFlag::HideWithVisibility`].
		HideWithOffsets,
		/// Never stub this node, i.e. the "load later when invisible" policy is off.
		DoNotStub,
		FormObject,
		BeingDeleted,
		Selectable,
		Unselectable,
	}
}
