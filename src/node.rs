//! Node data: identity, per-aspect values and the [`Widget`] collaborator.

use crate::{
	flags::{Dirty, Status},
	lifecycle::{Removal, RenderState},
	program::{Element, Property},
	signals::CallbackHandle,
};
use core::fmt::{self, Debug, Display, Formatter};

/// Stable node identity within one [`Tree`](`crate::tree::Tree`). Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub(crate) u64);

impl NodeId {
	#[must_use]
	pub fn get(self) -> u64 {
		self.0
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
	Div,
	Span,
	Paragraph,
	Table,
	TableRow,
	TableCell,
	UnorderedList,
	ListItem,
	Button,
	Input,
	Select,
	TextArea,
	Label,
	Image,
	Anchor,
	Canvas,
	Form,
	IFrame,
}

impl ElementKind {
	#[must_use]
	pub fn tag(self) -> &'static str {
		match self {
			ElementKind::Div => "div",
			ElementKind::Span => "span",
			ElementKind::Paragraph => "p",
			ElementKind::Table => "table",
			ElementKind::TableRow => "tr",
			ElementKind::TableCell => "td",
			ElementKind::UnorderedList => "ul",
			ElementKind::ListItem => "li",
			ElementKind::Button => "button",
			ElementKind::Input => "input",
			ElementKind::Select => "select",
			ElementKind::TextArea => "textarea",
			ElementKind::Label => "label",
			ElementKind::Image => "img",
			ElementKind::Anchor => "a",
			ElementKind::Canvas => "canvas",
			ElementKind::Form => "form",
			ElementKind::IFrame => "iframe",
		}
	}

	#[must_use]
	pub fn is_default_inline(self) -> bool {
		matches!(
			self,
			ElementKind::Span
				| ElementKind::Button
				| ElementKind::Input
				| ElementKind::Select
				| ElementKind::TextArea
				| ElementKind::Label
				| ElementKind::Image
				| ElementKind::Anchor
				| ElementKind::Canvas
		)
	}
}

/// The widget catalog's side of a node.
///
/// The core only knows *that* something changed (via [`Flag::Content`](`crate::flags::Flag::Content`)).
/// What the content *is* comes from here.
pub trait Widget: Debug + Send {
	fn kind(&self) -> ElementKind;

	fn is_default_inline(&self) -> bool {
		self.kind().is_default_inline()
	}

	/// Writes widget-specific content into `element`.
	///
	/// `creating` is set when the element is new client-side, in which case defaults may be omitted.
	fn update_content(&self, element: &mut Element, creating: bool) {
		let _ = (element, creating);
	}

	/// A statement that removes this widget's client representation, if plain removal isn't enough.
	fn removal_script(&self, dom_id: &str) -> Option<String> {
		let _ = dom_id;
		None
	}
}

impl Widget for ElementKind {
	fn kind(&self) -> ElementKind {
		*self
	}
}

/// An element with HTML inner content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
	pub kind: ElementKind,
	pub html: String,
}

impl Text {
	#[must_use]
	pub fn new(kind: ElementKind, html: impl Into<String>) -> Self {
		Self { kind, html: html.into() }
	}
}

impl Widget for Text {
	fn kind(&self) -> ElementKind {
		self.kind
	}

	fn update_content(&self, element: &mut Element, creating: bool) {
		if !creating || !self.html.is_empty() {
			element.set_property(Property::InnerHtml, self.html.clone())
		}
	}
}

/// A CSS length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
	/// No explicit value; resets the client-side property.
	Unset,
	Auto,
	Px(f64),
	Percent(f64),
	Em(f64),
}

impl Default for Length {
	fn default() -> Self {
		Length::Unset
	}
}

impl Display for Length {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Length::Unset => Ok(()),
			Length::Auto => f.write_str("auto"),
			Length::Px(value) => write!(f, "{}px", value),
			Length::Percent(value) => write!(f, "{}%", value),
			Length::Em(value) => write!(f, "{}em", value),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionScheme {
	Static,
	Relative,
	Absolute,
	Fixed,
}

impl PositionScheme {
	#[must_use]
	pub fn css(self) -> &'static str {
		match self {
			PositionScheme::Static => "static",
			PositionScheme::Relative => "relative",
			PositionScheme::Absolute => "absolute",
			PositionScheme::Fixed => "fixed",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
	None,
	Left,
	Right,
	Both,
}

impl Side {
	#[must_use]
	pub fn css(self) -> &'static str {
		match self {
			Side::None => "none",
			Side::Left => "left",
			Side::Right => "right",
			Side::Both => "both",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
	Baseline,
	Sub,
	Super,
	Top,
	TextTop,
	Middle,
	Bottom,
	TextBottom,
}

impl VerticalAlign {
	#[must_use]
	pub fn css(self) -> &'static str {
		match self {
			VerticalAlign::Baseline => "baseline",
			VerticalAlign::Sub => "sub",
			VerticalAlign::Super => "super",
			VerticalAlign::Top => "top",
			VerticalAlign::TextTop => "text-top",
			VerticalAlign::Middle => "middle",
			VerticalAlign::Bottom => "bottom",
			VerticalAlign::TextBottom => "text-bottom",
		}
	}
}

/// Top, right, bottom, left.
pub type Edges = [Length; 4];

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
	pub position: PositionScheme,
	pub offsets: Edges,
	pub z_index: Option<i32>,
	pub float_side: Side,
	pub clear: Side,
	pub min_width: Length,
	pub min_height: Length,
	pub max_width: Length,
	pub max_height: Length,
	pub width: Length,
	pub height: Length,
	pub margins: Edges,
	pub vertical_align: VerticalAlign,
	pub line_height: Length,
}

impl Default for Layout {
	fn default() -> Self {
		Self {
			position: PositionScheme::Static,
			offsets: [Length::Unset; 4],
			z_index: None,
			float_side: Side::None,
			clear: Side::None,
			min_width: Length::Unset,
			min_height: Length::Unset,
			max_width: Length::Unset,
			max_height: Length::Unset,
			width: Length::Unset,
			height: Length::Unset,
			margins: [Length::Unset; 4],
			vertical_align: VerticalAlign::Baseline,
			line_height: Length::Unset,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Look {
	pub style_class: String,
	pub tool_tip: Option<String>,
}

/// Per-cycle data, dropped at the end of every pass that reaches the node.
#[derive(Debug, Default)]
pub(crate) struct Transient {
	/// The whole class string was replaced, which subsumes individual additions and removals.
	pub class_replaced: bool,
	pub added_classes: Vec<String>,
	pub removed_classes: Vec<String>,
	pub statements: Vec<String>,
	pub changed_attributes: Vec<String>,
	pub changed_js_members: Vec<String>,
	pub unbound_events: Vec<String>,
	pub added_children: Vec<NodeId>,
	pub removals: Vec<Removal>,
}

/// One entry of the server-held tree.
///
/// Nodes are owned by a [`Tree`](`crate::tree::Tree`) and only handed out by shared reference.
/// All mutation goes through the tree so that dirty bits are kept in sync.
#[derive(Debug)]
pub struct Node {
	pub(crate) id: NodeId,
	pub(crate) dom_id: String,
	pub(crate) parent: Option<NodeId>,
	pub(crate) children: Vec<NodeId>,
	pub(crate) widget: Box<dyn Widget>,
	pub(crate) layout: Layout,
	pub(crate) look: Look,
	pub(crate) tab_index: Option<i32>,
	pub(crate) attributes: Vec<(String, String)>,
	pub(crate) js_members: Vec<(String, String)>,
	/// Exposed signals, in exposure order. Kept across detachment so they can be re-exposed on attachment.
	pub(crate) events: Vec<(String, CallbackHandle)>,
	/// Statements submitted before the first materialization.
	pub(crate) delayed_js: Vec<String>,
	pub(crate) render_state: RenderState,
	pub(crate) dirty: Dirty,
	pub(crate) status: Status,
	pub(crate) transient: Transient,
}

impl Node {
	pub(crate) fn new(id: NodeId, dom_id: String, widget: Box<dyn Widget>) -> Self {
		let mut status = Status::empty();
		status.set_to(crate::flags::StatusFlag::Inline, widget.is_default_inline());
		Self {
			id,
			dom_id,
			parent: None,
			children: Vec::new(),
			widget,
			layout: Layout::default(),
			look: Look::default(),
			tab_index: None,
			attributes: Vec::new(),
			js_members: Vec::new(),
			events: Vec::new(),
			delayed_js: Vec::new(),
			render_state: RenderState::NotRendered,
			dirty: Dirty::all(),
			status,
			transient: Transient::default(),
		}
	}

	#[must_use]
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// The client-side element id.
	#[must_use]
	pub fn dom_id(&self) -> &str {
		&self.dom_id
	}

	#[must_use]
	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	#[must_use]
	pub fn children(&self) -> &[NodeId] {
		&self.children
	}

	#[must_use]
	pub fn widget(&self) -> &dyn Widget {
		&*self.widget
	}

	#[must_use]
	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	#[must_use]
	pub fn look(&self) -> &Look {
		&self.look
	}

	#[must_use]
	pub fn tab_index(&self) -> Option<i32> {
		self.tab_index
	}

	#[must_use]
	pub fn attributes(&self) -> &[(String, String)] {
		&self.attributes
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
	}

	#[must_use]
	pub fn js_members(&self) -> &[(String, String)] {
		&self.js_members
	}

	#[must_use]
	pub fn events(&self) -> &[(String, CallbackHandle)] {
		&self.events
	}

	#[must_use]
	pub fn render_state(&self) -> RenderState {
		self.render_state
	}

	#[must_use]
	pub fn dirty(&self) -> Dirty {
		self.dirty
	}

	#[must_use]
	pub fn status(&self) -> Status {
		self.status
	}

	#[must_use]
	pub fn is_inline(&self) -> bool {
		self.status.get(crate::flags::StatusFlag::Inline)
	}

	#[must_use]
	pub fn is_hidden(&self) -> bool {
		self.status.get(crate::flags::StatusFlag::Hidden)
	}
}
