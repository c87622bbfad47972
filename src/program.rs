//! The Update-Program: an ordered list of client-visible operations produced by one render cycle.
//!
//! Programs are plain data. [`Program::to_javascript`] renders one into statements for a client runtime object
//! (see [`Config::client_namespace`](`crate::config::Config::client_namespace`)), which is also how its byte size is
//! measured for two-phase delivery.

use crate::node::ElementKind;
use core::fmt::Write as _;

/// A client-side property written through the DOM API (as opposed to a plain attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
	Class,
	Style,
	InnerHtml,
	Disabled,
	StyleDisplay,
	StylePosition,
	StyleZIndex,
	StyleClear,
	StyleMinWidth,
	StyleMinHeight,
	StyleMaxWidth,
	StyleMaxHeight,
	StyleTop,
	StyleRight,
	StyleBottom,
	StyleLeft,
	StyleVerticalAlign,
	StyleLineHeight,
	StyleWidth,
	StyleHeight,
	StyleFloat,
	StyleMarginTop,
	StyleMarginRight,
	StyleMarginBottom,
	StyleMarginLeft,
	StyleVisibility,
}

impl Property {
	/// Member path relative to the element, e.g. `style.zIndex`.
	#[must_use]
	pub fn js_member(self) -> &'static str {
		match self {
			Property::Class => "className",
			Property::Style => "style.cssText",
			Property::InnerHtml => "innerHTML",
			Property::Disabled => "disabled",
			Property::StyleDisplay => "style.display",
			Property::StylePosition => "style.position",
			Property::StyleZIndex => "style.zIndex",
			Property::StyleClear => "style.clear",
			Property::StyleMinWidth => "style.minWidth",
			Property::StyleMinHeight => "style.minHeight",
			Property::StyleMaxWidth => "style.maxWidth",
			Property::StyleMaxHeight => "style.maxHeight",
			Property::StyleTop => "style.top",
			Property::StyleRight => "style.right",
			Property::StyleBottom => "style.bottom",
			Property::StyleLeft => "style.left",
			Property::StyleVerticalAlign => "style.verticalAlign",
			Property::StyleLineHeight => "style.lineHeight",
			Property::StyleWidth => "style.width",
			Property::StyleHeight => "style.height",
			Property::StyleFloat => "style.cssFloat",
			Property::StyleMarginTop => "style.marginTop",
			Property::StyleMarginRight => "style.marginRight",
			Property::StyleMarginBottom => "style.marginBottom",
			Property::StyleMarginLeft => "style.marginLeft",
			Property::StyleVisibility => "style.visibility",
		}
	}
}

/// Everything written to one client element, either on creation or as an update.
///
/// Properties and attributes are merged last-writer-wins, keeping the position of their first write.
/// That way two aspects touching the same underlying property never produce conflicting operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
	pub id: String,
	pub kind: ElementKind,
	pub stub: bool,
	pub properties: Vec<(Property, String)>,
	pub attributes: Vec<(String, String)>,
	pub added_classes: Vec<String>,
	pub removed_classes: Vec<String>,
	/// `(member name, JavaScript expression)`
	pub members: Vec<(String, String)>,
	/// `(event name, encoded signal key)`. An empty key unbinds.
	pub events: Vec<(String, String)>,
	/// Statements to run once the element exists client-side.
	pub scripts: Vec<String>,
	/// Only populated for creation.
	pub children: Vec<Element>,
}

impl Element {
	#[must_use]
	pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
		Self {
			id: id.into(),
			kind,
			stub: false,
			properties: Vec::new(),
			attributes: Vec::new(),
			added_classes: Vec::new(),
			removed_classes: Vec::new(),
			members: Vec::new(),
			events: Vec::new(),
			scripts: Vec::new(),
			children: Vec::new(),
		}
	}

	pub fn set_property(&mut self, property: Property, value: impl Into<String>) {
		let value = value.into();
		match self.properties.iter_mut().find(|(p, _)| *p == property) {
			Some((_, existing)) => *existing = value,
			None => self.properties.push((property, value)),
		}
	}

	#[must_use]
	pub fn property(&self, property: Property) -> Option<&str> {
		self.properties.iter().find(|(p, _)| *p == property).map(|(_, v)| v.as_str())
	}

	/// Adds a word to the [`Property::Class`] value unless it's already present.
	pub fn add_class(&mut self, word: &str) {
		if word.is_empty() {
			return;
		}
		let class = match self.property(Property::Class) {
			Some(class) if class.split_whitespace().any(|w| w == word) => return,
			Some(class) if !class.is_empty() => format!("{} {}", class, word),
			_ => word.to_owned(),
		};
		self.set_property(Property::Class, class)
	}

	pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let (name, value) = (name.into(), value.into());
		match self.attributes.iter_mut().find(|(n, _)| *n == name) {
			Some((_, existing)) => *existing = value,
			None => self.attributes.push((name, value)),
		}
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
	}

	pub fn set_event(&mut self, event: impl Into<String>, key: impl Into<String>) {
		let (event, key) = (event.into(), key.into());
		match self.events.iter_mut().find(|(e, _)| *e == event) {
			Some((_, existing)) => *existing = key,
			None => self.events.push((event, key)),
		}
	}

	pub fn set_member(&mut self, name: impl Into<String>, expression: impl Into<String>) {
		let (name, expression) = (name.into(), expression.into());
		match self.members.iter_mut().find(|(n, _)| *n == name) {
			Some((_, existing)) => *existing = expression,
			None => self.members.push((name, expression)),
		}
	}

	pub fn call_javascript(&mut self, statement: impl Into<String>) {
		self.scripts.push(statement.into())
	}

	/// Whether applying this as an update would be a no-op.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.properties.is_empty()
			&& self.attributes.is_empty()
			&& self.added_classes.is_empty()
			&& self.removed_classes.is_empty()
			&& self.members.is_empty()
			&& self.events.is_empty()
			&& self.scripts.is_empty()
			&& self.children.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
	/// Insert a new element subtree. `parent: None` places a root.
	Create { parent: Option<String>, index: usize, element: Element },
	/// Apply changes to an existing element.
	Update(Element),
	/// Atomically replace the stub with the same id by a full element subtree.
	Unstub(Element),
	/// Remove an element together with everything below it.
	Remove { id: String },
	/// Remove all children of an element.
	RemoveChildren { id: String },
	Script(String),
	/// The ordered list of client ids whose values are posted back with each event.
	SetFormObjects(Vec<String>),
}

/// The result of one render cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
	pub operations: Vec<Operation>,
	/// `false` if a pre-learning pass touched stubbed content and has to be repeated.
	pub learning_complete: bool,
	/// Invisible content was deferred; the client should request a [`RenderMode::LoadInvisible`](`crate::render::RenderMode::LoadInvisible`) pass.
	pub fetch_invisible: bool,
}

impl Default for Program {
	fn default() -> Self {
		Self::new()
	}
}

impl Program {
	#[must_use]
	pub fn new() -> Self {
		Self {
			operations: Vec::new(),
			learning_complete: true,
			fetch_invisible: false,
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.operations.is_empty() && !self.fetch_invisible
	}

	pub fn push(&mut self, operation: Operation) {
		self.operations.push(operation)
	}

	/// Renders this program into JavaScript statements addressed to the client runtime object `namespace`.
	#[must_use]
	pub fn to_javascript(&self, namespace: &str) -> String {
		let mut out = String::new();
		let mut var = 0;
		for operation in &self.operations {
			match operation {
				Operation::Create { parent, index, element } => {
					let e = render_new(&mut out, element, &mut var, namespace);
					match parent {
						Some(parent) => {
							let _ = write!(out, "{}.insertAt({},{},{});", namespace, js_string_literal(parent), e, index);
						}
						None => {
							let _ = write!(out, "document.body.appendChild({});", e);
						}
					}
					render_scripts(&mut out, element);
				}
				Operation::Update(element) => {
					let e = next_var(&mut var);
					let _ = write!(out, "var {}={}.$({});", e, namespace, js_string_literal(&element.id));
					render_members(&mut out, &e, element, namespace);
					for child in &element.children {
						let c = render_new(&mut out, child, &mut var, namespace);
						let _ = write!(out, "{}.appendChild({});", e, c);
					}
					render_scripts(&mut out, element);
				}
				Operation::Unstub(element) => {
					let e = render_new(&mut out, element, &mut var, namespace);
					let _ = write!(out, "{}.unstub({},{});", namespace, js_string_literal(&element.id), e);
					render_scripts(&mut out, element);
				}
				Operation::Remove { id } => {
					let _ = write!(out, "{}.remove({});", namespace, js_string_literal(id));
				}
				Operation::RemoveChildren { id } => {
					let _ = write!(out, "{}.$({}).innerHTML='';", namespace, js_string_literal(id));
				}
				Operation::Script(script) => out.push_str(script),
				Operation::SetFormObjects(ids) => {
					let ids: Vec<_> = ids.iter().map(|id| js_string_literal(id)).collect();
					let _ = write!(out, "{}.setFormObjects([{}]);", namespace, ids.join(","));
				}
			}
		}
		if self.fetch_invisible {
			let _ = write!(out, "{}.fetchInvisible();", namespace);
		}
		out
	}
}

fn next_var(var: &mut usize) -> String {
	let name = format!("e{}", var);
	*var += 1;
	name
}

/// Writes a statement sequence creating `element` and its children, returning the variable name holding it.
fn render_new(out: &mut String, element: &Element, var: &mut usize, namespace: &str) -> String {
	let e = next_var(var);
	let _ = write!(out, "var {}=document.createElement('{}');{}.id={};", e, element.kind.tag(), e, js_string_literal(&element.id));
	render_members(out, &e, element, namespace);
	for child in &element.children {
		let c = render_new(out, child, var, namespace);
		let _ = write!(out, "{}.appendChild({});", e, c);
	}
	e
}

fn render_members(out: &mut String, e: &str, element: &Element, namespace: &str) {
	for (property, value) in &element.properties {
		match property {
			Property::Disabled => {
				let _ = write!(out, "{}.disabled={};", e, value == "true");
			}
			_ => {
				let _ = write!(out, "{}.{}={};", e, property.js_member(), js_string_literal(value));
			}
		}
	}
	for (name, value) in &element.attributes {
		let _ = write!(out, "{}.setAttribute({},{});", e, js_string_literal(name), js_string_literal(value));
	}
	for class in &element.removed_classes {
		let _ = write!(out, "{}.classList.remove({});", e, js_string_literal(class));
	}
	for class in &element.added_classes {
		let _ = write!(out, "{}.classList.add({});", e, js_string_literal(class));
	}
	for (name, expression) in &element.members {
		let _ = write!(out, "{}.{}={};", e, name, expression);
	}
	for (event, key) in &element.events {
		if key.is_empty() {
			let _ = write!(out, "{}.on{}=null;", e, event);
		} else {
			let _ = write!(out, "{}.on{}=function(e){{{}.emit({},e);}};", e, event, namespace, js_string_literal(key));
		}
	}
}

fn render_scripts(out: &mut String, element: &Element) {
	for script in &element.scripts {
		out.push_str(script)
	}
	for child in &element.children {
		render_scripts(out, child)
	}
}

/// Quotes `value` as a single-quoted JavaScript string literal.
#[must_use]
pub fn js_string_literal(value: &str) -> String {
	let mut literal = String::with_capacity(value.len() + 2);
	literal.push('\'');
	let mut chars = value.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'\\' => literal.push_str("\\\\"),
			'\'' => literal.push_str("\\'"),
			'\n' => literal.push_str("\\n"),
			'\r' => literal.push_str("\\r"),
			'\t' => literal.push_str("\\t"),
			'\u{2028}' => literal.push_str("\\u2028"),
			'\u{2029}' => literal.push_str("\\u2029"),
			// Keep `</script>` from terminating an inline script block.
			'<' if chars.peek() == Some(&'/') => literal.push_str("<\\"),
			c => literal.push(c),
		}
	}
	literal.push('\'');
	literal
}
