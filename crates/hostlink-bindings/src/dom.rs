//! In-process browser host.
//!
//! [`DomHost`] keeps a small object graph shaped like a fresh browser page:
//!
//! ```text
//! window ─┬─ document ── <html> ─┬─ <head>
//!         │                      └─ <body>
//!         └─ console
//! ```
//!
//! It answers the four [`Host`] operations with browser semantics where they
//! matter to callers (appending moves a node, setting `innerText` replaces the
//! children, reading a method yields a function object) and with typed errors
//! where a browser would hand back `undefined`.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use hostlink_common::HostError;

use crate::{Host, HostHandle, HostValue};

const WINDOW: HostHandle = HostHandle::from_raw(0);
const DOCUMENT: HostHandle = HostHandle::from_raw(1);
const HTML: HostHandle = HostHandle::from_raw(2);
const HEAD: HostHandle = HostHandle::from_raw(3);
const BODY: HostHandle = HostHandle::from_raw(4);
const CONSOLE: HostHandle = HostHandle::from_raw(5);

const WINDOW_METHODS: &[&str] = &[];
const DOCUMENT_METHODS: &[&str] = &["createElement", "getElementById"];
const ELEMENT_METHODS: &[&str] = &[
    "appendChild",
    "removeChild",
    "setAttribute",
    "getAttribute",
];
const CONSOLE_METHODS: &[&str] = &["log"];
const FUNCTION_METHODS: &[&str] = &["call"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum ObjectKind {
    Window,
    Document,
    Console,
    Element { tag: String },
    /// A method read as a property. Shared by every object exposing it.
    Function { name: &'static str },
}

impl ObjectKind {
    fn methods(&self) -> &'static [&'static str] {
        match self {
            Self::Window => WINDOW_METHODS,
            Self::Document => DOCUMENT_METHODS,
            Self::Console => CONSOLE_METHODS,
            Self::Element { .. } => ELEMENT_METHODS,
            Self::Function { .. } => FUNCTION_METHODS,
        }
    }
}

#[derive(Debug)]
struct HostObject {
    kind: ObjectKind,
    props: BTreeMap<String, HostValue>,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<HostHandle>,
    parent: Option<HostHandle>,
}

impl HostObject {
    fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            props: BTreeMap::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    fn element(tag: &str) -> Self {
        Self::new(ObjectKind::Element {
            tag: tag.to_ascii_lowercase(),
        })
    }

    fn tag(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::Element { tag } => Some(tag),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct ObjectTable {
    objects: Vec<HostObject>,
    functions: BTreeMap<&'static str, HostHandle>,
    console: Vec<String>,
}

impl ObjectTable {
    fn new() -> Self {
        let mut table = Self {
            objects: vec![
                HostObject::new(ObjectKind::Window),
                HostObject::new(ObjectKind::Document),
                HostObject::element("html"),
                HostObject::element("head"),
                HostObject::element("body"),
                HostObject::new(ObjectKind::Console),
            ],
            functions: BTreeMap::new(),
            console: Vec::new(),
        };
        table.objects[DOCUMENT.raw() as usize]
            .props
            .insert("title".into(), HostValue::from(""));
        table.attach(HTML, HEAD);
        table.attach(HTML, BODY);
        table
    }

    fn object(&self, handle: HostHandle) -> Result<&HostObject, HostError> {
        self.objects
            .get(handle.raw() as usize)
            .ok_or(HostError::InvalidHandle {
                handle: handle.raw(),
            })
    }

    fn object_mut(&mut self, handle: HostHandle) -> Result<&mut HostObject, HostError> {
        self.objects
            .get_mut(handle.raw() as usize)
            .ok_or(HostError::InvalidHandle {
                handle: handle.raw(),
            })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn create(&mut self, object: HostObject) -> HostHandle {
        let handle = HostHandle::from_raw(self.objects.len() as u32);
        self.objects.push(object);
        handle
    }

    /// Function object for a method, created on first read.
    fn function(&mut self, name: &'static str) -> HostHandle {
        if let Some(handle) = self.functions.get(name) {
            return *handle;
        }
        let handle = self.create(HostObject::new(ObjectKind::Function { name }));
        self.functions.insert(name, handle);
        handle
    }

    /// `head` and `body` as the document reports them: `null` once moved
    /// out of `<html>`.
    fn root_child(&self, handle: HostHandle) -> HostValue {
        if self.objects[handle.raw() as usize].parent == Some(HTML) {
            HostValue::Object(handle)
        } else {
            HostValue::Null
        }
    }

    fn title(&self) -> String {
        self.objects[DOCUMENT.raw() as usize]
            .props
            .get("title")
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Append without validation; used while building the initial page.
    fn attach(&mut self, parent: HostHandle, child: HostHandle) {
        self.objects[child.raw() as usize].parent = Some(parent);
        self.objects[parent.raw() as usize].children.push(child);
    }

    fn detach(&mut self, child: HostHandle) {
        let Some(parent) = self.objects[child.raw() as usize].parent.take() else {
            return;
        };
        self.objects[parent.raw() as usize]
            .children
            .retain(|c| *c != child);
    }

    fn is_inclusive_ancestor(&self, ancestor: HostHandle, node: HostHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.objects[handle.raw() as usize].parent;
        }
        false
    }

    fn text_content(&self, handle: HostHandle) -> String {
        let object = &self.objects[handle.raw() as usize];
        let mut text = object.text.clone();
        for child in &object.children {
            text.push_str(&self.text_content(*child));
        }
        text
    }

    fn find_by_id(&self, root: HostHandle, id: &str) -> Option<HostHandle> {
        let object = &self.objects[root.raw() as usize];
        if object.attributes.get("id").is_some_and(|v| v == id) {
            return Some(root);
        }
        object
            .children
            .iter()
            .find_map(|child| self.find_by_id(*child, id))
    }

    fn require_element(&self, value: &HostValue, what: &str) -> Result<HostHandle, HostError> {
        let handle = value.as_handle()?;
        match self.object(handle)?.kind {
            ObjectKind::Element { .. } => Ok(handle),
            _ => Err(HostError::invalid_argument(format!(
                "{what}: expected an element"
            ))),
        }
    }

    fn get(&mut self, target: HostHandle, name: &str) -> Result<HostValue, HostError> {
        if let Some(value) = self.lookup(target, name)? {
            return Ok(value);
        }

        let method = self
            .object(target)?
            .kind
            .methods()
            .iter()
            .copied()
            .find(|m| *m == name);
        match method {
            Some(method) => Ok(HostValue::Object(self.function(method))),
            None => Err(HostError::member_not_found(name)),
        }
    }

    /// Computed members and plain properties.
    #[allow(clippy::cast_precision_loss)]
    fn lookup(&self, target: HostHandle, name: &str) -> Result<Option<HostValue>, HostError> {
        let object = self.object(target)?;

        let computed = match (&object.kind, name) {
            (ObjectKind::Window, "window" | "self") => Some(HostValue::Object(WINDOW)),
            (ObjectKind::Window, "document") => Some(HostValue::Object(DOCUMENT)),
            (ObjectKind::Window, "console") => Some(HostValue::Object(CONSOLE)),
            (ObjectKind::Document, "documentElement") => Some(HostValue::Object(HTML)),
            (ObjectKind::Document, "head") => Some(self.root_child(HEAD)),
            (ObjectKind::Document, "body") => Some(self.root_child(BODY)),
            (ObjectKind::Element { tag }, "tagName" | "nodeName") => {
                Some(HostValue::String(tag.to_ascii_uppercase()))
            }
            (ObjectKind::Element { .. }, "innerText" | "textContent") => {
                Some(HostValue::String(self.text_content(target)))
            }
            (ObjectKind::Element { .. }, "childElementCount") => {
                Some(HostValue::Number(object.children.len() as f64))
            }
            (ObjectKind::Element { .. }, "parentNode" | "parentElement") => {
                Some(object.parent.map_or(HostValue::Null, HostValue::Object))
            }
            (ObjectKind::Element { .. }, "id") => Some(HostValue::String(
                object.attributes.get("id").cloned().unwrap_or_default(),
            )),
            (ObjectKind::Function { name }, "name") => Some(HostValue::from(*name)),
            _ => None,
        };

        Ok(computed.or_else(|| object.props.get(name).cloned()))
    }

    fn set(&mut self, target: HostHandle, name: &str, value: HostValue) -> Result<(), HostError> {
        if let HostValue::Object(handle) = &value {
            self.object(*handle)?;
        }

        let kind = self.object(target)?.kind.clone();
        match (&kind, name) {
            (ObjectKind::Window, "window" | "self" | "document" | "console")
            | (ObjectKind::Document, "documentElement" | "head" | "body")
            | (
                ObjectKind::Element { .. },
                "tagName" | "nodeName" | "childElementCount" | "parentNode" | "parentElement",
            )
            | (ObjectKind::Function { .. }, "name") => Err(HostError::invalid_argument(format!(
                "{name} is read-only"
            ))),
            (ObjectKind::Document, "title") => {
                self.object_mut(target)?
                    .props
                    .insert("title".into(), HostValue::String(value.to_string()));
                Ok(())
            }
            (ObjectKind::Element { .. }, "innerText" | "textContent") => {
                let children = std::mem::take(&mut self.object_mut(target)?.children);
                for child in children {
                    self.objects[child.raw() as usize].parent = None;
                }
                self.object_mut(target)?.text = value.to_string();
                Ok(())
            }
            (ObjectKind::Element { .. }, "id") => {
                self.object_mut(target)?
                    .attributes
                    .insert("id".into(), value.to_string());
                Ok(())
            }
            _ if kind.methods().contains(&name) => Err(HostError::invalid_argument(format!(
                "{name} is a method"
            ))),
            _ => {
                self.object_mut(target)?.props.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    fn call(
        &mut self,
        target: HostHandle,
        name: &str,
        args: &[HostValue],
    ) -> Result<HostValue, HostError> {
        let kind = self.object(target)?.kind.clone();

        if !kind.methods().contains(&name) {
            return match self.get(target, name) {
                Ok(_) => Err(HostError::not_callable(name)),
                Err(e) => Err(e),
            };
        }

        // fn.call(this, ...args)
        if let ObjectKind::Function { name: method } = kind {
            let this = arg(args, 0, name)?.as_handle()?;
            return self.call(this, method, &args[1..]);
        }

        match name {
            "createElement" => {
                let tag = arg(args, 0, name)?.clone().into_string(name)?;
                if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                    return Err(HostError::invalid_argument(format!(
                        "invalid tag name '{tag}'"
                    )));
                }
                let handle = self.create(HostObject::element(&tag));
                debug!(tag = %tag, handle = %handle, "Element created");
                Ok(HostValue::Object(handle))
            }
            "getElementById" => {
                let id = arg(args, 0, name)?.to_string();
                Ok(self
                    .find_by_id(HTML, &id)
                    .map_or(HostValue::Null, HostValue::Object))
            }
            "appendChild" => {
                let child = self.require_element(arg(args, 0, name)?, name)?;
                if self.is_inclusive_ancestor(child, target) {
                    return Err(HostError::invalid_argument(
                        "appendChild: the new child is an ancestor of the parent",
                    ));
                }
                self.detach(child);
                self.attach(target, child);
                debug!(parent = %target, child = %child, "Child appended");
                Ok(HostValue::Object(child))
            }
            "removeChild" => {
                let child = self.require_element(arg(args, 0, name)?, name)?;
                if self.objects[child.raw() as usize].parent != Some(target) {
                    return Err(HostError::invalid_argument(
                        "removeChild: the node is not a child of this element",
                    ));
                }
                self.detach(child);
                Ok(HostValue::Object(child))
            }
            "setAttribute" => {
                let attr = arg(args, 0, name)?.to_string();
                let value = arg(args, 1, name)?.to_string();
                self.object_mut(target)?.attributes.insert(attr, value);
                Ok(HostValue::Undefined)
            }
            "getAttribute" => {
                let attr = arg(args, 0, name)?.to_string();
                Ok(self
                    .object(target)?
                    .attributes
                    .get(&attr)
                    .cloned()
                    .map_or(HostValue::Null, HostValue::String))
            }
            "log" => {
                let line = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                info!(guest_console = true, "{}", line);
                self.console.push(line);
                Ok(HostValue::Undefined)
            }
            _ => Err(HostError::member_not_found(name)),
        }
    }

    fn render_node(&self, handle: HostHandle, title: &str, out: &mut String) {
        let object = &self.objects[handle.raw() as usize];
        let tag = object.tag().unwrap_or_default();
        out.push('<');
        out.push_str(tag);
        for (name, value) in &object.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(out, value);
            out.push('"');
        }
        out.push('>');
        if handle == HEAD {
            out.push_str("<title>");
            escape_into(out, title);
            out.push_str("</title>");
        }
        escape_into(out, &object.text);
        for child in &object.children {
            self.render_node(*child, title, out);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    fn snapshot_node(&self, handle: HostHandle) -> NodeSnapshot {
        let object = &self.objects[handle.raw() as usize];
        NodeSnapshot {
            tag: object.tag().unwrap_or_default().to_string(),
            attributes: object.attributes.clone(),
            text: object.text.clone(),
            children: object
                .children
                .iter()
                .map(|c| self.snapshot_node(*c))
                .collect(),
        }
    }
}

fn arg<'a>(args: &'a [HostValue], index: usize, method: &str) -> Result<&'a HostValue, HostError> {
    args.get(index).ok_or_else(|| {
        HostError::invalid_argument(format!("{method}: missing argument {}", index + 1))
    })
}

/// In-process implementation of [`Host`] modelling a browser page.
///
/// Interior mutability lets facades share one `&DomHost`. The host is
/// `Send` but not `Sync`: one program run owns it.
#[derive(Debug)]
pub struct DomHost {
    table: RefCell<ObjectTable>,
}

impl Default for DomHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DomHost {
    /// Create a host holding an empty page.
    pub fn new() -> Self {
        Self {
            table: RefCell::new(ObjectTable::new()),
        }
    }

    pub fn window(&self) -> HostHandle {
        WINDOW
    }

    pub fn document(&self) -> HostHandle {
        DOCUMENT
    }

    /// The `<body>` element the page was created with, attached or not.
    pub fn body(&self) -> HostHandle {
        BODY
    }

    /// Current document title.
    pub fn title(&self) -> String {
        self.table.borrow().title()
    }

    /// Children of `parent`, in document order.
    pub fn children(&self, parent: HostHandle) -> Result<Vec<HostHandle>, HostError> {
        Ok(self.table.borrow().object(parent)?.children.clone())
    }

    /// Lines written through `console.log`.
    pub fn console_lines(&self) -> Vec<String> {
        self.table.borrow().console.clone()
    }

    /// Number of objects the host has issued handles for.
    pub fn object_count(&self) -> usize {
        self.table.borrow().objects.len()
    }

    /// Serialisable view of the page.
    pub fn snapshot(&self) -> DomSnapshot {
        let table = self.table.borrow();
        DomSnapshot {
            title: table.title(),
            body: table
                .root_child(BODY)
                .as_handle()
                .ok()
                .map(|body| table.snapshot_node(body)),
            console: table.console.clone(),
        }
    }

    /// Render the document tree as HTML.
    pub fn render_html(&self) -> String {
        let table = self.table.borrow();
        let mut html = String::new();
        table.render_node(HTML, &table.title(), &mut html);
        html
    }
}

impl Host for DomHost {
    fn global(&self) -> HostHandle {
        WINDOW
    }

    fn get(&self, target: HostHandle, name: &str) -> Result<HostValue, HostError> {
        self.table.borrow_mut().get(target, name)
    }

    fn set(&self, target: HostHandle, name: &str, value: HostValue) -> Result<(), HostError> {
        self.table.borrow_mut().set(target, name, value)
    }

    fn call(
        &self,
        target: HostHandle,
        name: &str,
        args: &[HostValue],
    ) -> Result<HostValue, HostError> {
        self.table.borrow_mut().call(target, name, args)
    }
}

/// Serialisable view of a [`DomHost`] page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomSnapshot {
    pub title: String,
    /// `document.body`; absent once the body is moved out of `<html>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<NodeSnapshot>,
    pub console: Vec<String>,
}

/// One element in a [`DomSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub tag: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
