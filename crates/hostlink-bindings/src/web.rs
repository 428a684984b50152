//! Typed facades over the host object graph.
//!
//! Each facade pairs a [`HostHandle`] with the borrowed [`Host`] capability
//! and exposes the members of one known object shape. Every accessor performs
//! exactly one `get` or `call`; the facades add no state and no invariants.
//!
//! ```ignore
//! let window = hostlink_bindings::web::window(&host);
//! let doc = window.document()?;
//! doc.set_title("Welcome page")?;
//! ```

use hostlink_common::HostError;

use crate::{Host, HostHandle, HostValue};

macro_rules! facade {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<'h, H: Host + ?Sized> {
            host: &'h H,
            handle: HostHandle,
        }

        impl<'h, H: Host + ?Sized> $name<'h, H> {
            /// Wrap a handle already known to have this shape.
            pub fn from_handle(host: &'h H, handle: HostHandle) -> Self {
                Self { host, handle }
            }

            pub fn handle(&self) -> HostHandle {
                self.handle
            }

            /// Give the handle back to the host. Copies of this facade
            /// must not be used afterwards.
            pub fn release(self) {
                self.host.release(self.handle);
            }
        }

        impl<H: Host + ?Sized> Clone for $name<'_, H> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<H: Host + ?Sized> Copy for $name<'_, H> {}

        impl<H: Host + ?Sized> std::fmt::Debug for $name<'_, H> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.handle).finish()
            }
        }
    };
}

facade!(
    /// The browser `window`.
    Window
);
facade!(
    /// The page `document`.
    Document
);
facade!(
    /// An HTML element.
    Element
);
facade!(
    /// Generic tree operations shared by every element.
    Node
);
facade!(
    /// The `console` object.
    Console
);

/// `document.body` is an ordinary element.
pub type Body<'h, H> = Element<'h, H>;

/// Obtain the global window from a host.
pub fn window<H: Host + ?Sized>(host: &H) -> Window<'_, H> {
    Window::from_handle(host, host.global())
}

fn expect_string(value: HostValue, member: &str) -> Result<String, HostError> {
    value.into_string(member)
}

impl<'h, H: Host + ?Sized> Window<'h, H> {
    pub fn document(&self) -> Result<Document<'h, H>, HostError> {
        let handle = self.host.get_object(self.handle, "document")?;
        Ok(Document::from_handle(self.host, handle))
    }

    pub fn console(&self) -> Result<Console<'h, H>, HostError> {
        let handle = self.host.get_object(self.handle, "console")?;
        Ok(Console::from_handle(self.host, handle))
    }
}

impl<'h, H: Host + ?Sized> Document<'h, H> {
    pub fn title(&self) -> Result<String, HostError> {
        expect_string(self.host.get(self.handle, "title")?, "title")
    }

    pub fn set_title(&self, title: &str) -> Result<(), HostError> {
        self.host.set(self.handle, "title", title.into())
    }

    pub fn body(&self) -> Result<Body<'h, H>, HostError> {
        let handle = self.host.get_object(self.handle, "body")?;
        Ok(Element::from_handle(self.host, handle))
    }

    pub fn create_element(&self, tag: &str) -> Result<Element<'h, H>, HostError> {
        let handle = self
            .host
            .call(self.handle, "createElement", &[tag.into()])?
            .as_handle()?;
        Ok(Element::from_handle(self.host, handle))
    }

    /// Find a connected element by its `id` attribute.
    pub fn get_element_by_id(&self, id: &str) -> Result<Option<Element<'h, H>>, HostError> {
        match self.host.call(self.handle, "getElementById", &[id.into()])? {
            HostValue::Object(handle) => Ok(Some(Element::from_handle(self.host, handle))),
            _ => Ok(None),
        }
    }
}

impl<'h, H: Host + ?Sized> Element<'h, H> {
    pub fn set_text(&self, text: &str) -> Result<(), HostError> {
        self.host.set(self.handle, "innerText", text.into())
    }

    pub fn text(&self) -> Result<String, HostError> {
        expect_string(self.host.get(self.handle, "innerText")?, "innerText")
    }

    /// Upper-case tag name, as the DOM reports it.
    pub fn tag_name(&self) -> Result<String, HostError> {
        expect_string(self.host.get(self.handle, "tagName")?, "tagName")
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), HostError> {
        self.host
            .call(self.handle, "setAttribute", &[name.into(), value.into()])
            .map(drop)
    }

    pub fn attribute(&self, name: &str) -> Result<Option<String>, HostError> {
        match self.host.call(self.handle, "getAttribute", &[name.into()])? {
            HostValue::String(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// View this element as a generic tree node.
    pub fn node(&self) -> Node<'h, H> {
        Node::from_handle(self.host, self.handle)
    }
}

impl<'h, H: Host + ?Sized> Node<'h, H> {
    /// Append `child` as the last child, moving it from any previous parent.
    pub fn append_child(&self, child: Node<'h, H>) -> Result<Node<'h, H>, HostError> {
        let handle = self
            .host
            .call(self.handle, "appendChild", &[child.handle.into()])?
            .as_handle()?;
        Ok(Node::from_handle(self.host, handle))
    }

    pub fn remove_child(&self, child: Node<'h, H>) -> Result<Node<'h, H>, HostError> {
        let handle = self
            .host
            .call(self.handle, "removeChild", &[child.handle.into()])?
            .as_handle()?;
        Ok(Node::from_handle(self.host, handle))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn child_count(&self) -> Result<usize, HostError> {
        let count = self.host.get(self.handle, "childElementCount")?;
        count.as_number().map(|n| n as usize).ok_or_else(|| {
            HostError::invalid_argument("childElementCount: expected number")
        })
    }

    pub fn parent(&self) -> Result<Option<Node<'h, H>>, HostError> {
        match self.host.get(self.handle, "parentNode")? {
            HostValue::Object(handle) => Ok(Some(Node::from_handle(self.host, handle))),
            _ => Ok(None),
        }
    }
}

impl<H: Host + ?Sized> Console<'_, H> {
    pub fn log(&self, message: &str) -> Result<(), HostError> {
        self.host
            .call(self.handle, "log", &[message.into()])
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomHost;

    #[test]
    fn test_window_document_title() {
        let host = DomHost::new();
        let doc = window(&host).document().unwrap();

        doc.set_title("Welcome page").unwrap();

        assert_eq!(doc.title().unwrap(), "Welcome page");
        assert_eq!(doc.handle(), host.document());
    }

    #[test]
    fn test_element_text_and_tag() {
        let host = DomHost::new();
        let doc = window(&host).document().unwrap();

        let header = doc.create_element("h1").unwrap();
        header.set_text("oh hi mark").unwrap();

        assert_eq!(header.text().unwrap(), "oh hi mark");
        assert_eq!(header.tag_name().unwrap(), "H1");
    }

    #[test]
    fn test_append_via_node() {
        let host = DomHost::new();
        let doc = window(&host).document().unwrap();
        let body = doc.body().unwrap();
        let header = doc.create_element("h1").unwrap();

        let appended = body.node().append_child(header.node()).unwrap();

        assert_eq!(appended.handle(), header.handle());
        assert_eq!(body.node().child_count().unwrap(), 1);
        assert_eq!(
            header.node().parent().unwrap().map(|p| p.handle()),
            Some(body.handle())
        );

        body.node().remove_child(header.node()).unwrap();
        assert_eq!(body.node().child_count().unwrap(), 0);
        assert!(header.node().parent().unwrap().is_none());
    }

    #[test]
    fn test_attributes_and_lookup() {
        let host = DomHost::new();
        let doc = window(&host).document().unwrap();
        let para = doc.create_element("p").unwrap();
        para.set_attribute("id", "intro").unwrap();

        assert_eq!(para.attribute("id").unwrap().as_deref(), Some("intro"));
        assert_eq!(para.attribute("class").unwrap(), None);
        assert!(doc.get_element_by_id("intro").unwrap().is_none());

        doc.body().unwrap().node().append_child(para.node()).unwrap();
        let found = doc.get_element_by_id("intro").unwrap().unwrap();
        assert_eq!(found.handle(), para.handle());
    }

    #[test]
    fn test_console_log() {
        let host = DomHost::new();
        let console = window(&host).console().unwrap();

        console.log("hello").unwrap();

        assert_eq!(host.console_lines(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_facade_over_trait_object() {
        let host = DomHost::new();
        let dyn_host: &dyn Host = &host;

        window(dyn_host).document().unwrap().set_title("dyn").unwrap();

        assert_eq!(host.title(), "dyn");
    }

    #[test]
    fn test_debug_shows_handle() {
        let host = DomHost::new();
        let w = window(&host);
        assert_eq!(format!("{w:?}"), "Window(HostHandle(0))");
    }
}
