//! Host binding shim for hostlink.
//!
//! This crate is shared by the host and by guest programs:
//! - [`Host`]: the capability carrying the four host operations
//!   (global, get, set, call)
//! - [`DomHost`]: an in-process host modelling a browser page
//! - [`web`]: typed `Window` / `Document` / `Element` / `Node` facades
//! - [`wasi`]: console and file output
//! - [`RefTable`] and [`abi`]: the reference table and import names used
//!   across the wasm boundary
//! - [`guest`]: [`Host`] implemented over the `hostlink` imports
//!
//! # Example
//!
//! ```
//! use hostlink_bindings::{DomHost, web};
//!
//! let host = DomHost::new();
//! let doc = web::window(&host).document()?;
//! doc.set_title("Welcome page")?;
//! assert_eq!(host.title(), "Welcome page");
//! # Ok::<(), hostlink_common::HostError>(())
//! ```

pub mod abi;
pub mod dom;
pub mod guest;
pub mod host;
pub mod programs;
pub mod refs;
pub mod value;
pub mod wasi;
pub mod web;

pub use dom::{DomHost, DomSnapshot, NodeSnapshot};
pub use host::Host;
pub use refs::RefTable;
pub use value::{HostHandle, HostValue, ValueKind};

pub use guest::ImportHost;
