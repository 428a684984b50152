//! The host capability.
//!
//! Everything a program can do to a host object graph goes through four
//! operations: obtain the global object, read a property, write a property,
//! call a method. [`Host`] is the capability carrying them; programs receive
//! it explicitly instead of reaching for a process-wide global, so the same
//! program runs against [`DomHost`](crate::DomHost) in tests and against the
//! wasm imports in a guest.

use hostlink_common::HostError;

use crate::{HostHandle, HostValue};

/// Generic access to a host object graph.
pub trait Host {
    /// The root object of the host (the browser `window`).
    ///
    /// Every call returns a handle to the same object.
    fn global(&self) -> HostHandle;

    /// Read a named property.
    ///
    /// # Errors
    ///
    /// [`HostError::MemberNotFound`] when the object has no such property,
    /// [`HostError::InvalidHandle`] when the host does not know `target`.
    fn get(&self, target: HostHandle, name: &str) -> Result<HostValue, HostError>;

    /// Write a named property. The change is visible to the host immediately.
    fn set(&self, target: HostHandle, name: &str, value: HostValue) -> Result<(), HostError>;

    /// Invoke a named method with positional arguments.
    ///
    /// # Errors
    ///
    /// [`HostError::MemberNotFound`] when there is no such member,
    /// [`HostError::NotCallable`] when the member is a plain property.
    fn call(
        &self,
        target: HostHandle,
        name: &str,
        args: &[HostValue],
    ) -> Result<HostValue, HostError>;

    /// Give back a handle the program no longer needs.
    ///
    /// Hosts that keep every object for the whole run ignore this.
    fn release(&self, _handle: HostHandle) {}

    /// Read a property that must hold an object.
    fn get_object(&self, target: HostHandle, name: &str) -> Result<HostHandle, HostError> {
        self.get(target, name)?.as_handle()
    }
}

impl<H: Host + ?Sized> Host for &H {
    fn global(&self) -> HostHandle {
        (**self).global()
    }

    fn get(&self, target: HostHandle, name: &str) -> Result<HostValue, HostError> {
        (**self).get(target, name)
    }

    fn set(&self, target: HostHandle, name: &str, value: HostValue) -> Result<(), HostError> {
        (**self).set(target, name, value)
    }

    fn call(
        &self,
        target: HostHandle,
        name: &str,
        args: &[HostValue],
    ) -> Result<HostValue, HostError> {
        (**self).call(target, name, args)
    }

    fn release(&self, handle: HostHandle) {
        (**self).release(handle);
    }
}
