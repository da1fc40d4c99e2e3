//! Registry of node kinds for the weave resolver.
//!
//! A node kind is described by one [`Declaration`] (its socket layout) and any
//! number of [`Definition`]s per output socket (the overload candidates).
//! Both are bundled into a [`Module`] and installed into a [`Registry`], which
//! is constructed explicitly and passed to the resolver by reference.

mod declaration;
mod definition;
mod module;
mod registry;

pub use declaration::{Declaration, DefaultSupplier, InputDecl};
pub use definition::{Definition, InstanceGetter, Signature, SignatureFn};
pub use module::Module;
pub use registry::Registry;
