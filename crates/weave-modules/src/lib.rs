//! Leaf node vocabularies for the weave node compiler.
//!
//! - **list** - `nil`, `cons`, `head`, `tail`, `is_empty` over lazy lists
//! - **math** - `add` and `mul`, overloaded on `int` and `float`
//! - **constant** - literal nodes reading their value from the node payload
//!
//! # Usage
//!
//! Each module provides a function that returns a [`Module`] which can be
//! installed into a registry:
//!
//! ```
//! use weave_registry::Registry;
//!
//! let mut registry = Registry::new();
//! for module in weave_modules::default_modules() {
//!     module.install_into(&mut registry).unwrap();
//! }
//! assert!(registry.contains_declaration(&"list::cons".into()));
//! ```

pub mod constant;
pub mod list;
pub mod math;

pub use constant::ConstantError;
pub use list::ListError;
pub use math::MathError;

use weave_registry::Module;

/// Every module in this crate.
pub fn default_modules() -> Vec<Module> {
    vec![list::module(), math::module(), constant::module()]
}
