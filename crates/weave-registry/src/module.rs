//! Bundles of declarations and definitions installed together.

use weave_core::RegistrationError;

use crate::declaration::Declaration;
use crate::definition::Definition;
use crate::registry::Registry;

/// A namespace of node kinds.
///
/// Global names inside a module are moved into its namespace on install, so
/// a `list` module can declare `cons` and define `cons`.
///
/// ```
/// use weave_core::{QualifiedName, Value};
/// use weave_registry::{Declaration, Definition, Module, Registry};
///
/// let module = Module::new("consts")
///     .declare(Declaration::new("zero").output("value"))
///     .define(Definition::constant("zero", 0, Value::Int(0)));
///
/// let mut registry = Registry::new();
/// module.install_into(&mut registry).unwrap();
/// assert_eq!(registry.candidates(&QualifiedName::from("consts::zero"), 0).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub namespace: Vec<String>,
    pub declarations: Vec<Declaration>,
    pub definitions: Vec<Definition>,
}

impl Module {
    /// A module rooted at a `::`-separated namespace; `""` is the global namespace.
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace
                .split("::")
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            declarations: Vec::new(),
            definitions: Vec::new(),
        }
    }

    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration.qualify(&self.namespace));
        self
    }

    pub fn define(mut self, definition: Definition) -> Self {
        self.definitions.push(definition.qualify(&self.namespace));
        self
    }

    pub fn namespace_string(&self) -> String {
        self.namespace.join("::")
    }

    /// Register everything, declarations first. Stops at the first error.
    pub fn install_into(self, registry: &mut Registry) -> Result<(), RegistrationError> {
        for declaration in self.declarations {
            registry.register_declaration(declaration)?;
        }
        for definition in self.definitions {
            registry.register_definition(definition)?;
        }
        Ok(())
    }
}
