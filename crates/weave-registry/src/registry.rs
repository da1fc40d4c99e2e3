//! Lookup of declarations and candidate definitions.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use weave_core::{DefinitionHash, QualifiedName, RegistrationError};

use crate::declaration::Declaration;
use crate::definition::{Definition, Signature};

/// Declarations and definitions known to the resolver.
///
/// Built at start-up, then shared read-only. Candidates for a socket are
/// returned in registration order so resolution is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    declarations: Vec<Declaration>,
    declaration_index: FxHashMap<QualifiedName, usize>,
    definitions: Vec<Definition>,
    socket_index: FxHashMap<(QualifiedName, usize), Vec<usize>>,
    hashes: FxHashSet<DefinitionHash>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    pub fn register_declaration(&mut self, declaration: Declaration) -> Result<(), RegistrationError> {
        if self.declaration_index.contains_key(&declaration.name) {
            return Err(RegistrationError::DuplicateDeclaration {
                name: declaration.name,
            });
        }
        debug!(
            name = %declaration.name,
            inputs = declaration.input_count(),
            outputs = declaration.output_count(),
            "register declaration"
        );
        self.declaration_index
            .insert(declaration.name.clone(), self.declarations.len());
        self.declarations.push(declaration);
        Ok(())
    }

    /// Register a definition for an already declared name.
    ///
    /// A fixed signature must take at least as many arguments as the
    /// declaration has inputs; anything beyond that is the output type.
    pub fn register_definition(&mut self, definition: Definition) -> Result<(), RegistrationError> {
        let declaration =
            self.declaration(definition.name())
                .ok_or_else(|| RegistrationError::MissingDeclaration {
                    name: definition.name().clone(),
                })?;

        if definition.output() >= declaration.output_count() {
            return Err(RegistrationError::OutputOutOfRange {
                name: definition.name().clone(),
                output: definition.output(),
                outputs: declaration.output_count(),
            });
        }

        if let Signature::Fixed(ty) = definition.signature() {
            if ty.arity() < declaration.input_count() {
                return Err(RegistrationError::ArityMismatch {
                    name: definition.name().clone(),
                    output: definition.output(),
                    expected: declaration.input_count(),
                    found: ty.arity(),
                });
            }
        }

        if !self.hashes.insert(definition.hash()) {
            return Err(RegistrationError::DuplicateDefinition {
                name: definition.name().clone(),
                hash: definition.hash(),
            });
        }

        debug!(
            name = %definition.name(),
            output = definition.output(),
            signature = %definition.signature(),
            "register definition"
        );
        let key = (definition.name().clone(), definition.output());
        self.socket_index
            .entry(key)
            .or_default()
            .push(self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn declaration(&self, name: &QualifiedName) -> Option<&Declaration> {
        self.declaration_index
            .get(name)
            .map(|&i| &self.declarations[i])
    }

    pub fn contains_declaration(&self, name: &QualifiedName) -> bool {
        self.declaration_index.contains_key(name)
    }

    /// Definitions of output `output` of `name`, in registration order.
    pub fn candidates(&self, name: &QualifiedName, output: usize) -> Vec<&Definition> {
        self.socket_index
            .get(&(name.clone(), output))
            .map(|indices| indices.iter().map(|&i| &self.definitions[i]).collect())
            .unwrap_or_default()
    }

    pub fn definition(&self, hash: DefinitionHash) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.hash() == hash)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.iter()
    }

    pub fn declaration_count(&self) -> usize {
        self.declarations.len()
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
