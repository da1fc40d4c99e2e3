//! The compiled form of a graph.

use weave_core::{Term, Type, VarId, evaluate};

use crate::error::RunError;
use crate::resolver::Resolution;

/// A root interface input of an executable.
#[derive(Debug, Clone)]
pub struct ExecutableInput {
    pub name: String,
    pub var: VarId,
    pub ty: Type,
}

/// A root interface output: a term abstracted over every input.
#[derive(Debug, Clone)]
pub struct ExecutableOutput {
    pub name: String,
    pub ty: Type,
    term: Term,
}

impl ExecutableOutput {
    /// The output term, one lambda per executable input.
    pub fn term(&self) -> &Term {
        &self.term
    }
}

/// Terms for every root output, ready to evaluate.
///
/// Running never invalidates the executable. A failed run reports its error
/// and the next run starts from the same terms.
#[derive(Debug, Clone)]
pub struct Executable {
    inputs: Vec<ExecutableInput>,
    outputs: Vec<ExecutableOutput>,
}

impl Executable {
    /// `None` unless every root output resolved.
    pub fn from_resolution(resolution: &Resolution) -> Option<Self> {
        let inputs: Vec<ExecutableInput> = resolution
            .inputs
            .iter()
            .map(|input| ExecutableInput {
                name: input.name.clone(),
                var: input.var,
                ty: input.ty.clone(),
            })
            .collect();

        let mut outputs = Vec::with_capacity(resolution.outputs.len());
        for output in &resolution.outputs {
            let resolved = output.resolved.as_ref()?;
            let term = inputs.iter().rev().fold(resolved.term.clone(), |body, input| {
                Term::lambda(input.var, input.ty.clone(), body)
            });
            outputs.push(ExecutableOutput {
                name: output.name.clone(),
                ty: resolved.ty.clone(),
                term,
            });
        }

        Some(Self { inputs, outputs })
    }

    pub fn inputs(&self) -> &[ExecutableInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ExecutableOutput] {
        &self.outputs
    }

    pub fn output(&self, index: usize) -> Option<&ExecutableOutput> {
        self.outputs.get(index)
    }

    /// Index of the output called `name`.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|o| o.name == name)
    }

    /// Evaluate output `index` with `args` bound to the inputs in order.
    pub fn run_output(&self, index: usize, args: &[Term]) -> Result<Term, RunError> {
        if args.len() != self.inputs.len() {
            return Err(RunError::ArgumentCount {
                expected: self.inputs.len(),
                found: args.len(),
            });
        }
        let output = self.outputs.get(index).ok_or(RunError::NoSuchOutput(index))?;
        let applied = Term::apply_all(output.term.clone(), args.iter().cloned());
        Ok(evaluate(&applied)?)
    }

    /// Evaluate every output.
    pub fn run(&self, args: &[Term]) -> Result<Vec<Term>, RunError> {
        (0..self.outputs.len())
            .map(|index| self.run_output(index, args))
            .collect()
    }
}
