use weave_core::{Diagnostic, DiagnosticKind, TreeId, more_general, normalize, specializable};

use crate::error::StageError;
use crate::pipeline::{PipelineContext, Stage};

use super::{PARSE_RESULT, RESOLVED};

/// Compares resolved root output types with the declared interface.
///
/// Only warns: the resolver already enforced the declared types as demands,
/// so anything found here is a type left more generic than declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceCheckStage;

impl Stage for InterfaceCheckStage {
    fn name(&self) -> &'static str {
        "interface-check"
    }

    fn run(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let resolution = cx
            .side
            .get(RESOLVED)
            .ok_or_else(|| StageError::new(self.name(), "nothing resolved"))?;
        let sink = cx.graph.group_output(TreeId::ROOT);

        let mut warnings = Vec::new();
        for (index, output) in resolution.outputs.iter().enumerate() {
            let (Some(declared), Some(resolved)) = (&output.declared, &output.resolved) else {
                continue;
            };
            let message = if !specializable(declared, &resolved.ty) {
                format!(
                    "output `{}` resolved to {}, which does not fit the declared {}",
                    output.name,
                    normalize(&resolved.ty),
                    declared
                )
            } else if more_general(&resolved.ty, declared) {
                format!(
                    "output `{}` resolved to {}, more generic than the declared {}",
                    output.name,
                    normalize(&resolved.ty),
                    declared
                )
            } else {
                continue;
            };
            let mut warning = Diagnostic::warning(DiagnosticKind::TypeMismatch, message);
            if let Some(sink) = sink {
                warning = warning.at_socket(sink.input(index));
            }
            warnings.push(warning);
        }

        let parse_result = cx
            .side
            .get_mut(PARSE_RESULT)
            .ok_or_else(|| StageError::new(self.name(), "no parse result"))?;
        for warning in warnings {
            parse_result.push(warning);
        }
        Ok(())
    }
}
