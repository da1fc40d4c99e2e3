use crate::error::StageError;
use crate::pipeline::{PipelineContext, Stage};
use crate::resolver::resolve_graph;

use super::{PARSE_RESULT, RESOLVED};

/// Runs the overload resolver. Fails when it reported any error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveStage;

impl Stage for ResolveStage {
    fn name(&self) -> &'static str {
        "resolve"
    }

    fn run(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let (resolution, parse_result) = resolve_graph(cx.graph, cx.registry, &cx.options.resolver);
        let errors = parse_result.errors().count();
        let complete = resolution.is_complete();
        cx.side.insert(RESOLVED, resolution);
        cx.side.insert(PARSE_RESULT, parse_result);

        if errors > 0 {
            return Err(StageError::new(self.name(), format!("{errors} error(s) in graph")));
        }
        if !complete {
            return Err(StageError::new(self.name(), "graph has unresolved outputs"));
        }
        Ok(())
    }
}
