use crate::error::StageError;
use crate::executable::Executable;
use crate::pipeline::{PipelineContext, Stage};

use super::{EXECUTABLE, RESOLVED};

/// Wraps the resolved outputs into an [`Executable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutableStage;

impl Stage for ExecutableStage {
    fn name(&self) -> &'static str {
        "executable"
    }

    fn run(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let resolution = cx
            .side
            .get(RESOLVED)
            .ok_or_else(|| StageError::new(self.name(), "nothing resolved"))?;
        let executable = Executable::from_resolution(resolution)
            .ok_or_else(|| StageError::new(self.name(), "graph has unresolved outputs"))?;
        cx.side.insert(EXECUTABLE, executable);
        Ok(())
    }
}
