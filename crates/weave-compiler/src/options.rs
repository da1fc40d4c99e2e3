//! Compiler configuration.

/// Options for one resolver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Maximum number of nested socket resolutions before a branch is
    /// abandoned with a depth-limit error.
    pub max_depth: usize,
    /// Emit an info diagnostic whenever an input falls back to its default.
    pub report_default_arguments: bool,
    /// Warn about operation outputs that are connected to nothing.
    pub warn_unconnected_outputs: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            report_default_arguments: true,
            warn_unconnected_outputs: false,
        }
    }
}

impl ResolverOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_report_default_arguments(mut self, report: bool) -> Self {
        self.report_default_arguments = report;
        self
    }

    pub fn with_warn_unconnected_outputs(mut self, warn: bool) -> Self {
        self.warn_unconnected_outputs = warn;
        self
    }
}

/// Options for the standard compile pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub resolver: ResolverOptions,
}

impl CompileOptions {
    pub fn with_resolver(mut self, resolver: ResolverOptions) -> Self {
        self.resolver = resolver;
        self
    }
}
