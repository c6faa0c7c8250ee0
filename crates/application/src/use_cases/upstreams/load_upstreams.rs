use crate::ports::UpstreamSource;
use ferrous_netd_domain::{NetworkError, ServerDefaults, UpstreamServerSpec};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Use case: read the dynamic upstream servers from their source
///
/// Unparseable lines are skipped with a warning; a source that cannot be read
/// at all is an error so the caller can keep the previous list.
pub struct LoadUpstreamsUseCase {
    source: Arc<dyn UpstreamSource>,
    defaults: ServerDefaults,
}

impl LoadUpstreamsUseCase {
    pub fn new(source: Arc<dyn UpstreamSource>, defaults: ServerDefaults) -> Self {
        Self { source, defaults }
    }

    pub fn execute(&self) -> Result<Vec<UpstreamServerSpec>, NetworkError> {
        let origin = self.source.describe();
        debug!(source = %origin, "Reading upstream servers");

        let lines = self.source.read_servers()?;
        let mut specs = Vec::with_capacity(lines.len());

        for line in &lines {
            match UpstreamServerSpec::parse(line, &self.defaults) {
                Ok(parsed) => specs.extend(parsed.into_iter().map(UpstreamServerSpec::dynamic)),
                Err(e) => warn!(source = %origin, line = %line, error = %e, "Ignoring upstream"),
            }
        }

        info!(source = %origin, servers = specs.len(), "Upstream servers loaded");
        Ok(specs)
    }
}
