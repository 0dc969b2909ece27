use crate::error::Result;
use crate::layout::{LayoutCatalog, ResolvedPointers};
use crate::process::{LocatedProcess, ProcessBackend, ProcessLocator};
use crate::sampler::{MemorySampler, SampleOutcome};

/// Snapshot of what one cycle would see, for diagnostics
#[derive(Debug)]
pub struct Inspection {
    pub process: LocatedProcess,
    pub layout: String,
    pub pointers: Option<ResolvedPointers>,
    pub sample: Option<SampleOutcome>,
    /// Why resolution or sampling stopped early
    pub error: Option<String>,
}

/// Locate, attach, resolve and sample once.
///
/// `Ok(None)` when the target is not running. Failures after attaching are
/// reported in `Inspection::error` so the located process is still shown.
pub fn inspect(
    backend: &mut dyn ProcessBackend,
    locator: &ProcessLocator,
    catalog: &LayoutCatalog,
    module: &str,
) -> Result<Option<Inspection>> {
    let Some(process) = locator.locate(backend)? else {
        return Ok(None);
    };

    let layout = catalog.resolve(&process.version)?;
    let reader = backend.attach(process.pid, module)?;
    let mut inspection = Inspection {
        process,
        layout: layout.describe(),
        pointers: None,
        sample: None,
        error: None,
    };

    let pointers = match layout.resolve(reader.as_ref()) {
        Ok(pointers) => pointers,
        Err(e) => {
            inspection.error = Some(e.to_string());
            return Ok(Some(inspection));
        }
    };
    inspection.pointers = Some(pointers);

    match MemorySampler::sample(reader.as_ref(), &pointers) {
        Ok(sample) => inspection.sample = Some(sample),
        Err(e) => inspection.error = Some(e.to_string()),
    }
    Ok(Some(inspection))
}
