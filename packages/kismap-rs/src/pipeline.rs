use crate::aggregate::{Aggregation, Aggregator};
use crate::error::Result;
use crate::filter::{DeviceClassifier, FilterConfig};
use crate::reader::CaptureReader;
use crate::types::Observation;

/// Run reader → filter → aggregator over a capture in one pass.
///
/// `tap` sees every observation that passed the filters, before it is
/// folded; the packet CSV exporter hooks in here.
pub fn analyze<F>(
    reader: &CaptureReader,
    filter: &FilterConfig,
    classifier: &dyn DeviceClassifier,
    mut tap: F,
) -> Result<Aggregation>
where
    F: FnMut(&Observation) -> Result<()>,
{
    let mut aggregator = Aggregator::new(classifier, filter.all_devices);
    let mut dropped = 0u64;

    let scanned = reader.scan(|obs| {
        if !filter.matches(&obs, classifier) {
            dropped += 1;
            return Ok(());
        }
        tap(&obs)?;
        aggregator.push(&obs);
        Ok(())
    })?;

    log::info!(
        "Scanned {} packets, {} dropped by filters",
        scanned,
        dropped
    );

    Ok(aggregator.finish(reader.device_count()))
}
