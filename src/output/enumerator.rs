use log::{debug, error};

use super::{
    combinatorics::unrank,
    traits::OutputSpaceEnumerator,
    value::{Output, ReportSlot},
};
use crate::{
    config::ApiConfig,
    errors::{NoiseCorrectionError, Result},
};

/// Largest output space the enumerators materialize in memory. Larger spaces
/// can still be walked lazily with [`output_space`].
pub const MAX_ENUMERATED_OUTPUTS: u64 = 1 << 24;

/// Size of the output space of `config`, if it is small enough to be
/// materialized.
fn enumerated_size(config: &ApiConfig) -> Result<usize> {
    let size = config.num_outputs()?;
    if size > MAX_ENUMERATED_OUTPUTS {
        return Err(NoiseCorrectionError::Configuration(format!(
            "output space of {size} outputs is too large to enumerate, \
             the limit is {MAX_ENUMERATED_OUTPUTS}"
        )));
    }
    // At most 2^24, fits in any usize.
    Ok(size as usize)
}

/// Builds outputs report by report, only ever appending slots with an index
/// at least as large as the previous one, so that no permutation of an
/// output is produced twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveEnumerator;

impl RecursiveEnumerator {
    fn extend(
        prefix: &mut Vec<ReportSlot>,
        start: usize,
        remaining: usize,
        config: &ApiConfig,
        num_slots: usize,
        outputs: &mut Vec<Output>,
    ) {
        // Stop here.
        outputs.push(Output::new(prefix.clone()));
        if remaining == 0 {
            return;
        }

        // Or add one more report.
        for index in start..num_slots {
            prefix.push(ReportSlot::from_index(index, config.data_cardinality()));
            Self::extend(prefix, index, remaining - 1, config, num_slots, outputs);
            prefix.pop();
        }
    }
}

impl OutputSpaceEnumerator for RecursiveEnumerator {
    fn enumerate(&self, config: &ApiConfig) -> Result<Vec<Output>> {
        let size = enumerated_size(config)?;
        let mut outputs = Vec::with_capacity(size);
        Self::extend(
            &mut Vec::with_capacity(config.max_reports()),
            0,
            config.max_reports(),
            config,
            config.num_report_slots()?,
            &mut outputs,
        );
        debug!("Enumerated {} outputs for {config:?}", outputs.len());
        Ok(outputs)
    }
}

/// Enumerates outputs by unranking stars-and-bars arrangements. See
/// [`OutputSpaceIter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StarsAndBarsEnumerator;

impl OutputSpaceEnumerator for StarsAndBarsEnumerator {
    fn enumerate(&self, config: &ApiConfig) -> Result<Vec<Output>> {
        enumerated_size(config)?;
        let outputs: Vec<Output> = output_space(config)?.collect();
        debug!("Enumerated {} outputs for {config:?}", outputs.len());
        Ok(outputs)
    }
}

/// Lazy iterator over the output space of a configuration.
///
/// An output is a line of `max_reports` stars (reports) and `slots` bars,
/// where `slots = data_cardinality * max_windows`. A star preceded by `b > 0`
/// bars is a report in slot `b - 1`, a star before the first bar is a
/// suppressed report. Each rank in `[0, C(slots + max_reports, max_reports))`
/// picks one placement of the stars.
#[derive(Debug, Clone)]
pub struct OutputSpaceIter {
    data_cardinality: usize,
    max_reports: usize,
    line_length: usize,
    next_rank: u64,
    size: u64,
}

/// Returns a lazy iterator over every output of `config`.
pub fn output_space(config: &ApiConfig) -> Result<OutputSpaceIter> {
    let size = config.num_outputs()?;
    Ok(OutputSpaceIter {
        data_cardinality: config.data_cardinality(),
        max_reports: config.max_reports(),
        // Cannot overflow, `num_outputs` checked it.
        line_length: config.num_report_slots()? + config.max_reports(),
        next_rank: 0,
        size,
    })
}

impl OutputSpaceIter {
    fn decode(&self, rank: u64) -> Result<Output> {
        let mut stars = unrank(rank, self.max_reports, self.line_length)?;
        stars.sort_unstable();

        let reports = stars
            .iter()
            .enumerate()
            .filter_map(|(i, &position)| {
                // Stars before this one take up `i` positions, bars the rest.
                let bars = position - i;
                (bars > 0).then(|| ReportSlot::from_index(bars - 1, self.data_cardinality))
            })
            .collect();
        Ok(Output::new(reports))
    }
}

impl Iterator for OutputSpaceIter {
    type Item = Output;

    fn next(&mut self) -> Option<Output> {
        if self.next_rank >= self.size {
            return None;
        }
        // Every rank below `size = C(line_length, max_reports)` unranks, a
        // failure means the iterator state is corrupt: log it and end here.
        match self.decode(self.next_rank) {
            Ok(output) => {
                self.next_rank += 1;
                Some(output)
            }
            Err(e) => {
                error!(
                    "Output space iteration stopped at rank {} of {}: {e}",
                    self.next_rank, self.size
                );
                self.next_rank = self.size;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.size - self.next_rank).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for OutputSpaceIter {}
