use std::cmp::min;
use std::iter::FusedIterator;

use super::ProgressEvent;


/// Check whether progress should be reported after `processed` out of
/// `total` frames, given a reporting interval of `stepping` frames.
///
/// A `stepping` of zero disables reporting altogether. Otherwise the
/// last frame is always reported, even if `total` is not a multiple of
/// `stepping`.
#[inline]
pub(super) fn is_report_point(processed: usize, total: usize, stepping: u32) -> bool {
    if stepping == 0 || processed == 0 {
        return false
    }
    processed % stepping as usize == 0 || processed == total
}


/// A finite stream of [`ProgressEvent`]s.
///
/// The stream reports progress every `stepping` frames and once more
/// after the last frame, if its number is not a multiple of
/// `stepping`. Counts are strictly increasing and the last event's count
/// equals the total number of frames. Logs without frames, as well as
/// a `stepping` of zero, produce no events at all.
#[derive(Clone, Debug)]
pub struct Progress {
    /// The number of frames reported as processed so far.
    processed: usize,
    /// The total number of frames.
    total: usize,
    /// The reporting interval, in frames.
    stepping: u32,
}

impl Progress {
    pub(super) fn new(total: usize, stepping: u32) -> Self {
        Self {
            processed: 0,
            total,
            stepping,
        }
    }

    /// Retrieve the total number of frames that progress is reported
    /// for.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }
}

impl Iterator for Progress {
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stepping == 0 || self.processed >= self.total {
            return None
        }

        self.processed = min(self.processed + self.stepping as usize, self.total);
        debug_assert!(is_report_point(self.processed, self.total, self.stepping));

        let event = ProgressEvent {
            processed: self.processed,
            total: self.total,
        };
        Some(event)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.stepping == 0 {
            0
        } else {
            (self.total - self.processed).div_ceil(self.stepping as usize)
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Progress {}

impl FusedIterator for Progress {}
