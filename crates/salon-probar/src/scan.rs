//! Ordered Slot/Day Scan
//!
//! Walks an ordered, bounded sequence of candidate positions (calendar day
//! offsets, indices into a rendered slot list) and stops at the first one
//! whose check succeeds. Between two failed checks the scanner advances
//! exactly once, e.g. by clicking "next day".

use crate::result::{SalonError, SalonResult};
use async_trait::async_trait;
use tracing::debug;

/// Check and advance steps of an ordered scan
#[async_trait]
pub trait Scanner<P: Sync>: Send {
    /// Value captured at the matching position (e.g. a slot's time text)
    type Capture: Send;

    /// Observe `position`; `Ok(None)` means "not there", not an error
    async fn check(&mut self, position: &P) -> SalonResult<Option<Self::Capture>>;

    /// Move from `from` to the next position. List scans need no step.
    async fn advance(&mut self, from: &P) -> SalonResult<()> {
        let _ = from;
        Ok(())
    }
}

/// First successful position of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHit<P, C> {
    /// The matching position
    pub position: P,
    /// 0-based index of the position within the sequence
    pub index: usize,
    /// Value captured by the check
    pub capture: C,
}

/// Check `positions` left to right until one succeeds.
///
/// Performs at most one check per position and exactly one `advance`
/// between consecutive failed checks. Nothing is advanced after the last
/// check.
///
/// # Errors
///
/// - check or advance errors, unchanged
/// - [`SalonError::SlotNotFound`] when every position was checked without a hit
pub async fn ordered_scan<P, S, I>(
    label: &str,
    positions: I,
    scanner: &mut S,
) -> SalonResult<ScanHit<P, S::Capture>>
where
    P: Sync + std::fmt::Debug,
    S: Scanner<P> + ?Sized,
    I: IntoIterator<Item = P>,
{
    let mut checks = 0usize;
    let mut previous: Option<P> = None;

    for (index, position) in positions.into_iter().enumerate() {
        if let Some(failed) = previous.take() {
            scanner.advance(&failed).await?;
        }

        checks += 1;
        if let Some(capture) = scanner.check(&position).await? {
            debug!(scan = label, ?position, index, "check hit");
            return Ok(ScanHit {
                position,
                index,
                capture,
            });
        }
        debug!(scan = label, ?position, index, "check missed");
        previous = Some(position);
    }

    Err(SalonError::SlotNotFound {
        scan: label.to_string(),
        checks,
    })
}
