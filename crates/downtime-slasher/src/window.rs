// downtime-slasher/src/window.rs

use crate::{SlasherError, SlasherResult};
use chain_primitives::{epoch_number_of_block, BlockCount, BlockNumber, Epoch};
use serde::{Deserialize, Serialize};

/// Blocks kept between the chain head and the end of a head-relative window.
///
/// Whether block `b` was signed is only known once block `b + 1` carries its
/// parent seal, and the chain additionally checks block `end + 1`.
pub const DEFAULT_HEAD_LAG: u64 = 2;

/// Inclusive block range evaluated for downtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeWindow {
    start: BlockNumber,
    end: BlockNumber,
    length: BlockCount,
}

impl DowntimeWindow {
    /// Window of `length` blocks starting at `start`
    pub fn starting_at(start: BlockNumber, length: BlockCount) -> SlasherResult<Self> {
        if length == 0 {
            return Err(SlasherError::InvalidWindowLength(
                "window length must be at least one block".into(),
            ));
        }
        let end = start.checked_add(length - 1).ok_or_else(|| {
            SlasherError::InvalidWindowLength(format!(
                "window of {} blocks starting at {} overflows",
                length, start
            ))
        })?;
        Ok(Self { start, end, length })
    }

    /// Window of `length` blocks ending at `end`
    pub fn ending_at(end: BlockNumber, length: BlockCount) -> SlasherResult<Self> {
        if length == 0 {
            return Err(SlasherError::InvalidWindowLength(
                "window length must be at least one block".into(),
            ));
        }
        let start = end.checked_sub(length - 1).ok_or_else(|| {
            SlasherError::InvalidWindowLength(format!(
                "window of {} blocks cannot end at block {}",
                length, end
            ))
        })?;
        Ok(Self { start, end, length })
    }

    /// Window with both bounds given; they must span exactly `length` blocks
    pub fn between(start: BlockNumber, end: BlockNumber, length: BlockCount) -> SlasherResult<Self> {
        let spans = end.checked_sub(start).map(|d| d + 1);
        if length == 0 || spans != Some(length) {
            return Err(SlasherError::InvalidWindowLength(format!(
                "[{}, {}] does not span the slashable downtime of {} blocks",
                start, end, length
            )));
        }
        Ok(Self { start, end, length })
    }

    pub fn start(&self) -> BlockNumber {
        self.start
    }

    pub fn end(&self) -> BlockNumber {
        self.end
    }

    pub fn length(&self) -> BlockCount {
        self.length
    }

    pub fn contains(&self, block: BlockNumber) -> bool {
        self.start <= block && block <= self.end
    }

    /// Whether the two windows share at least one block
    pub fn overlaps(&self, other: &DowntimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Epochs of the first and last block
    pub fn epochs(&self, epoch_size: u64) -> (Epoch, Epoch) {
        (
            epoch_number_of_block(self.start, epoch_size),
            epoch_number_of_block(self.end, epoch_size),
        )
    }

    pub fn crosses_epoch_boundary(&self, epoch_size: u64) -> bool {
        let (first, last) = self.epochs(epoch_size);
        first != last
    }
}

impl std::fmt::Display for DowntimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Turns optional caller bounds into a concrete window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowResolver {
    length: BlockCount,
    head_lag: u64,
}

impl WindowResolver {
    pub fn new(length: BlockCount) -> Self {
        Self {
            length,
            head_lag: DEFAULT_HEAD_LAG,
        }
    }

    pub fn with_head_lag(mut self, head_lag: u64) -> Self {
        self.head_lag = head_lag;
        self
    }

    pub fn length(&self) -> BlockCount {
        self.length
    }

    /// Whether resolving these bounds needs the current chain head
    pub fn needs_head(start: Option<BlockNumber>, end: Option<BlockNumber>) -> bool {
        start.is_none() && end.is_none()
    }

    /// Resolve the window.
    ///
    /// `latest_block` is only consulted when neither bound is given, in which
    /// case the window ends `head_lag` blocks behind it.
    pub fn resolve(
        &self,
        start: Option<BlockNumber>,
        end: Option<BlockNumber>,
        latest_block: Option<BlockNumber>,
    ) -> SlasherResult<DowntimeWindow> {
        match (start, end) {
            (Some(start), Some(end)) => DowntimeWindow::between(start, end, self.length),
            (Some(start), None) => DowntimeWindow::starting_at(start, self.length),
            (None, Some(end)) => DowntimeWindow::ending_at(end, self.length),
            (None, None) => {
                let latest = latest_block.ok_or_else(|| {
                    SlasherError::InvalidWindowLength(
                        "no bounds given and chain head unknown".into(),
                    )
                })?;
                let end = latest.checked_sub(self.head_lag).ok_or_else(|| {
                    SlasherError::InvalidWindowLength(format!(
                        "chain head {} is too low for a window ending {} blocks behind it",
                        latest, self.head_lag
                    ))
                })?;
                DowntimeWindow::ending_at(end, self.length)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_both_bounds() {
        let resolver = WindowResolver::new(12);
        let window = resolver.resolve(Some(100), Some(111), None).unwrap();
        assert_eq!(window.start(), 100);
        assert_eq!(window.end(), 111);
        assert_eq!(window.length(), 12);
    }

    #[test]
    fn test_inconsistent_bounds() {
        let resolver = WindowResolver::new(12);
        assert!(matches!(
            resolver.resolve(Some(100), Some(112), None),
            Err(SlasherError::InvalidWindowLength(_))
        ));
        assert!(matches!(
            resolver.resolve(Some(100), Some(90), None),
            Err(SlasherError::InvalidWindowLength(_))
        ));
    }

    #[test]
    fn test_only_end() {
        let window = WindowResolver::new(12).resolve(None, Some(111), None).unwrap();
        assert_eq!(window.start(), 100);
    }

    #[test]
    fn test_only_end_underflow() {
        assert!(WindowResolver::new(12).resolve(None, Some(5), None).is_err());
    }

    #[test]
    fn test_head_relative() {
        let window = WindowResolver::new(12).resolve(None, None, Some(200)).unwrap();
        assert_eq!(window.end(), 198);
        assert_eq!(window.start(), 187);
    }

    #[test]
    fn test_head_required() {
        assert!(WindowResolver::needs_head(None, None));
        assert!(!WindowResolver::needs_head(Some(1), None));
        assert!(WindowResolver::new(12).resolve(None, None, None).is_err());
        assert!(WindowResolver::new(12).resolve(None, None, Some(1)).is_err());
    }

    #[test]
    fn test_custom_head_lag() {
        let window = WindowResolver::new(4)
            .with_head_lag(5)
            .resolve(None, None, Some(100))
            .unwrap();
        assert_eq!(window.end(), 95);
    }

    #[test]
    fn test_zero_length() {
        assert!(DowntimeWindow::starting_at(10, 0).is_err());
        assert!(DowntimeWindow::ending_at(10, 0).is_err());
        assert!(DowntimeWindow::between(10, 9, 0).is_err());
    }

    #[test]
    fn test_overlap() {
        let a = DowntimeWindow::starting_at(10, 12).unwrap();
        let b = DowntimeWindow::starting_at(21, 12).unwrap();
        let c = DowntimeWindow::starting_at(22, 12).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(a.contains(21));
        assert!(!a.contains(22));
    }

    #[test]
    fn test_epoch_crossing() {
        let window = DowntimeWindow::starting_at(95, 12).unwrap();
        assert_eq!(window.epochs(100), (1, 2));
        assert!(window.crosses_epoch_boundary(100));
        assert!(!DowntimeWindow::starting_at(1, 12).unwrap().crosses_epoch_boundary(100));
    }

    proptest! {
        #[test]
        fn start_only_spans_length(start in 0u64..1_000_000_000, length in 1u64..100_000) {
            let window = WindowResolver::new(length).resolve(Some(start), None, None).unwrap();
            prop_assert_eq!(window.start(), start);
            prop_assert_eq!(window.end(), start + length - 1);
            prop_assert_eq!(window.end() - window.start() + 1, length);
        }

        #[test]
        fn mismatched_bounds_rejected(
            start in 0u64..1_000_000,
            span in 1u64..10_000,
            length in 1u64..10_000,
        ) {
            prop_assume!(span != length);
            let end = start + span - 1;
            let result = WindowResolver::new(length).resolve(Some(start), Some(end), None);
            prop_assert!(matches!(result, Err(SlasherError::InvalidWindowLength(_))));
        }
    }
}
