//! Enumeration of indexed on-chain collections.
//!
//! Reads are issued one index at a time, in order; whether index `i + 1`
//! exists is only known after index `i` has resolved.

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::future::Future;

use crate::error::{ConsoleError, Result};

/// How the end of a collection is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// A companion count query gave the exact number of entries.
    Count(u64),
    /// No count is available: read until the ledger refuses an index.
    Probe,
}

/// Why an enumeration stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Every index below the count was read.
    Exhausted,
    /// The ledger rejected `index`, i.e. it does not exist.
    Absent { index: u64 },
    /// Reading `index` failed for a reason other than a rejection, so the
    /// collection may have been cut short.
    Ambiguous { index: u64, reason: String },
}

impl Termination {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Termination::Ambiguous { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub termination: Termination,
}

/// Lazily reads `start..start + count` in order. Any failure is an error.
pub fn counted<T, F, Fut>(start: u64, count: u64, read: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    stream::iter(start..start.saturating_add(count)).then(read)
}

/// Reads from `start` until the first index that fails.
///
/// A rejection ends the collection normally. Any other failure also ends it
/// (the items read so far are kept) but is reported as `Ambiguous`.
pub async fn probe_until_absent<T, F, Fut>(start: u64, mut read: F) -> Collected<T>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut items = Vec::new();
    let mut index = start;
    let termination = loop {
        match read(index).await {
            Ok(item) => {
                items.push(item);
                index += 1;
            }
            Err(e) if e.is_rejection() => {
                log::debug!("probe stopped at absent index {}", index);
                break Termination::Absent { index };
            }
            Err(e) => {
                log::warn!(
                    "probe stopped at index {} on a non-rejection failure, collection may be truncated: {}",
                    index,
                    e
                );
                break Termination::Ambiguous {
                    index,
                    reason: e.to_string(),
                };
            }
        }
    };
    Collected { items, termination }
}

/// Enumerates a collection with whichever strategy `bound` selects.
pub async fn collect<T, F, Fut>(start: u64, bound: Bound, read: F) -> Result<Collected<T>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match bound {
        Bound::Count(count) => {
            let items: Vec<T> = counted(start, count, read).try_collect().await?;
            Ok(Collected {
                items,
                termination: Termination::Exhausted,
            })
        }
        Bound::Probe => Ok(probe_until_absent(start, read).await),
    }
}

/// The rejection a ledger gives for an index past the end of a collection.
pub fn out_of_range(method: &str, index: u64) -> ConsoleError {
    ConsoleError::Rejected {
        method: method.to_string(),
        reason: format!("index {} out of range", index),
    }
}
