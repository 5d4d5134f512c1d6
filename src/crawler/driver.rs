//! Pagination driver
//!
//! Walks one pagination sequence: fetch a page, extract it, fold the
//! records, follow the next-page reference. Pages within a sequence are
//! strictly ordered; page N+1 is not requested before page N is folded in.

use crate::crawler::extractor::{extract, ContentType, Extracted};
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::state::SequenceState;
use crate::FetchError;
use std::collections::HashSet;
use url::Url;

/// How a pagination sequence ended
#[derive(Debug)]
pub struct SequenceOutcome {
    pub content_type: ContentType,

    /// The URL the sequence started from
    pub seed: Url,

    /// Terminal state: `Done` or `Aborted`
    pub state: SequenceState,

    /// Pages retrieved and extracted
    pub pages_fetched: usize,

    /// Records handed to the fold callback
    pub records: usize,

    /// The failure that aborted the sequence
    pub error: Option<FetchError>,
}

impl SequenceOutcome {
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

/// Tracks a sequence's state and rejects illegal transitions in debug builds
struct Sequence {
    content_type: ContentType,
    state: SequenceState,
}

impl Sequence {
    fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            state: SequenceState::Fetching,
        }
    }

    fn advance(&mut self, next: SequenceState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid sequence transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!(
            "{} sequence: {} -> {}",
            self.content_type.as_str(),
            self.state,
            next
        );
        self.state = next;
    }
}

/// Runs a pagination sequence to completion
///
/// Every extracted record is passed to `fold` together with the URL of the
/// page it came from. A fetch failure aborts this sequence only; the
/// error is returned in the outcome rather than propagated, so sibling
/// sequences keep running.
///
/// An out-of-scope next-page link ends the sequence normally: no request
/// is sent and there is nothing further to follow. So does a next-page link
/// to a page this sequence already fetched; a pager cycle never refetches.
pub async fn run_sequence<F>(
    fetcher: &Fetcher,
    seed: Url,
    content_type: ContentType,
    mut fold: F,
) -> SequenceOutcome
where
    F: FnMut(Extracted, &Url),
{
    let mut sequence = Sequence::new(content_type);
    let mut current = seed.clone();
    let mut visited = HashSet::from([seed.clone()]);
    let mut pages_fetched = 0;
    let mut records = 0;

    loop {
        let page = match fetcher.fetch(&current).await {
            Ok(FetchOutcome::Fetched(page)) => page,
            Ok(FetchOutcome::OutOfScope) => {
                tracing::debug!("Stopping {} sequence at {}", content_type.as_str(), current);
                sequence.advance(SequenceState::Extracting);
                sequence.advance(SequenceState::Advancing);
                sequence.advance(SequenceState::Done);
                break;
            }
            Err(error) => {
                tracing::warn!(
                    "Aborting {} sequence from {}: {}",
                    content_type.as_str(),
                    seed,
                    error
                );
                sequence.advance(SequenceState::Aborted);
                return SequenceOutcome {
                    content_type,
                    seed,
                    state: sequence.state,
                    pages_fetched,
                    records,
                    error: Some(error),
                };
            }
        };

        sequence.advance(SequenceState::Extracting);
        pages_fetched += 1;

        let extracted = extract(&page.body, content_type, &page.url);
        for record in extracted.records {
            records += 1;
            fold(record, &page.url);
        }

        sequence.advance(SequenceState::Advancing);

        match extracted.next_page {
            Some(next) if !visited.contains(&next) => {
                sequence.advance(SequenceState::Fetching);
                visited.insert(next.clone());
                current = next;
            }
            Some(next) => {
                tracing::warn!("Next-page link from {} revisits {}, stopping", current, next);
                sequence.advance(SequenceState::Done);
                break;
            }
            None => {
                sequence.advance(SequenceState::Done);
                break;
            }
        }
    }

    tracing::info!(
        "Finished {} sequence from {}: {} pages, {} records",
        content_type.as_str(),
        seed,
        pages_fetched,
        records
    );

    SequenceOutcome {
        content_type,
        seed,
        state: sequence.state,
        pages_fetched,
        records,
        error: None,
    }
}
