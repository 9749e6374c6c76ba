//! Gap detection and windowing for incremental summarization

use chrono::{DateTime, Duration, Utc};

use crate::types::{Message, TimeRange};

/// Rules for finding message groups worth summarizing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapPolicy {
    /// Messages younger than this stay verbatim
    pub fresh_for: Duration,
    /// A silence longer than this starts a new group
    pub max_gap: Duration,
    /// Smaller groups are not worth a generation call
    pub min_group_size: usize,
    /// Generation calls per request
    pub max_groups: usize,
}

impl GapPolicy {
    pub fn new() -> Self {
        Self {
            fresh_for: Duration::hours(2),
            max_gap: Duration::hours(4),
            min_group_size: 3,
            max_groups: 3,
        }
    }

    /// Messages in this range are old enough to compress and recent enough to look at
    pub fn lookback(&self, now: DateTime<Utc>, time_range_hours: i64) -> TimeRange {
        let start = Duration::try_hours(time_range_hours.max(0))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = now
            .checked_sub_signed(self.fresh_for)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        TimeRange::new(start.min(end), end)
    }

    /// Groups to summarize this round, oldest first.
    ///
    /// Undersized groups are skipped before the cap applies, so they never
    /// starve later groups of a slot.
    pub fn select_groups(&self, messages: &[Message]) -> Vec<Vec<Message>> {
        partition_by_gap(messages, self.max_gap)
            .into_iter()
            .filter(|group| group.len() >= self.min_group_size)
            .take(self.max_groups)
            .collect()
    }
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Messages whose timestamp falls in none of `covered`
pub fn uncovered_messages(messages: &[Message], covered: &[TimeRange]) -> Vec<Message> {
    messages
        .iter()
        .filter(|m| !covered.iter().any(|range| range.contains(m.timestamp)))
        .cloned()
        .collect()
}

/// Split into contiguous groups, oldest first, breaking wherever consecutive
/// timestamps are more than `max_gap` apart
pub fn partition_by_gap(messages: &[Message], max_gap: Duration) -> Vec<Vec<Message>> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by_key(|m| m.timestamp);

    let mut groups: Vec<Vec<Message>> = Vec::new();
    let mut current: Vec<Message> = Vec::new();

    for message in sorted {
        if let Some(previous) = current.last() {
            if message.timestamp - previous.timestamp > max_gap {
                groups.push(std::mem::take(&mut current));
            }
        }
        current.push(message.clone());
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
