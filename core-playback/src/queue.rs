//! # Play Queue
//!
//! An ordered, mutable list of playable items plus a current-position
//! cursor. Navigation is clamped: advancing past the tail reports
//! [`Advance::EndOfQueue`] instead of failing, and stepping back from the
//! head reports [`Previous::RestartCurrent`] so the engine can reset the
//! elapsed position, matching the usual media-player convention.
//!
//! The queue is a pure data structure; the engine that owns it publishes
//! `QueueEvent::Changed` after every successful mutation, before any
//! dependent play command.

use crate::error::{EngineError, Result};
use core_catalog::{Track, TrackId};

/// A track plus its queue-local state.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    /// The underlying catalog track.
    pub track: Track,
    /// 0-based position, stable until the next `replace`.
    pub index: usize,
}

/// Outcome of [`Queue::next`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Cursor moved to this entry.
    Moved(QueueEntry),
    /// Already at the last entry (or the queue is empty); cursor unchanged.
    EndOfQueue,
}

/// Outcome of [`Queue::previous`].
#[derive(Debug, Clone, PartialEq)]
pub enum Previous {
    /// Cursor moved to this entry.
    Moved(QueueEntry),
    /// Already at the first entry; the current track restarts instead.
    RestartCurrent,
}

/// Ordered sequence of [`QueueEntry`] with a current-position cursor.
///
/// Invariant: the cursor is `None` exactly when the queue is empty, and
/// always within bounds otherwise.
#[derive(Debug, Default)]
pub struct Queue {
    entries: Vec<QueueEntry>,
    cursor: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue content and position the cursor.
    ///
    /// The cursor lands on the entry matching `start_id`, or 0 when the id
    /// is absent or unmatched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyQueue`] when `tracks` is empty and a
    /// `start_id` was given; replacing with an empty list and no start id
    /// simply clears the queue.
    pub fn replace(&mut self, tracks: Vec<Track>, start_id: Option<&TrackId>) -> Result<()> {
        if tracks.is_empty() && start_id.is_some() {
            return Err(EngineError::EmptyQueue);
        }

        self.entries = tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| QueueEntry { track, index })
            .collect();

        self.cursor = if self.entries.is_empty() {
            None
        } else {
            let start = start_id
                .and_then(|id| self.entries.iter().position(|e| &e.track.id == id))
                .unwrap_or(0);
            Some(start)
        };

        Ok(())
    }

    /// Move the cursor forward by one, clamped at the tail.
    pub fn next(&mut self) -> Advance {
        match self.cursor {
            Some(i) if i + 1 < self.entries.len() => {
                self.cursor = Some(i + 1);
                Advance::Moved(self.entries[i + 1].clone())
            }
            _ => Advance::EndOfQueue,
        }
    }

    /// Move the cursor back by one; at index 0 the cursor stays put and
    /// the caller restarts the current track.
    pub fn previous(&mut self) -> Previous {
        match self.cursor {
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                Previous::Moved(self.entries[i - 1].clone())
            }
            _ => Previous::RestartCurrent,
        }
    }

    /// The entry at the cursor, if any.
    pub fn current(&self) -> Option<&QueueEntry> {
        self.cursor.map(|i| &self.entries[i])
    }

    /// Current cursor position.
    pub fn current_index(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries and the cursor.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track::new(id, format!("Title {}", id), format!("https://cdn.example.org/{}.mp3", id))
    }

    #[test]
    fn replace_positions_cursor_on_start_id() {
        let mut queue = Queue::new();
        queue
            .replace(vec![track("a"), track("b"), track("c")], Some(&TrackId::new("b")))
            .unwrap();

        assert_eq!(queue.current_index(), Some(1));
        assert_eq!(queue.current().unwrap().track.id.as_str(), "b");
    }

    #[test]
    fn replace_falls_back_to_first_entry() {
        let mut queue = Queue::new();
        queue
            .replace(vec![track("a"), track("b")], Some(&TrackId::new("zzz")))
            .unwrap();

        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn replace_empty_with_start_id_is_an_error() {
        let mut queue = Queue::new();
        let result = queue.replace(Vec::new(), Some(&TrackId::new("a")));
        assert!(matches!(result, Err(EngineError::EmptyQueue)));
    }

    #[test]
    fn replace_empty_without_start_id_clears() {
        let mut queue = Queue::new();
        queue.replace(vec![track("a")], None).unwrap();
        queue.replace(Vec::new(), None).unwrap();

        assert!(queue.is_empty());
        assert_eq!(queue.current(), None);
    }

    #[test]
    fn cursor_always_valid_after_replace() {
        let mut queue = Queue::new();
        for count in 1..5 {
            let tracks: Vec<_> = (0..count).map(|i| track(&format!("t{}", i))).collect();
            queue.replace(tracks, None).unwrap();
            let index = queue.current_index().unwrap();
            assert!(index < queue.len());
        }
    }

    #[test]
    fn next_at_tail_reports_end_of_queue() {
        let mut queue = Queue::new();
        queue.replace(vec![track("a"), track("b")], None).unwrap();

        assert!(matches!(queue.next(), Advance::Moved(_)));
        assert_eq!(queue.next(), Advance::EndOfQueue);
        // Cursor stays on the last entry.
        assert_eq!(queue.current_index(), Some(1));
    }

    #[test]
    fn next_on_empty_queue_reports_end_of_queue() {
        let mut queue = Queue::new();
        assert_eq!(queue.next(), Advance::EndOfQueue);
    }

    #[test]
    fn previous_at_head_restarts_current() {
        let mut queue = Queue::new();
        queue.replace(vec![track("a"), track("b")], None).unwrap();

        assert_eq!(queue.previous(), Previous::RestartCurrent);
        assert_eq!(queue.current_index(), Some(0));

        queue.next();
        let moved = queue.previous();
        assert!(matches!(moved, Previous::Moved(ref e) if e.track.id.as_str() == "a"));
    }

    #[test]
    fn entry_indexes_are_stable() {
        let mut queue = Queue::new();
        queue
            .replace(vec![track("a"), track("b"), track("c")], None)
            .unwrap();

        queue.next();
        queue.next();
        assert_eq!(queue.current().unwrap().index, 2);
    }
}
