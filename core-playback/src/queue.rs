//! # Play Queue
//!
//! Ordered list of tracks with a cursor and a version counter.
//!
//! Every structural mutation bumps `version`. The preload cache stamps its
//! entries with the version they were last validated against, so a stale
//! stamp means "not yet checked against the current window". Moving the
//! cursor is not a mutation.

use crate::track::TrackId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The engine's play queue. Owned by the engine actor.
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    tracks: Vec<TrackId>,
    cursor: Option<usize>,
    version: u64,
}

/// Read-only copy of the queue handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub tracks: Vec<TrackId>,
    pub cursor: Option<usize>,
    pub version: u64,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[TrackId] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&TrackId> {
        self.tracks.get(index)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Track under the cursor.
    pub fn current(&self) -> Option<&TrackId> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Replace the whole queue. The cursor is cleared.
    pub fn replace(&mut self, tracks: Vec<TrackId>) -> u64 {
        self.tracks = tracks;
        self.cursor = None;
        self.bump()
    }

    /// Append tracks at the end.
    pub fn enqueue(&mut self, tracks: impl IntoIterator<Item = TrackId>) -> u64 {
        self.tracks.extend(tracks);
        self.bump()
    }

    /// Insert a track before `index` (clamped to the queue length). The
    /// cursor keeps pointing at the same track.
    pub fn insert(&mut self, index: usize, track: TrackId) -> u64 {
        let index = index.min(self.tracks.len());
        self.tracks.insert(index, track);
        if let Some(cursor) = self.cursor.as_mut() {
            if *cursor >= index {
                *cursor += 1;
            }
        }
        self.bump()
    }

    /// Remove the track at `index`.
    ///
    /// Removing the track under the cursor moves the cursor back one slot,
    /// so `next` continues with the track that followed the removed one.
    /// Out-of-range indexes change nothing and do not bump the version.
    pub fn remove(&mut self, index: usize) -> Option<(TrackId, u64)> {
        if index >= self.tracks.len() {
            return None;
        }
        let removed = self.tracks.remove(index);
        self.cursor = match self.cursor {
            Some(cursor) if cursor > index => Some(cursor - 1),
            Some(cursor) if cursor == index => index.checked_sub(1),
            other => other,
        };
        Some((removed, self.bump()))
    }

    pub fn clear(&mut self) -> u64 {
        self.tracks.clear();
        self.cursor = None;
        self.bump()
    }

    /// Move the cursor. Returns `false` if `index` is out of range or the
    /// cursor is already there.
    pub fn set_cursor(&mut self, index: usize) -> bool {
        if index >= self.tracks.len() || self.cursor == Some(index) {
            return false;
        }
        self.cursor = Some(index);
        true
    }

    /// First position of `track`, preferring the cursor itself and then
    /// entries after it.
    pub fn position_of(&self, track: &TrackId) -> Option<usize> {
        let start = self.cursor.unwrap_or(0).min(self.tracks.len());
        self.tracks[start..]
            .iter()
            .position(|t| t == track)
            .map(|offset| start + offset)
            .or_else(|| self.tracks[..start].iter().position(|t| t == track))
    }

    /// Index `next` would play. With no cursor this is the head of the queue.
    pub fn next_index(&self) -> Option<usize> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.tracks.len() => Some(cursor + 1),
            Some(_) => None,
            None if !self.tracks.is_empty() => Some(0),
            None => None,
        }
    }

    pub fn previous_index(&self) -> Option<usize> {
        self.cursor.and_then(|cursor| cursor.checked_sub(1))
    }

    /// Upcoming tracks eligible for preloading: everything after the
    /// cursor (or the whole queue without one), duplicates removed, at most
    /// `size` entries.
    pub fn window(&self, size: usize) -> Vec<TrackId> {
        let start = self.cursor.map_or(0, |cursor| cursor + 1).min(self.tracks.len());
        let mut seen = HashSet::new();
        self.tracks[start..]
            .iter()
            .filter(|track| seen.insert(*track))
            .take(size)
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.tracks.clone(),
            cursor: self.cursor,
            version: self.version,
        }
    }
}
