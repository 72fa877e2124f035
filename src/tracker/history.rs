//! Per-identity track history: the latest box and a bounded queue of recent
//! appearance histograms.

use std::collections::{BTreeMap, VecDeque};

use crate::tracker::detection::{Detection, Histogram};

/// History of one identity.
#[derive(Debug, Clone)]
pub struct TrackEntry {
    /// Most recent detection assigned to this identity
    pub latest: Detection,
    /// Recent histograms, oldest first
    histograms: VecDeque<Histogram>,
    /// Frame of the first assignment
    pub first_seen: u32,
    /// Number of frames this identity was assigned in
    pub hits: u32,
}

impl TrackEntry {
    fn new(detection: Detection, histogram: Histogram, max_histos: usize) -> Self {
        let mut histograms = VecDeque::with_capacity(max_histos);
        histograms.push_back(histogram);
        Self {
            first_seen: detection.frame,
            latest: detection,
            histograms,
            hits: 1,
        }
    }

    /// Frame in which this identity was last assigned.
    pub fn last_seen(&self) -> u32 {
        self.latest.frame
    }

    pub fn histograms(&self) -> impl Iterator<Item = &Histogram> {
        self.histograms.iter()
    }

    pub fn histogram_count(&self) -> usize {
        self.histograms.len()
    }

    /// Whether this entry is too old to be matched in `frame`.
    pub fn is_aged(&self, frame: u32, max_age: u32) -> bool {
        (self.last_seen() as i64) < frame as i64 - max_age as i64
    }
}

/// Store of every identity seen in one video, ordered by identity.
///
/// Entries are never removed; an entry that stops being matched simply ages.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    entries: BTreeMap<u64, TrackEntry>,
    max_histos: usize,
}

impl TrackHistory {
    pub fn new(max_histos: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_histos: max_histos.max(1),
        }
    }

    pub fn max_histos(&self) -> usize {
        self.max_histos
    }

    /// Record `detection` and `histogram` as the newest observation of `id`.
    ///
    /// The histogram queue keeps at most `max_histos` entries, evicting the
    /// oldest first.
    pub fn update(&mut self, id: u64, detection: Detection, histogram: Histogram) {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.latest = detection;
                entry.hits += 1;
                entry.histograms.push_back(histogram);
                while entry.histograms.len() > self.max_histos {
                    entry.histograms.pop_front();
                }
            }
            None => {
                self.entries
                    .insert(id, TrackEntry::new(detection, histogram, self.max_histos));
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<&TrackEntry> {
        self.entries.get(&id)
    }

    /// Entries in ascending identity order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &TrackEntry)> {
        self.entries.iter().map(|(&id, entry)| (id, entry))
    }

    /// Entries still eligible for matching in `frame`.
    pub fn live(&self, frame: u32, max_age: u32) -> impl Iterator<Item = (u64, &TrackEntry)> {
        self.iter().filter(move |(_, e)| !e.is_aged(frame, max_age))
    }

    /// Whether `id` was assigned in exactly `frame`.
    pub fn seen_at(&self, id: u64, frame: u32) -> bool {
        self.entries.get(&id).is_some_and(|e| e.last_seen() == frame)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
