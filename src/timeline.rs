use std::{collections::{VecDeque, vec_deque}, error::Error, fmt::Display};
use crate::debug::MemoryUse;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineError {
    /// Entries can only age forward by a finite amount
    InvalidTick(f64),
}

impl Display for TimelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTick(dt) => write!(f, "cannot age a timeline by {}", dt),
        }
    }
}

impl Error for TimelineError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineEntry<T> {
    /// Proper time elapsed since the snapshot was captured
    pub age: f64,
    pub snapshot: T,
}

/// Bounded history of past values of some component
///
/// Entries are kept youngest first. Every tick ages the stored entries, drops the ones older than the
/// retention window, then records the current value at age zero. Ages only ever grow by the same
/// amount for every entry, so the oldest entries are always at the back
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    entries: VecDeque<TimelineEntry<T>>,
    retention_window: f64,
}

impl<T> Timeline<T> {
    /// Creates an empty timeline. A negative or non-finite window is treated as zero
    pub fn new(retention_window: f64) -> Self {
        let retention_window = if retention_window.is_finite() && retention_window > 0.0 {
            retention_window
        } else {
            0.0
        };

        Timeline {
            entries: VecDeque::new(),
            retention_window,
        }
    }

    pub fn retention_window(&self) -> f64 {
        self.retention_window
    }

    /// Ages every entry by `dt`, evicts whatever fell out of the retention window and records
    /// `snapshot` at age zero. Returns the number of evicted entries
    ///
    /// Aging happens before the new entry is inserted, so a freshly recorded snapshot always survives
    /// its own tick, even with a zero-length window. A negative or non-finite `dt` leaves the timeline untouched
    pub fn advance(&mut self, dt: f64, snapshot: T) -> Result<usize, TimelineError> {
        let evicted = self.age_by(dt)?;
        self.entries.push_front(TimelineEntry { age: 0.0, snapshot });
        Ok(evicted)
    }

    /// Ages every entry by `dt` and evicts whatever fell out of the window, without recording anything
    pub fn age_by(&mut self, dt: f64) -> Result<usize, TimelineError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(TimelineError::InvalidTick(dt))
        }

        for entry in self.entries.iter_mut() {
            entry.age += dt;
        }

        let mut evicted = 0;
        while let Some(oldest) = self.entries.back() {
            if oldest.age > self.retention_window {
                self.entries.pop_back();
                evicted += 1;
            } else {
                break
            }
        }
        Ok(evicted)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in non-decreasing age order
    pub fn iter(&self) -> vec_deque::Iter<'_, TimelineEntry<T>> {
        self.entries.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&TimelineEntry<T>> {
        self.entries.get(idx)
    }

    pub fn newest(&self) -> Option<&TimelineEntry<T>> {
        self.entries.front()
    }

    pub fn oldest(&self) -> Option<&TimelineEntry<T>> {
        self.entries.back()
    }

    /// The value that was current `age` ago: the youngest entry at least that old
    pub fn at_age(&self, age: f64) -> Option<&TimelineEntry<T>> {
        self.entries.iter().find(|entry| entry.age >= age)
    }

    /// The pair of neighbouring entries `(younger, older)` with `younger.age <= age <= older.age`
    pub fn bracket(&self, age: f64) -> Option<(&TimelineEntry<T>, &TimelineEntry<T>)> {
        let older_idx = self.entries.iter().position(|entry| entry.age >= age)?;
        let older = &self.entries[older_idx];

        if older_idx == 0 {
            Some((older, older))
        } else {
            Some((&self.entries[older_idx - 1], older))
        }
    }
}

impl<'a, T> IntoIterator for &'a Timeline<T> {
    type Item = &'a TimelineEntry<T>;
    type IntoIter = vec_deque::Iter<'a, TimelineEntry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T> MemoryUse for Timeline<T> {
    fn memory_use_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + self.entries.capacity() * std::mem::size_of::<TimelineEntry<T>>()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ages<T>(timeline: &Timeline<T>) -> Vec<f64> {
        timeline.iter().map(|entry| entry.age).collect()
    }

    #[test]
    fn window_eviction() {
        let mut timeline = Timeline::new(10.0);

        assert_eq!(Ok(0), timeline.advance(4.0, 'a'));
        assert_eq!(Ok(0), timeline.advance(4.0, 'b'));
        assert_eq!(Ok(0), timeline.advance(4.0, 'c'));
        assert_eq!(vec![0.0, 4.0, 8.0], ages(&timeline));
        assert_eq!(Some('a'), timeline.oldest().map(|entry| entry.snapshot));

        assert_eq!(Ok(1), timeline.advance(4.0, 'd'));
        assert_eq!(vec![0.0, 4.0, 8.0], ages(&timeline));
        assert_eq!(vec!['d', 'c', 'b'], timeline.iter().map(|entry| entry.snapshot).collect::<Vec<_>>());
    }

    #[test]
    fn entry_exactly_at_window_is_kept() {
        let mut timeline = Timeline::new(8.0);
        for snapshot in 0..3 {
            timeline.advance(4.0, snapshot).unwrap();
        }
        assert_eq!(Some(8.0), timeline.oldest().map(|entry| entry.age));
        assert_eq!(3, timeline.len());
    }

    #[test]
    fn bounded_and_ordered_under_uneven_ticks() {
        let mut timeline = Timeline::new(5.0);
        let deltas = [0.5, 2.0, 0.0, 3.25, 1.0, 0.125, 4.0, 6.0, 0.75, 1.5];

        for (i, dt) in deltas.iter().cycle().take(200).enumerate() {
            timeline.advance(*dt, i).unwrap();

            let ages = ages(&timeline);
            assert!(ages.iter().all(|age| *age <= timeline.retention_window()));
            assert!(ages.windows(2).all(|pair| pair[0] <= pair[1]));
            assert_eq!(0.0, ages[0]);
        }
    }

    #[test]
    fn zero_window_keeps_only_the_newest() {
        let mut timeline = Timeline::new(0.0);
        assert_eq!(Ok(0), timeline.advance(1.0, 1));
        assert_eq!(Ok(1), timeline.advance(1.0, 2));
        assert_eq!(1, timeline.len());
        assert_eq!(Some(2), timeline.newest().map(|entry| entry.snapshot));

        // zero-length ticks do not age anything out
        assert_eq!(Ok(0), timeline.advance(0.0, 3));
        assert_eq!(2, timeline.len());
    }

    #[test]
    fn bad_ticks_leave_entries_untouched() {
        let mut timeline = Timeline::new(10.0);
        timeline.advance(1.0, 'a').unwrap();
        timeline.advance(1.0, 'b').unwrap();

        assert!(timeline.advance(f64::NAN, 'x').is_err());
        assert_eq!(Err(TimelineError::InvalidTick(-3.0)), timeline.advance(-3.0, 'x'));
        assert!(timeline.age_by(f64::INFINITY).is_err());
        assert_eq!(vec![0.0, 1.0], ages(&timeline));

        // eviction still works afterwards
        for _ in 0..50 {
            timeline.advance(1.0, 'c').unwrap();
        }
        assert_eq!(11, timeline.len());
        assert_eq!(Some(10.0), timeline.oldest().map(|entry| entry.age));
    }

    #[test]
    fn invalid_window_is_zero() {
        assert_eq!(0.0, Timeline::<u8>::new(-3.0).retention_window());
        assert_eq!(0.0, Timeline::<u8>::new(f64::NAN).retention_window());
    }

    #[test]
    fn lookup_by_age() {
        let mut timeline = Timeline::new(10.0);
        for snapshot in 0..4 {
            timeline.advance(2.0, snapshot).unwrap();
        }
        // ages: 0 -> 3, 2 -> 2, 4 -> 1, 6 -> 0

        assert_eq!(Some(3), timeline.at_age(0.0).map(|entry| entry.snapshot));
        assert_eq!(Some(2), timeline.at_age(1.5).map(|entry| entry.snapshot));
        assert_eq!(Some(0), timeline.at_age(6.0).map(|entry| entry.snapshot));
        assert!(timeline.at_age(6.5).is_none());

        let (younger, older) = timeline.bracket(3.0).unwrap();
        assert_eq!((2.0, 4.0), (younger.age, older.age));

        let (younger, older) = timeline.bracket(0.0).unwrap();
        assert_eq!((3, 3), (younger.snapshot, older.snapshot));
    }
}
