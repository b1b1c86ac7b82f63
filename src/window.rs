use std::collections::VecDeque;

use crate::models::{Channel, Reading};

/// Default number of samples kept, about two minutes at a two second tick.
pub const DEFAULT_CAPACITY: usize = 60;

/// Fixed-capacity ring of recent readings in push order, oldest first.
///
/// Order comes from insertion alone. Timestamps are wall-clock and may step
/// backwards when the system clock is adjusted; they are never used to sort.
#[derive(Clone, Debug)]
pub struct SampleWindow {
    capacity: usize,
    readings: VecDeque<Reading>,
}

impl SampleWindow {
    /// A capacity of zero is bumped to one so the latest reading is always
    /// kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a reading, evicting the oldest one when full.
    pub fn push(&mut self, reading: Reading) {
        self.readings.push_back(reading);
        if self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    pub fn snapshot(&self) -> impl DoubleEndedIterator<Item = &Reading> + ExactSizeIterator + '_ {
        self.readings.iter()
    }

    /// One scalar field across all held readings, preserving order and
    /// absence.
    pub fn channel(&self, channel: Channel) -> Vec<Option<i32>> {
        self.readings.iter().map(|r| r.value(channel)).collect()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn oldest(&self) -> Option<&Reading> {
        self.readings.front()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Vendor;

    fn load(value: i32) -> Reading {
        let mut reading = Reading::new(Vendor::Nvidia);
        reading.gpu_load = Some(value);
        reading
    }

    #[test]
    fn keeps_the_last_n_in_push_order() {
        for capacity in [1, 2, 5, 60] {
            let mut window = SampleWindow::new(capacity);
            for i in 0..150 {
                window.push(load(i));
                assert!(window.len() <= capacity);
            }
            let held: Vec<i32> = window.snapshot().filter_map(|r| r.gpu_load).collect();
            let expected: Vec<i32> = (150 - capacity as i32..150).collect();
            assert_eq!(held, expected);
        }
    }

    #[test]
    fn partial_window_holds_everything() {
        let mut window = SampleWindow::default();
        window.push(load(1));
        window.push(load(2));
        assert_eq!(window.len(), 2);
        assert_eq!(window.capacity(), DEFAULT_CAPACITY);
        assert_eq!(window.oldest().and_then(|r| r.gpu_load), Some(1));
        assert_eq!(window.latest().and_then(|r| r.gpu_load), Some(2));
    }

    #[test]
    fn channel_preserves_absence() {
        let mut window = SampleWindow::new(4);
        window.push(load(10));
        window.push(Reading::unknown());
        window.push(load(30));
        assert_eq!(
            window.channel(Channel::GpuLoad),
            vec![Some(10), None, Some(30)]
        );
        assert_eq!(window.channel(Channel::Temperature), vec![None, None, None]);
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let mut window = SampleWindow::new(0);
        window.push(load(1));
        window.push(load(2));
        assert_eq!(window.len(), 1);
        assert_eq!(window.latest().and_then(|r| r.gpu_load), Some(2));
    }

    #[test]
    fn push_order_wins_over_timestamps() {
        let mut window = SampleWindow::new(10);
        let now = chrono::Utc::now();
        for i in 0..20 {
            let mut reading = load(i);
            // clock stepped back by a minute halfway through
            let offset = if i < 15 { i64::from(i) } else { i64::from(i) - 60 };
            reading.timestamp = now + chrono::Duration::seconds(offset);
            window.push(reading);
        }
        let loads: Vec<_> = window.snapshot().map(|r| r.gpu_load).collect();
        assert_eq!(loads, (10..20).map(Some).collect::<Vec<_>>());
        let stamps: Vec<_> = window.snapshot().map(|r| r.timestamp).collect();
        assert!(stamps[5] < stamps[4]);
    }
}
