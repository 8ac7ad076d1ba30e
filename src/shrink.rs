// The shrink-pass catalogue: a fixed-order sweep of local transformations
// tried against the current interesting buffer, re-run to a fixed point.
// Every pass proposes candidates through `Engine::incorporate_new_buffer`,
// which is the only place that decides whether a candidate sticks.

use crate::engine::Engine;
use crate::errors::{DrawResult, ShrinkResult};
use crate::status::Status;

fn safe_slice(buffer: &[u8], lo: usize, hi: usize) -> &[u8] {
    if lo < hi {
        &buffer[lo..hi]
    } else {
        &[]
    }
}

impl<F> Engine<F>
where
    F: FnMut(&mut crate::data::TestData) -> DrawResult<()>,
{
    /// Runs every pass below to a sweep fixed point: repeat the whole
    /// catalogue until one full pass through it makes no further change, or
    /// until the shrink budget runs out.
    pub(crate) fn shrink(&mut self) -> ShrinkResult<()> {
        assert_eq!(self.last_data.status(), Status::Interesting);
        let mut change_counter: Option<u64> = None;
        loop {
            if change_counter == Some(self.changed) {
                break;
            }
            change_counter = Some(self.changed);

            self.delete_intervals_to_fixpoint()?;
            self.sort_interval_bytes()?;
            self.zero_window()?;
            self.reduce_single_bytes()?;
            self.swap_adjacent_descending_bytes()?;

            if self.changed > change_counter.unwrap() {
                continue;
            }

            self.borrow_from_left()?;

            if self.changed > change_counter.unwrap() {
                continue;
            }

            self.reduce_equal_byte_pairs()?;

            if self.changed > change_counter.unwrap() {
                continue;
            }

            self.order_and_decrement_pairs()?;
        }
        Ok(())
    }

    /// Repeatedly tries deleting each recorded example interval outright,
    /// re-reading the (shrinking) interval list each sweep, until a full
    /// sweep deletes nothing.
    fn delete_intervals_to_fixpoint(&mut self) -> ShrinkResult<()> {
        let mut interval_change_counter: Option<u64> = None;
        while interval_change_counter != Some(self.changed) {
            interval_change_counter = Some(self.changed);
            let mut i = 0;
            loop {
                let len = self.last_data.intervals().len();
                if i >= len {
                    break;
                }
                let interval = self.last_data.intervals()[i];
                let buffer = self.last_data.buffer();
                let mut candidate = Vec::with_capacity(buffer.len());
                candidate.extend_from_slice(&buffer[..interval.start]);
                candidate.extend_from_slice(&buffer[interval.end..]);
                if !self.incorporate_new_buffer(candidate)? {
                    i += 1;
                }
            }
        }
        Ok(())
    }

    /// Proposes replacing each interval's bytes with themselves sorted
    /// ascending. Sorting can't un-satisfy a length-sensitive test, so this
    /// never needs to retry past a rejection.
    fn sort_interval_bytes(&mut self) -> ShrinkResult<()> {
        let mut i = 0;
        loop {
            let len = self.last_data.intervals().len();
            if i >= len {
                break;
            }
            let interval = self.last_data.intervals()[i];
            let buffer = self.last_data.buffer();
            let mut sorted = buffer[interval.start..interval.end].to_vec();
            sorted.sort_unstable();
            let mut candidate = Vec::with_capacity(buffer.len());
            candidate.extend_from_slice(&buffer[..interval.start]);
            candidate.extend_from_slice(&sorted);
            candidate.extend_from_slice(&buffer[interval.end..]);
            self.incorporate_new_buffer(candidate)?;
            i += 1;
        }
        Ok(())
    }

    /// Slides an 8-byte all-zero window across the buffer, ignoring the
    /// final short window that wouldn't fully fit (matching the window
    /// count of a plain `buffer.len() - 8` range).
    fn zero_window(&mut self) -> ShrinkResult<()> {
        const WINDOW: usize = 8;
        let len = self.last_data.buffer().len();
        if len <= WINDOW {
            return Ok(());
        }
        for i in 0..(len - WINDOW) {
            let buffer = self.last_data.buffer();
            if i + WINDOW > buffer.len() {
                break;
            }
            let mut candidate = Vec::with_capacity(buffer.len());
            candidate.extend_from_slice(&buffer[..i]);
            candidate.extend_from_slice(&[0u8; WINDOW]);
            candidate.extend_from_slice(&buffer[i + WINDOW..]);
            self.incorporate_new_buffer(candidate)?;
        }
        Ok(())
    }

    /// For each byte, first tries deleting it outright. Failing that, tries
    /// every smaller value in turn, and for each one also tries pairing it
    /// with a freshly randomized tail in case the rest of the buffer is what
    /// was actually blocking the shrink.
    fn reduce_single_bytes(&mut self) -> ShrinkResult<()> {
        let mut i = 0;
        loop {
            let len = self.last_data.buffer().len();
            if i >= len {
                break;
            }
            let buffer = self.last_data.buffer().to_vec();
            let mut deletion = Vec::with_capacity(buffer.len() - 1);
            deletion.extend_from_slice(&buffer[..i]);
            deletion.extend_from_slice(&buffer[i + 1..]);
            if !self.incorporate_new_buffer(deletion)? {
                let ceiling = buffer[i];
                for c in 0..ceiling {
                    let mut replaced = buffer.clone();
                    replaced[i] = c;
                    if self.incorporate_new_buffer(replaced)? {
                        break;
                    }
                    let tail_len = buffer.len() - i - 1;
                    let mut re_randomized = Vec::with_capacity(buffer.len());
                    re_randomized.extend_from_slice(&buffer[..i]);
                    re_randomized.push(c);
                    re_randomized.extend_from_slice(&self.rand.bytes(tail_len));
                    if self.incorporate_new_buffer(re_randomized)? {
                        break;
                    }
                }
            }
            i += 1;
        }
        Ok(())
    }

    /// Swaps any adjacent pair that's out of ascending order.
    fn swap_adjacent_descending_bytes(&mut self) -> ShrinkResult<()> {
        let mut i = 0;
        loop {
            let len = self.last_data.buffer().len();
            if i + 1 >= len {
                break;
            }
            let buffer = self.last_data.buffer();
            if buffer[i] > buffer[i + 1] {
                let mut candidate = buffer.to_vec();
                candidate.swap(i, i + 1);
                self.incorporate_new_buffer(candidate)?;
            }
            i += 1;
        }
        Ok(())
    }

    /// When a byte can't be deleted and is already zero, walks left looking
    /// for a nonzero byte to borrow one unit from, wrapping the borrowed
    /// span up to 0xFF.
    fn borrow_from_left(&mut self) -> ShrinkResult<()> {
        let mut i = 0;
        loop {
            let len = self.last_data.buffer().len();
            if i >= len {
                break;
            }
            let buffer = self.last_data.buffer().to_vec();
            let mut deletion = Vec::with_capacity(buffer.len().saturating_sub(1));
            deletion.extend_from_slice(&buffer[..i]);
            deletion.extend_from_slice(&buffer[i + 1..]);
            if !self.incorporate_new_buffer(deletion)? && buffer[i] == 0 {
                let mut j = i;
                while j > 0 {
                    if buffer[j] > 0 {
                        let mut candidate = Vec::with_capacity(buffer.len());
                        candidate.extend_from_slice(&buffer[..j]);
                        candidate.push(buffer[j] - 1);
                        candidate.extend(std::iter::repeat(0xFFu8).take(i - j));
                        candidate.extend_from_slice(&buffer[i + 1..]);
                        self.incorporate_new_buffer(candidate)?;
                        break;
                    }
                    j -= 1;
                }
            }
            i += 1;
        }
        Ok(())
    }

    /// Bucketing every index by its byte value, then for each pair of equal
    /// bytes within a bucket, tries a paired borrow (if both are zero) or a
    /// paired decrement down toward zero (if both are positive).
    fn reduce_equal_byte_pairs(&mut self) -> ShrinkResult<()> {
        let snapshot = self.last_data.buffer().to_vec();
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); 256];
        for (index, &byte) in snapshot.iter().enumerate() {
            buckets[byte as usize].push(index);
        }
        let mut pairs = Vec::new();
        for bucket in &buckets {
            if bucket.len() > 1 {
                for a in 0..bucket.len() {
                    for b in (a + 1)..bucket.len() {
                        pairs.push((bucket[a], bucket[b]));
                    }
                }
            }
        }

        for (j, k) in pairs {
            let buffer = self.last_data.buffer().to_vec();
            if k >= buffer.len() || buffer[j] != buffer[k] {
                continue;
            }
            let value = buffer[j];

            if value == 0 && j > 0 && buffer[j - 1] > 0 && buffer[k - 1] > 0 {
                let mut candidate = Vec::with_capacity(buffer.len());
                candidate.extend_from_slice(&buffer[..j - 1]);
                candidate.push(buffer[j - 1] - 1);
                candidate.push(0xFF);
                candidate.extend_from_slice(safe_slice(&buffer, j + 1, k - 1));
                candidate.push(buffer[k - 1] - 1);
                candidate.push(0xFF);
                candidate.extend_from_slice(&buffer[k + 1..]);
                self.incorporate_new_buffer(candidate)?;
            }

            if value > 0 {
                let mut candidate = Vec::with_capacity(buffer.len());
                candidate.extend_from_slice(&buffer[..j]);
                candidate.push(value - 1);
                candidate.extend_from_slice(&buffer[j + 1..k]);
                candidate.push(value - 1);
                candidate.extend_from_slice(&buffer[k + 1..]);
                if self.incorporate_new_buffer(candidate)? {
                    for d in 0..value - 1 {
                        let buffer = self.last_data.buffer().to_vec();
                        if k >= buffer.len() {
                            break;
                        }
                        let mut candidate = Vec::with_capacity(buffer.len());
                        candidate.extend_from_slice(&buffer[..j]);
                        candidate.push(d);
                        candidate.extend_from_slice(&buffer[j + 1..k]);
                        candidate.push(d);
                        candidate.extend_from_slice(&buffer[k + 1..]);
                        self.incorporate_new_buffer(candidate)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// For every pair of positions where the left byte is nonzero: swaps
    /// them into ascending order, then tries decrementing both by one.
    fn order_and_decrement_pairs(&mut self) -> ShrinkResult<()> {
        let initial_len = self.last_data.buffer().len();
        for j in 0..initial_len {
            let buffer = self.last_data.buffer();
            if j >= buffer.len() {
                break;
            }
            if buffer[j] == 0 {
                continue;
            }
            let current_len = buffer.len();
            for k in (j + 1)..current_len {
                let buffer = self.last_data.buffer().to_vec();
                if k >= buffer.len() {
                    break;
                }
                if buffer[j] > buffer[k] {
                    let mut candidate = Vec::with_capacity(buffer.len());
                    candidate.extend_from_slice(&buffer[..j]);
                    candidate.push(buffer[k]);
                    candidate.extend_from_slice(&buffer[j + 1..k]);
                    candidate.push(buffer[j]);
                    candidate.extend_from_slice(&buffer[k + 1..]);
                    self.incorporate_new_buffer(candidate)?;
                }

                let buffer = self.last_data.buffer().to_vec();
                if k >= buffer.len() {
                    break;
                }
                if buffer[j] > 0 && buffer[k] > 0 {
                    let mut candidate = Vec::with_capacity(buffer.len());
                    candidate.extend_from_slice(&buffer[..j]);
                    candidate.push(buffer[j] - 1);
                    candidate.extend_from_slice(&buffer[j + 1..k]);
                    candidate.push(buffer[k] - 1);
                    candidate.extend_from_slice(&buffer[k + 1..]);
                    self.incorporate_new_buffer(candidate)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{find_interesting_buffer, Settings};

    #[test]
    fn deletes_an_unused_suffix() {
        let result = find_interesting_buffer(
            |data| {
                let prefix = data.draw_bytes(2)?;
                assert!(prefix != vec![9, 9], "found it");
                Ok(())
            },
            None,
        );
        assert_eq!(result, Some(vec![9, 9]));
    }

    #[test]
    fn shrinks_two_equal_nonzero_bytes_toward_one() {
        let result = find_interesting_buffer(
            |data| {
                let bytes = data.draw_bytes(2)?;
                assert!(!(bytes[0] == bytes[1] && bytes[0] > 0), "found equal nonzero bytes");
                Ok(())
            },
            None,
        );
        assert_eq!(result, Some(vec![1, 1]));
    }

    #[test]
    fn shrink_never_exceeds_the_configured_budget() {
        // A pathological property that keeps the buffer interesting at any
        // length forces every shrink pass to keep proposing candidates;
        // the run must still terminate once `max_shrinks` is spent.
        let result = find_interesting_buffer(
            |_data| panic!("always interesting"),
            Some(Settings {
                buffer_size: 256,
                max_shrinks: 5,
                ..Settings::default()
            }),
        );
        assert!(result.is_some());
    }

    #[test]
    fn accepted_shrink_transitions_never_exceed_max_shrinks() {
        let settings = Settings {
            buffer_size: 256,
            max_shrinks: 5,
            ..Settings::default()
        };
        let mut engine = Engine::new(
            |_data: &mut crate::data::TestData| -> DrawResult<()> { panic!("always interesting") },
            settings.clone(),
        );
        engine.run();
        assert_eq!(engine.last_data.status(), Status::Interesting);
        assert!(
            engine.shrinks <= settings.max_shrinks,
            "accepted {} shrink transitions against a budget of {}",
            engine.shrinks,
            settings.max_shrinks
        );
    }
}
