// Produces a fresh candidate buffer from an existing, frozen TestData,
// biased toward perturbing one of its recorded example intervals. Never
// executes the test itself — it's a pure function of randomness and `data`.

use crate::data::TestData;
use crate::random::RandomSource;
use crate::status::Status;

pub fn mutate_to_new_buffer(data: &TestData, rand: &mut RandomSource) -> Vec<u8> {
    let n = data.buffer().len().min(data.index());
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return rand.bytes(1);
    }

    if data.status() == Status::Overrun {
        // Nudge every byte toward something smaller, since the buffer as
        // drawn couldn't even be read to completion.
        let buffer = data.buffer();
        let mut result = Vec::with_capacity(buffer.len());
        for &c in buffer {
            result.push(match rand.below(3) {
                0 => 0,
                1 => {
                    if c == 0 {
                        0
                    } else {
                        rand.below(c as usize + 1) as u8
                    }
                }
                _ => c,
            });
        }
        return result;
    }

    let buffer = data.buffer();
    let intervals = data.intervals();
    let probe = rand.byte();

    if probe <= 100 || intervals.len() <= 1 {
        let (u, v) = if rand.coin_flip() || intervals.len() <= 1 {
            let u = rand.below(buffer.len() - 1);
            let v = u + 1 + rand.below(buffer.len() - 1 - u);
            (u, v)
        } else {
            let chosen = &intervals[rand.below(intervals.len())];
            (chosen.start, chosen.end)
        };
        let replace: Vec<u8> = match rand.below(3) {
            0 => vec![0u8; v - u],
            1 => vec![0xFFu8; v - u],
            _ => rand.bytes(v - u),
        };
        let mut result = Vec::with_capacity(buffer.len() - (v - u) + replace.len());
        result.extend_from_slice(&buffer[..u]);
        result.extend_from_slice(&replace);
        result.extend_from_slice(&buffer[v..]);
        result
    } else {
        // Seeded equal on purpose so the loop below always draws at least
        // once, mirroring the reference implementation's `int1 = int2 =
        // None` sentinel.
        let mut int1 = intervals[0];
        let mut int2 = intervals[0];
        while int1 == int2 {
            let i = rand.below(intervals.len() - 1);
            int1 = intervals[i];
            int2 = intervals[i + 1 + rand.below(intervals.len() - i - 1)];
        }
        let (first, second) = if int1.start <= int2.start {
            (int1, int2)
        } else {
            (int2, int1)
        };
        let mut result = Vec::new();
        result.extend_from_slice(&buffer[..first.start]);
        result.extend_from_slice(&buffer[second.start..second.end]);
        result.extend_from_slice(&buffer[first.end..]);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interesting(buffer: Vec<u8>) -> TestData {
        let mut data = TestData::new(buffer);
        data.start_example();
        let len = data.buffer().len();
        data.draw_bytes(len).unwrap();
        data.stop_example();
        data.freeze();
        data
    }

    /// Three disjoint, distinctly-valued intervals, so that which pair the
    /// interval swap-splice branch picks is visible in the output buffer.
    fn three_intervals() -> TestData {
        let mut data = TestData::new(vec![1, 1, 2, 2, 3, 3]);
        for _ in 0..3 {
            data.start_example();
            data.draw_bytes(2).unwrap();
            data.stop_example();
        }
        data.freeze();
        data
    }

    #[test]
    fn degenerate_empty_prefix_returns_empty_buffer() {
        let data = TestData::new(vec![]);
        let mut rand = RandomSource::from_seed(&[1, 2, 3, 4]);
        assert_eq!(mutate_to_new_buffer(&data, &mut rand), Vec::<u8>::new());
    }

    #[test]
    fn single_consumed_byte_returns_one_random_byte() {
        let mut data = TestData::new(vec![9]);
        data.draw_bytes(1).unwrap();
        data.freeze();
        let mut rand = RandomSource::from_seed(&[1, 2, 3, 4]);
        assert_eq!(mutate_to_new_buffer(&data, &mut rand).len(), 1);
    }

    #[test]
    fn is_pure_given_the_same_seed() {
        let data = interesting(vec![10, 20, 30, 40, 50]);
        let mut r1 = RandomSource::from_seed(&[7, 8, 9, 10]);
        let mut r2 = RandomSource::from_seed(&[7, 8, 9, 10]);
        assert_eq!(
            mutate_to_new_buffer(&data, &mut r1),
            mutate_to_new_buffer(&data, &mut r2)
        );
    }

    /// With three disjoint intervals, the swap-splice branch must be free to
    /// pick any pair, not just (interval 0, interval 1). We run it across
    /// many seeds and check that a pair involving the third interval shows
    /// up: splicing interval 2 into interval 0 yields `[3,3,2,2,3,3]`,
    /// and splicing interval 2 into interval 1 yields `[1,1,3,3,3,3]`.
    /// Neither can appear if `int1`/`int2` are always seeded to the first
    /// two distinct intervals in the list.
    #[test]
    fn interval_swap_splice_draws_vary_across_seeds() {
        let data = three_intervals();
        let mut saw_interval_two_paired_with_zero = false;
        let mut saw_interval_two_paired_with_one = false;
        let mut distinct = std::collections::HashSet::new();

        for seed in 0..2000u32 {
            let mut rand = RandomSource::from_seed(&[seed, seed ^ 0xDEAD, seed ^ 0xBEEF, seed]);
            let result = mutate_to_new_buffer(&data, &mut rand);
            if result == vec![3, 3, 2, 2, 3, 3] {
                saw_interval_two_paired_with_zero = true;
            }
            if result == vec![1, 1, 3, 3, 3, 3] {
                saw_interval_two_paired_with_one = true;
            }
            distinct.insert(result);
        }

        assert!(
            saw_interval_two_paired_with_zero,
            "interval 2 was never spliced against interval 0 across 2000 seeds"
        );
        assert!(
            saw_interval_two_paired_with_one,
            "interval 2 was never spliced against interval 1 across 2000 seeds"
        );
        assert!(
            distinct.len() > 2,
            "expected more than two distinct mutation outcomes, got {}",
            distinct.len()
        );
    }

    #[test]
    fn overrun_mutation_never_exceeds_original_byte_value() {
        let mut data = TestData::new(vec![10, 20, 30]);
        data.draw_bytes(3).unwrap();
        data.draw_bytes(100).unwrap_err();
        data.freeze();
        let mut rand = RandomSource::from_seed(&[1, 1, 1, 1]);
        let mutated = mutate_to_new_buffer(&data, &mut rand);
        assert_eq!(mutated.len(), data.buffer().len());
        for (m, c) in mutated.iter().zip(data.buffer().iter()) {
            assert!(m <= c);
        }
    }
}
