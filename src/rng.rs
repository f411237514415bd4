use crate::constants::{FNV_OFFSET_BASIS, FNV_PRIME, RNG_INCREMENT};

/// Hashes a seed string to 32 bits with FNV-1a over its UTF-16 code units.
pub fn seed_from_str(seed: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for unit in seed.encode_utf16() {
        hash ^= unit as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn from_seed_str(seed: &str) -> Self {
        Self::new(seed_from_str(seed))
    }

    pub fn next_f64(&mut self) -> f64 {
        self.seed = self.seed.wrapping_add(RNG_INCREMENT);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        out as f64 / 4_294_967_296.0
    }

    /// Real number in `[min, max)`.
    pub fn rand(&mut self, min: f64, max: f64) -> f64 {
        self.next_f64() * (max - min) + min
    }

    /// `rand` truncated towards negative infinity.
    pub fn rand_int(&mut self, min: i32, max: i32) -> i32 {
        self.rand(min as f64, max as f64).floor() as i32
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            // Still advance the stream so every draw site costs one value.
            self.next_f64();
            return 0;
        }
        ((self.next_f64() * len as f64).floor() as usize).min(len - 1)
    }

    pub fn choice<'a, T>(&mut self, choices: &'a [T]) -> Option<&'a T> {
        if choices.is_empty() {
            return None;
        }
        let idx = self.pick_index(choices.len());
        choices.get(idx)
    }

    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        for i in (1..values.len()).rev() {
            let j = ((self.next_f64() * (i + 1) as f64).floor() as usize).min(i);
            values.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_matches_reference_values() {
        assert_eq!(seed_from_str(""), 2_166_136_261);
        assert_eq!(seed_from_str("a"), 0xe40c_292c);
        assert_eq!(seed_from_str("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn same_seed_string_reproduces_stream() {
        let mut a = Rng::from_seed_str("01/02/2024");
        let mut b = Rng::from_seed_str("01/02/2024");
        for _ in 0..64 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let mut rng = Rng::new(7);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn rand_int_respects_half_open_range() {
        let mut rng = Rng::from_seed_str("range");
        let mut seen_low = false;
        for _ in 0..5_000 {
            let v = rng.rand_int(5, 20);
            assert!((5..20).contains(&v));
            seen_low |= v == 5;
        }
        assert!(seen_low);
    }

    #[test]
    fn choice_consumes_one_draw_and_handles_empty() {
        let mut a = Rng::new(99);
        let mut b = Rng::new(99);
        let picked = a.choice(&["up", "down", "left", "right"]).copied();
        let idx = (b.next_f64() * 4.0).floor() as usize;
        assert_eq!(picked, Some(["up", "down", "left", "right"][idx]));

        let empty: [u8; 0] = [];
        assert!(a.choice(&empty).is_none());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = Rng::from_seed_str("shuffle");
        let mut values: Vec<u32> = (0..50).collect();
        rng.shuffle(&mut values);
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        assert_ne!(values, sorted);
    }
}
