// Linear congruential generator parameters
const MUL: u64 = 6364136223846793005; // Knuth section 3.3.4 (p.108)
const INC: u64 = 1442695040888963407;

/// Seeded pseudo-random source for the noise pass.
///
/// Any byte string works as a seed; it is hashed down to the 64-bit generator state, so the same
/// seed always replays the same sequence of noise.
#[derive(Clone, PartialEq)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn from_seed(seed: &[u8]) -> Rng {
        Rng {
            state: splitmix64(fnv1a(seed)),
        }
    }

    fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state.wrapping_mul(MUL).wrapping_add(INC);
        // PCG-XSH-RR output function (O'Neill 2014, section 6.3.1) on the old state.
        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        xorshifted.rotate_right((old_state >> 59) as u32)
    }

    /// Picks a random value uniformly distributed between `0.0` (inclusive) and `1.0` (exclusive).
    pub fn rnd(&mut self) -> f64 {
        2.0f64.powi(-32) * f64::from(self.next_u32())
    }

    /// Picks a random channel value uniformly from `0..=255`.
    pub fn channel(&mut self) -> u8 {
        (self.rnd() * 256.0) as u8
    }
}

impl std::fmt::Debug for Rng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rng({:#018x})", self.state)
    }
}

/// 64-bit FNV-1a hash.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    bytes
        .iter()
        .fold(OFFSET_BASIS, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

/// SplitMix64 finalizer.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}


#[cfg(test)]
mod seed_hash_test {
    use super::*;

    #[test]
    fn test_fnv1a() {
        assert_eq!(fnv1a(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn test_splitmix64() {
        assert_eq!(splitmix64(0xcbf29ce484222325), 0xc3817c016ba4ff30);
        assert_ne!(splitmix64(1), splitmix64(2));
    }
}
