//! Prime capacity progression.
//!
//! Bucket counts are always drawn from an ascending sequence of primes.
//! The first 69 members are tabulated; past the table the sequence is
//! extended on demand with the smallest prime `>= prev * 5 / 4 + 1`.
//! Requests past `MAX_BUCKETS` panic with "capacity overflow" before any
//! search starts.

use slotmap::DefaultKey;

pub(crate) const PRIMES: [usize; 69] = [
    17, 23, 29, 37, 47, 59, 71, 89, 107, 131, 163, 197, 239, 293, 353, 431, 521, 631, 761, 919,
    1103, 1327, 1597, 1931, 2333, 2801, 3371, 4049, 4861, 5839, 7013, 8419, 10103, 12143, 14591,
    17519, 21023, 25229, 30293, 36353, 43627, 52361, 62851, 75431, 90523, 108631, 130363, 156437,
    187751, 225307, 270371, 324449, 389357, 467237, 560689, 672827, 807403, 968897, 1162687,
    1395263, 1674319, 2009191, 2411033, 2893249, 3471899, 4166287, 4999559, 5999471, 7199369,
];

/// Smallest member of the progression.
pub const SEED_CAPACITY: usize = PRIMES[0];

/// Largest bucket count whose array fits in `isize::MAX` bytes.
pub(crate) const MAX_BUCKETS: usize =
    isize::MAX as usize / core::mem::size_of::<Option<DefaultKey>>();

/// The progression member at `index`.
pub(crate) fn prime_at(index: usize) -> usize {
    if let Some(&p) = PRIMES.get(index) {
        return p;
    }
    let mut p = PRIMES[PRIMES.len() - 1];
    for _ in PRIMES.len()..=index {
        p = extend(p);
        assert!(p <= MAX_BUCKETS, "capacity overflow");
    }
    p
}

/// Smallest progression member `>= target`, with its index.
pub(crate) fn closest_prime(target: usize) -> (usize, usize) {
    assert!(target <= MAX_BUCKETS, "capacity overflow");
    if let Some(i) = PRIMES.iter().position(|&p| p >= target) {
        return (i, PRIMES[i]);
    }
    let mut index = PRIMES.len() - 1;
    let mut p = PRIMES[index];
    while p < target {
        p = extend(p);
        index += 1;
    }
    assert!(p <= MAX_BUCKETS, "capacity overflow");
    (index, p)
}

fn extend(prev: usize) -> usize {
    let floor = (prev / 4)
        .checked_mul(5)
        .and_then(|n| n.checked_add(prev % 4 * 5 / 4 + 1))
        .expect("capacity overflow");
    next_prime(floor)
}

fn next_prime(mut n: usize) -> usize {
    if n <= 2 {
        return 2;
    }
    if n % 2 == 0 {
        n += 1;
    }
    while !is_prime(n) {
        n = n.checked_add(2).expect("capacity overflow");
    }
    n
}

// Miller-Rabin with the first twelve primes as witnesses, exact for
// every 64-bit n.
const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

fn is_prime(n: usize) -> bool {
    let n = n as u64;
    if n < 2 {
        return false;
    }
    for &w in WITNESSES.iter() {
        if n % w == 0 {
            return n == w;
        }
    }
    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    'witness: for &a in WITNESSES.iter() {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut acc = 1;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_ascending_primes() {
        for w in PRIMES.windows(2) {
            assert!(w[0] < w[1]);
        }
        for &p in PRIMES.iter() {
            assert!(is_prime(p), "{p} is not prime");
        }
    }

    #[test]
    fn closest_prime_picks_smallest_member_at_or_above() {
        assert_eq!(closest_prime(0), (0, 17));
        assert_eq!(closest_prime(6), (0, 17));
        assert_eq!(closest_prime(17), (0, 17));
        assert_eq!(closest_prime(18), (1, 23));
        assert_eq!(closest_prime(23), (1, 23));
        assert_eq!(closest_prime(7199369), (68, 7199369));
    }

    #[test]
    fn progression_extends_past_table() {
        let last = PRIMES[PRIMES.len() - 1];
        let next = prime_at(PRIMES.len());
        assert!(next > last);
        assert!(is_prime(next));
        assert!(next >= last / 4 * 5);

        let (i, p) = closest_prime(last + 1);
        assert_eq!(i, PRIMES.len());
        assert_eq!(p, next);

        let (i, p) = closest_prime(next + 1);
        assert_eq!(i, PRIMES.len() + 1);
        assert_eq!(p, prime_at(i));
    }

    #[test]
    fn is_prime_agrees_with_trial_division() {
        let trial = |n: usize| n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0);
        for n in 0..10_000 {
            assert_eq!(is_prime(n), trial(n), "n = {n}");
        }
        // Strong pseudoprimes to small bases.
        assert!(!is_prime(2047));
        assert!(!is_prime(3215031751));
        assert!(is_prime(1_000_000_007));
    }

    #[test]
    fn progression_reaches_large_sizes_quickly() {
        let target = MAX_BUCKETS / 2;
        let (i, p) = closest_prime(target);
        assert!(p >= target && p <= MAX_BUCKETS);
        assert!(is_prime(p));
        assert_eq!(prime_at(i), p);
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn closest_prime_rejects_unallocatable_target() {
        closest_prime(MAX_BUCKETS + 1);
    }

    #[test]
    fn prime_at_matches_table() {
        for (i, &p) in PRIMES.iter().enumerate() {
            assert_eq!(prime_at(i), p);
        }
    }
}
