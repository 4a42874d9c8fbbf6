//! Arithmetic on the circular identifier space `Z_{2^M}`.
//!
//! An [`Identifier`] is a plain integer in `[0, SPACE)`. Unlike the teacher
//! crate's 256-bit `Identifier` (a `bigint::U256` wrapper, needed because its
//! space was `2^256`), this space is fixed at `2^16` by the reference
//! configuration, so a `u32` is plenty and no bignum crate is pulled in.
//!
//! Everything in this module is pure and side-effect-free.

use sha1::{Digest, Sha1};

/// Bit-width of the identifier space.
pub const M: u32 = 16;

/// Size of the identifier space, `2^M`.
pub const SPACE: u32 = 1 << M;

/// A position on the identifier circle, always in `[0, SPACE)`.
pub type Identifier = u32;

/// Hashes `"<ip>:<port>"` with SHA-1 and reduces the 160-bit digest modulo
/// [`SPACE`].
///
/// The reduction folds the digest bytes through a running
/// `value = (value * 256 + byte) mod SPACE` accumulator. This is equivalent
/// to treating the 20-byte digest as one big-endian integer and reducing it
/// mod `SPACE`, without needing a bignum type.
///
/// # Examples
///
/// ```
/// use chordring::identifier::hash;
///
/// assert_eq!(hash("1.2.3.4", 5), 57776);
/// ```
pub fn hash(ip: &str, port: u16) -> Identifier {
    let mut hasher = Sha1::new();
    hasher.update(format!("{}:{}", ip, port).as_bytes());
    let digest = hasher.finalize();

    let mut value: u64 = 0;
    for byte in digest.iter() {
        value = (value * 256 + *byte as u64) % SPACE as u64;
    }
    value as Identifier
}

/// Returns whether `x` lies strictly between `start` and `end` on the circle,
/// exclusive of both endpoints.
///
/// `start == end` is always false (an empty interval); see
/// [`in_half_open_interval`] for the `(start, end]` variant used by
/// successor-ownership checks, where `start == end` instead means the whole
/// circle.
///
/// # Examples
///
/// ```
/// use chordring::identifier::in_open_interval;
///
/// assert!(in_open_interval(10, 50, 30));
/// assert!(!in_open_interval(10, 50, 10));
/// assert!(!in_open_interval(10, 50, 50));
/// assert!(in_open_interval(60, 20, 10)); // wraps through 0
/// assert!(!in_open_interval(10, 10, 10));
/// ```
pub fn in_open_interval(start: Identifier, end: Identifier, x: Identifier) -> bool {
    if start == end {
        false
    } else if start < end {
        start < x && x < end
    } else {
        x > start || x < end
    }
}

/// Returns whether `x` lies in `(start, end]` on the circle.
///
/// When `start == end` this degenerates to "always true" via the wrap
/// branch, which is exactly the semantics a solo ring needs: a node whose
/// predecessor and successor both equal itself owns every identifier.
///
/// # Examples
///
/// ```
/// use chordring::identifier::in_half_open_interval;
///
/// assert!(in_half_open_interval(65530, 50, 65535));
/// assert!(in_half_open_interval(65530, 50, 50));
/// assert!(!in_half_open_interval(65530, 50, 51));
/// assert!(!in_half_open_interval(65530, 50, 65529));
/// ```
pub fn in_half_open_interval(start: Identifier, end: Identifier, x: Identifier) -> bool {
    if start < end {
        start < x && x <= end
    } else {
        x > start || x <= end
    }
}

/// Computes `finger_start(i) = (self_key + 2^i) mod SPACE` for `i in [0, M)`.
///
/// # Examples
///
/// ```
/// use chordring::identifier::{finger_start, M};
///
/// assert_eq!(finger_start(100, 0), 101);
/// assert_eq!(finger_start(0, (M - 1) as usize), 1 << (M - 1));
/// ```
pub fn finger_start(self_key: Identifier, i: usize) -> Identifier {
    let offset: u64 = 1u64 << i;
    ((self_key as u64 + offset) % SPACE as u64) as Identifier
}
