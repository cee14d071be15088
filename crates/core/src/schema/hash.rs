//! Structural hashing of the schema model.
//!
//! Collections which are sets in the normalized model (tables, columns,
//! functions, index entries) are folded with a commutative combination of
//! their element hashes, so the order in which the database returned the
//! rows never changes the resulting hash.

use std::hash::{BuildHasher, Hash};

use ahash::RandomState;

// Fixed seeds keep the hash stable for the lifetime of a process and across
// processes built from the same sources.
const SEEDS: [u64; 4] = [
	0x243f_6a88_85a3_08d3,
	0x1319_8a2e_0370_7344,
	0xa409_3822_299f_31d0,
	0x082e_fa98_ec4e_6c89,
];

fn state() -> RandomState {
	RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3])
}

/// Hashes a single value with the structural hasher
pub(crate) fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
	BuildHasher::hash_one(&state(), value)
}

/// Hashes a collection as an unordered set
pub(crate) fn hash_set<'a, T, I>(items: I) -> u64
where
	T: Hash + 'a,
	I: IntoIterator<Item = &'a T>,
{
	let mut count: u64 = 0;
	let mut sum: u64 = 0;
	let mut xor: u64 = 0;
	for item in items {
		let h = hash_one(item);
		sum = sum.wrapping_add(h);
		xor ^= h.rotate_left(29);
		count += 1;
	}
	hash_one(&(count, sum, xor))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_hash_ignores_order() {
		let a = ["users", "posts", "comments"];
		let b = ["comments", "users", "posts"];
		assert_eq!(hash_set(a.iter()), hash_set(b.iter()));
	}

	#[test]
	fn set_hash_detects_membership_changes() {
		let a = ["users", "posts"];
		let b = ["users", "posts", "comments"];
		let c = ["users", "tags"];
		assert_ne!(hash_set(a.iter()), hash_set(b.iter()));
		assert_ne!(hash_set(a.iter()), hash_set(c.iter()));
	}

	#[test]
	fn set_hash_counts_duplicates() {
		let a = ["users"];
		let b = ["users", "users", "users"];
		assert_ne!(hash_set(a.iter()), hash_set(b.iter()));
	}
}
