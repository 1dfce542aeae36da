//! Locality-sensitive hashing index for binary descriptors.
//!
//! Each table hashes a descriptor by a fixed random subset of its bits.
//! Queries visit the exact bucket and every bucket one bit flip away, then
//! rank the gathered candidates by exact Hamming distance.

use super::brief::{Descriptor, DESCRIPTOR_BYTES};
use crate::util::math::hamming;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use std::collections::HashMap;

/// Index parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LshParams {
    /// Number of hash tables.
    pub tables: usize,
    /// Bits sampled per table key (at most 32).
    pub key_bits: usize,
    /// Seed for the bit selection.
    pub seed: u64,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            tables: 6,
            key_bits: 12,
            seed: 0,
        }
    }
}

/// A nearest-neighbor hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbor {
    /// Index of the descriptor in the indexed set.
    pub index: usize,
    /// Hamming distance to the query.
    pub distance: u32,
}

struct Table {
    bits: Vec<usize>,
    buckets: HashMap<u32, Vec<usize>>,
}

impl Table {
    fn key(&self, desc: &Descriptor) -> u32 {
        self.bits.iter().enumerate().fold(0u32, |acc, (i, &bit)| {
            if desc[bit / 8] & (1 << (bit % 8)) != 0 {
                acc | (1 << i)
            } else {
                acc
            }
        })
    }
}

/// Hash index over a fixed descriptor set.
pub struct LshIndex<'a> {
    data: &'a [Descriptor],
    tables: Vec<Table>,
}

impl<'a> LshIndex<'a> {
    /// Builds the index over `data`.
    pub fn build(data: &'a [Descriptor], params: LshParams) -> Self {
        let total_bits = DESCRIPTOR_BYTES * 8;
        let key_bits = params.key_bits.clamp(1, 32);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let tables = (0..params.tables.max(1))
            .map(|_| {
                let bits = sample(&mut rng, total_bits, key_bits).into_vec();
                let mut table = Table {
                    bits,
                    buckets: HashMap::new(),
                };
                for (idx, desc) in data.iter().enumerate() {
                    let key = table.key(desc);
                    table.buckets.entry(key).or_default().push(idx);
                }
                table
            })
            .collect();
        Self { data, tables }
    }

    /// Number of indexed descriptors.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns up to two nearest neighbors of `query`, closest first.
    ///
    /// Falls back to an exhaustive scan when the visited buckets hold fewer
    /// than two candidates.
    pub fn knn2(&self, query: &Descriptor) -> Vec<Neighbor> {
        let mut seen = vec![false; self.data.len()];
        let mut candidates = Vec::new();
        for table in &self.tables {
            let key = table.key(query);
            let keys = std::iter::once(key).chain((0..table.bits.len()).map(|b| key ^ (1 << b)));
            for bucket_key in keys {
                if let Some(bucket) = table.buckets.get(&bucket_key) {
                    for &idx in bucket {
                        if !seen[idx] {
                            seen[idx] = true;
                            candidates.push(idx);
                        }
                    }
                }
            }
        }
        if candidates.len() < 2 {
            candidates = (0..self.data.len()).collect();
        }

        let mut best: Vec<Neighbor> = Vec::with_capacity(3);
        for idx in candidates {
            let n = Neighbor {
                index: idx,
                distance: hamming(query, &self.data[idx]),
            };
            let pos = best
                .iter()
                .position(|b| (n.distance, n.index) < (b.distance, b.index))
                .unwrap_or(best.len());
            if pos < 2 {
                best.insert(pos, n);
                best.truncate(2);
            }
        }
        best
    }
}

/// Lowe ratio test: the best hit must be strictly closer than `ratio` times
/// the runner-up.
pub fn ratio_test(best: Neighbor, second: Neighbor, ratio: f32) -> bool {
    (best.distance as f32) < ratio * second.distance as f32
}

#[cfg(test)]
mod tests {
    use super::{ratio_test, LshIndex, LshParams, Neighbor};
    use crate::features::brief::Descriptor;

    fn desc(fill: u8) -> Descriptor {
        [fill; 32]
    }

    #[test]
    fn finds_exact_and_runner_up() {
        let mut near = desc(0);
        near[0] = 0b0000_0111;
        let data = vec![desc(0xFF), near, desc(0)];
        let index = LshIndex::build(&data, LshParams::default());
        let hits = index.knn2(&desc(0));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0], Neighbor { index: 2, distance: 0 });
        assert_eq!(hits[1], Neighbor { index: 1, distance: 3 });
    }

    #[test]
    fn single_descriptor_yields_one_neighbor() {
        let data = vec![desc(0xAA)];
        let index = LshIndex::build(&data, LshParams::default());
        let hits = index.knn2(&desc(0x55));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 256);
    }

    #[test]
    fn ratio_test_rejects_ties() {
        let a = Neighbor { index: 0, distance: 10 };
        let b = Neighbor { index: 1, distance: 10 };
        assert!(!ratio_test(a, b, 0.7));
        let c = Neighbor { index: 1, distance: 20 };
        assert!(ratio_test(a, c, 0.7));
    }
}
