//! Greedy match search for the HSQ encoder.
//!
//! Candidate positions sharing a 3-byte prefix are kept in hash chains:
//! `head[hash]` holds the most recent position, `prev[pos]` the one before
//! it. Walking a chain visits candidates nearest-first, so the first match
//! of a given length is also the closest. A separate byte-pair table
//! catches length-2 matches, which only the short reference form can
//! encode and which a 3-byte hash never sees.

use super::{LONG_REACH, MAX_MATCH, SHORT_REACH};

/// Hash table size for the 3-byte prefix chains (power of 2).
const HASH_SIZE: usize = 1 << 15;
const HASH_MASK: usize = HASH_SIZE - 1;

/// Chain slot meaning "no earlier position".
const NIL: u32 = u32::MAX;

/// A back-reference candidate: `length` bytes found `distance` back from
/// the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Match {
    pub length: usize,
    pub distance: usize,
}

#[inline]
fn hash3(data: &[u8], pos: usize) -> usize {
    let h = (data[pos] as usize) << 10 ^ (data[pos + 1] as usize) << 5 ^ (data[pos + 2] as usize);
    h & HASH_MASK
}

#[inline]
fn pair(data: &[u8], pos: usize) -> usize {
    u16::from_le_bytes([data[pos], data[pos + 1]]) as usize
}

pub(super) struct MatchFinder {
    /// head[hash] = most recent position with this 3-byte prefix hash
    head: Vec<u32>,
    /// prev[pos] = previous position in the same chain
    prev: Vec<u32>,
    /// pair_head[two bytes] = most recent position starting with that pair
    pair_head: Vec<u32>,
}

impl MatchFinder {
    pub(super) fn new(input_len: usize) -> Self {
        Self {
            head: vec![NIL; HASH_SIZE],
            prev: vec![NIL; input_len],
            pair_head: vec![NIL; 1 << 16],
        }
    }

    /// Find the longest encodable match at `pos`, searching at most
    /// `max_chain` candidates per hash bucket. Ties prefer the nearest
    /// candidate, which the nearest-first chain order gives for free.
    pub(super) fn find_match(&self, data: &[u8], pos: usize, max_chain: usize) -> Option<Match> {
        let remaining = data.len() - pos;
        if remaining < 2 {
            return None;
        }
        let limit = remaining.min(MAX_MATCH);
        let min_pos = pos.saturating_sub(LONG_REACH);

        let mut best: Option<Match> = None;

        if remaining >= 3 {
            let mut candidate = self.head[hash3(data, pos)];
            let mut chain_len = 0;
            while candidate != NIL && chain_len < max_chain {
                let cand = candidate as usize;
                if cand < min_pos {
                    break;
                }
                let length = match_length(data, cand, pos, limit);
                let distance = pos - cand;
                if acceptable(length, distance) && best.map_or(true, |b| length > b.length) {
                    best = Some(Match { length, distance });
                    if length == limit {
                        break;
                    }
                }
                candidate = self.prev[cand];
                chain_len += 1;
            }
        }

        // fall back to the nearest byte-pair candidate for the short form
        if best.is_none() {
            let cand = self.pair_head[pair(data, pos)];
            if cand != NIL {
                let cand = cand as usize;
                let distance = pos - cand;
                if distance <= SHORT_REACH {
                    let length = match_length(data, cand, pos, limit);
                    if length >= 2 {
                        best = Some(Match { length, distance });
                    }
                }
            }
        }

        best
    }

    /// Record `pos` as a future match candidate.
    #[inline]
    pub(super) fn insert(&mut self, data: &[u8], pos: usize) {
        if pos + 2 < data.len() {
            let h = hash3(data, pos);
            self.prev[pos] = self.head[h];
            self.head[h] = pos as u32;
        }
        if pos + 1 < data.len() {
            self.pair_head[pair(data, pos)] = pos as u32;
        }
    }
}

/// Number of leading bytes `data[cand..]` shares with `data[pos..]`, capped
/// at `limit`. The candidate run may extend past `pos` into the bytes being
/// matched; the decoder's overlapping copy reproduces that.
fn match_length(data: &[u8], cand: usize, pos: usize, limit: usize) -> usize {
    let mut len = 0;
    while len < limit && data[cand + len] == data[pos + len] {
        len += 1;
    }
    len
}

/// Length-2 matches only exist in the short form, so they must be within
/// its reach. Anything longer can take the long form.
#[inline]
fn acceptable(length: usize, distance: usize) -> bool {
    length >= 3 || (length == 2 && distance <= SHORT_REACH)
}
