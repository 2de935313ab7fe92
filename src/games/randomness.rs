use crate::games::types::{ChamberSet, CHAMBERS};
use rand::{rngs::OsRng, Rng};
use std::collections::VecDeque;

/// Consecutive repeated draws tolerated before falling back to probing.
const MAX_REPEATS: u32 = 256;

/// Source of chamber draws, uniform over `0..6`
///
/// This is the only place randomness enters a session. Replacing it with a
/// verifiable source leaves the state machine untouched.
pub trait RandomnessSource {
    fn draw(&mut self) -> u8;
}

impl<T: RandomnessSource + ?Sized> RandomnessSource for Box<T> {
    fn draw(&mut self) -> u8 {
        (**self).draw()
    }
}

/// Operating system entropy
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomness;

impl RandomnessSource for OsRandomness {
    fn draw(&mut self) -> u8 {
        OsRng.gen_range(0..CHAMBERS)
    }
}

/// Replays a fixed list of draws, cycling when exhausted (for testing)
#[derive(Debug, Clone)]
pub struct FixedSequence {
    draws: VecDeque<u8>,
}

impl FixedSequence {
    /// Values are reduced modulo 6.
    pub fn new<I: IntoIterator<Item = u8>>(draws: I) -> Self {
        Self {
            draws: draws.into_iter().map(|d| d % CHAMBERS).collect(),
        }
    }
}

impl RandomnessSource for FixedSequence {
    fn draw(&mut self) -> u8 {
        match self.draws.pop_front() {
            Some(value) => {
                self.draws.push_back(value);
                value
            }
            None => 0,
        }
    }
}

/// Draw `count` distinct chambers, discarding repeats.
///
/// A source that keeps repeating itself (a short fixed sequence) falls back
/// to the next free chamber after the repeated one.
pub fn draw_chambers<R: RandomnessSource + ?Sized>(source: &mut R, count: usize) -> ChamberSet {
    let count = count.min(CHAMBERS as usize);
    let mut set = ChamberSet::EMPTY;
    let mut repeats = 0;

    while set.len() < count {
        let chamber = source.draw() % CHAMBERS;
        if !set.contains(chamber) {
            set = set.with(chamber).unwrap_or(set);
            repeats = 0;
            continue;
        }

        repeats += 1;
        if repeats >= MAX_REPEATS {
            if let Some(free) = (1..CHAMBERS)
                .map(|step| (chamber + step) % CHAMBERS)
                .find(|c| !set.contains(*c))
            {
                set = set.with(free).unwrap_or(set);
            }
            repeats = 0;
        }
    }
    set
}
