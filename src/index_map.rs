//! Mapping between process-local and global indices.
//!
//! An [`IndexMap`] describes a contiguous range of globally numbered indices owned by this
//! process, followed by a list of *ghost* indices owned elsewhere. Local index `i` refers to the
//! owned index `local_range.start + i` for `i < size_local`, and to `ghosts[i - size_local]`
//! otherwise.
use rustc_hash::FxHashMap;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexMapError {
    #[error("owned range {start}..{end} exceeds the global size {size_global}")]
    RangeOutOfBounds { start: usize, end: usize, size_global: usize },
    #[error("ghost index {0} is out of bounds")]
    GhostOutOfBounds(usize),
    #[error("ghost index {0} lies in the owned range")]
    GhostIsOwned(usize),
    #[error("ghost index {0} occurs more than once")]
    DuplicateGhost(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    local_range: Range<usize>,
    ghosts: Vec<usize>,
    size_global: usize,
    ghost_positions: FxHashMap<usize, usize>,
}

impl IndexMap {
    pub fn new(local_range: Range<usize>, ghosts: Vec<usize>, size_global: usize) -> Result<Self, IndexMapError> {
        if local_range.start > local_range.end || local_range.end > size_global {
            return Err(IndexMapError::RangeOutOfBounds {
                start: local_range.start,
                end: local_range.end,
                size_global,
            });
        }

        let mut ghost_positions = FxHashMap::default();
        for (position, &ghost) in ghosts.iter().enumerate() {
            if ghost >= size_global {
                return Err(IndexMapError::GhostOutOfBounds(ghost));
            }
            if local_range.contains(&ghost) {
                return Err(IndexMapError::GhostIsOwned(ghost));
            }
            if ghost_positions.insert(ghost, position).is_some() {
                return Err(IndexMapError::DuplicateGhost(ghost));
            }
        }

        Ok(Self {
            local_range,
            ghosts,
            size_global,
            ghost_positions,
        })
    }

    /// An index map for a single process owning all `n` indices.
    pub fn serial(n: usize) -> Self {
        Self {
            local_range: 0..n,
            ghosts: Vec::new(),
            size_global: n,
            ghost_positions: FxHashMap::default(),
        }
    }

    pub fn local_range(&self) -> Range<usize> {
        self.local_range.clone()
    }

    pub fn ghosts(&self) -> &[usize] {
        &self.ghosts
    }

    /// Number of owned indices.
    pub fn size_local(&self) -> usize {
        self.local_range.len()
    }

    pub fn num_ghosts(&self) -> usize {
        self.ghosts.len()
    }

    pub fn size_global(&self) -> usize {
        self.size_global
    }

    /// Number of owned and ghost indices together.
    pub fn size_with_ghosts(&self) -> usize {
        self.size_local() + self.num_ghosts()
    }

    pub fn local_to_global(&self, local: usize) -> Option<usize> {
        let size_local = self.size_local();
        if local < size_local {
            Some(self.local_range.start + local)
        } else {
            self.ghosts.get(local - size_local).copied()
        }
    }

    pub fn global_to_local(&self, global: usize) -> Option<usize> {
        if self.local_range.contains(&global) {
            Some(global - self.local_range.start)
        } else {
            self.ghost_positions
                .get(&global)
                .map(|position| self.size_local() + position)
        }
    }

    /// Global indices of all local indices, owned indices first.
    pub fn global_indices(&self) -> Vec<usize> {
        self.local_range
            .clone()
            .chain(self.ghosts.iter().copied())
            .collect()
    }

    pub fn is_owned(&self, local: usize) -> bool {
        local < self.size_local()
    }
}
