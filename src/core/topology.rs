//! A `Topology` is the shape of an N-dimensional grid stored row-major in a flat index space.
//! It converts between flat indices and per-dimension coordinates and enumerates the
//! hypercube neighborhood of a cell.
//!
//! In the Spatial Pooler both the input space and the column space are N-dimensional grids.
//! Potential pools are drawn from input-space neighborhoods, and local inhibition as well as the local
//! duty-cycle floors compete within column-space neighborhoods. Neighborhoods are hypercubes of
//! side `2 * radius + 1` that either wrap around the edges (torus) or are clipped at them.

use serde::{Deserialize, Serialize};

/// Grid shape plus the row-major stride of every dimension (the last dimension has stride 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl Topology {
    #[inline]
    pub fn new(dimensions: &[usize]) -> Self {
        let mut strides = vec![1; dimensions.len()];
        for axis in (1..dimensions.len()).rev() {
            strides[axis - 1] = strides[axis] * dimensions[axis];
        }

        Self {
            dims: dimensions.to_vec(),
            strides,
        }
    }

    /// The size of every dimension, outermost first.
    #[inline]
    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of elements in the space.
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// The size of the largest dimension.
    #[inline]
    pub fn max_dimension(&self) -> usize {
        self.dims.iter().copied().max().unwrap_or(0)
    }

    /// Per-dimension coordinates of a flat index, outermost dimension first.
    #[inline]
    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        self.strides
            .iter()
            .zip(&self.dims)
            .map(|(&stride, &dim)| (index / stride) % dim)
            .collect()
    }

    /// Flat index of a coordinate tuple. `coords` has one entry per dimension.
    #[inline]
    pub fn index_from_coordinates(&self, coords: &[usize]) -> usize {
        coords
            .iter()
            .zip(&self.strides)
            .fold(0, |index, (&coord, &stride)| index + coord * stride)
    }

    /// Returns an iterator over the neighborhood of indices within a given `radius` of the
    /// specified `center` index, the center included. If `wrapping` is true, the neighborhood
    /// wraps around edges of the topology dimensions; otherwise, it is clipped at boundaries.
    /// Every index is yielded exactly once, even when a wrapping radius exceeds a dimension.
    #[inline]
    pub fn neighborhood(&self, center: usize, radius: usize, wrapping: bool) -> NeighborhoodIter<'_> {
        let axes: Vec<Vec<usize>> = self
            .coordinates(center)
            .into_iter()
            .zip(&self.dims)
            .map(|(c, &dim)| Self::axis(c, dim, radius, wrapping))
            .collect();

        let cursor = if axes.iter().any(Vec::is_empty) {
            None
        } else {
            Some(vec![0; axes.len()])
        };

        NeighborhoodIter {
            topology: self,
            axes,
            cursor,
        }
    }

    /// Collects the neighbors of `center` within `radius`, excluding `center` itself.
    #[inline]
    pub fn neighbors(&self, center: usize, radius: usize, wrapping: bool) -> Vec<usize> {
        self.neighborhood(center, radius, wrapping)
            .filter(|&index| index != center)
            .collect()
    }

    /// The coordinates covered along one dimension of size `dim` around `center`.
    fn axis(center: usize, dim: usize, radius: usize, wrapping: bool) -> Vec<usize> {
        if wrapping {
            if 2 * radius + 1 >= dim {
                return (0..dim).collect();
            }
            let (c, r, d) = (center as isize, radius as isize, dim as isize);
            (c - r..=c + r).map(|v| v.rem_euclid(d) as usize).collect()
        } else {
            let low = center.saturating_sub(radius);
            let high = (center + radius).min(dim.saturating_sub(1));
            (low..=high).collect()
        }
    }
}

/// Odometer over the cartesian product of the covered coordinates of every dimension.
pub struct NeighborhoodIter<'a> {
    topology: &'a Topology,
    axes: Vec<Vec<usize>>,
    cursor: Option<Vec<usize>>,
}

impl Iterator for NeighborhoodIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;

        let result = cursor
            .iter()
            .zip(&self.axes)
            .zip(&self.topology.strides)
            .map(|((&position, axis), &stride)| axis[position] * stride)
            .sum();

        for i in (0..cursor.len()).rev() {
            if cursor[i] + 1 < self.axes[i].len() {
                cursor[i] += 1;
                cursor.iter_mut().skip(i + 1).for_each(|position| *position = 0);
                return Some(result);
            }
        }

        self.cursor.take();

        Some(result)
    }
}
