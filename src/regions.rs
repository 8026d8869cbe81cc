// src/regions.rs - Screen-space selection targets
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{QuizError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Axis-aligned rectangle as inclusive pixel ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// `[min_x, max_x]`
    pub left: [f64; 2],
    /// `[min_y, max_y]`
    pub top: [f64; 2],
}

impl Bounds {
    pub fn new(left: [f64; 2], top: [f64; 2]) -> Self {
        Self { left, top }
    }

    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            left: [x, x + width],
            top: [y, y + height],
        }
    }

    /// Edges count as inside.
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point.x >= self.left[0]
            && point.x <= self.left[1]
            && point.y >= self.top[0]
            && point.y <= self.top[1]
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.left[0] + self.left[1]) / 2.0,
            (self.top[0] + self.top[1]) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.left[1] - self.left[0]
    }

    pub fn height(&self) -> f64 {
        self.top[1] - self.top[0]
    }

    pub fn is_valid(&self) -> bool {
        self.left[0] <= self.left[1] && self.top[0] <= self.top[1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRegion {
    pub id: RegionId,
    pub bounds: Bounds,
}

impl SelectionRegion {
    pub fn new(id: impl Into<RegionId>, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            bounds,
        }
    }
}

/// Ordered set of regions. Order is the hit-test priority.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionLayout {
    regions: Vec<SelectionRegion>,
}

impl RegionLayout {
    pub fn new(regions: Vec<SelectionRegion>) -> Result<Self> {
        let mut seen = HashSet::new();
        for region in &regions {
            if !seen.insert(region.id.clone()) {
                return Err(QuizError::InvalidConfig(format!(
                    "duplicate region id {}",
                    region.id
                )));
            }
            if !region.bounds.is_valid() {
                return Err(QuizError::InvalidConfig(format!(
                    "region {} has inverted bounds",
                    region.id
                )));
            }
        }
        Ok(Self { regions })
    }

    /// First region (in layout order) containing the point.
    pub fn hit_test(&self, point: &Point2<f64>) -> Option<&RegionId> {
        self.regions
            .iter()
            .find(|region| region.bounds.contains(point))
            .map(|region| &region.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectionRegion> {
        self.regions.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RegionId> {
        self.regions.iter().map(|region| &region.id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
