//! Voxel stock model
//!
//! A dense grid of material cells over an axis-aligned stock block. The ball
//! tool removes every cell whose center falls inside its sphere.

use glam::Vec3;
use pathplay_core::{Point3, SimulationError};
use tracing::debug;

use crate::removal::{StockVolume, ToolVolume};

const MATERIAL: u8 = 255;
const REMOVED: u8 = 0;

/// Sphere in stock coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Ball-end tool; the sphere center sits one radius above the tip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallTool {
    radius: f32,
}

impl BallTool {
    pub fn new(radius: f64) -> Result<Self, SimulationError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SimulationError::MaterialRemoval {
                reason: format!("tool radius must be > 0, got {}", radius),
            });
        }
        Ok(Self {
            radius: radius as f32,
        })
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl ToolVolume for BallTool {
    type Solid = Sphere;

    fn sweep_at(&self, position: Point3) -> Result<Sphere, SimulationError> {
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            return Err(SimulationError::MaterialRemoval {
                reason: format!("non-finite tool position {}", position),
            });
        }
        Ok(Sphere {
            center: Vec3::new(
                position.x as f32,
                position.y as f32,
                position.z as f32 + self.radius,
            ),
            radius: self.radius,
        })
    }
}

/// Voxelized rectangular stock
#[derive(Debug, Clone)]
pub struct VoxelStock {
    origin: Vec3,
    width: usize,
    height: usize,
    depth: usize,
    resolution: f32,
    voxels: Vec<u8>,
}

impl VoxelStock {
    /// Stock of `size` (x, y, z extents in mm) whose minimum corner is `origin`
    pub fn new(size: (f64, f64, f64), origin: Point3, resolution: f64) -> Result<Self, SimulationError> {
        let (sx, sy, sz) = size;
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(SimulationError::MaterialRemoval {
                reason: format!("voxel resolution must be > 0, got {}", resolution),
            });
        }
        if [sx, sy, sz].iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(SimulationError::MaterialRemoval {
                reason: format!("stock size must be positive, got {:?}", size),
            });
        }

        let width = (sx / resolution).ceil() as usize;
        let height = (sy / resolution).ceil() as usize;
        let depth = (sz / resolution).ceil() as usize;
        debug!(
            "Voxel stock {}x{}x{} cells at {} mm",
            width, height, depth, resolution
        );

        Ok(Self {
            origin: Vec3::new(origin.x as f32, origin.y as f32, origin.z as f32),
            width,
            height,
            depth,
            resolution: resolution as f32,
            voxels: vec![MATERIAL; width * height * depth],
        })
    }

    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.depth)
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn data(&self) -> &[u8] {
        &self.voxels
    }

    pub fn cell_count(&self) -> usize {
        self.voxels.len()
    }

    pub fn removed_count(&self) -> usize {
        self.voxels.iter().filter(|&&v| v == REMOVED).count()
    }

    /// Fraction of cells still holding material
    pub fn remaining_fraction(&self) -> f64 {
        if self.voxels.is_empty() {
            return 0.0;
        }
        1.0 - self.removed_count() as f64 / self.voxels.len() as f64
    }

    fn index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        (x < self.width && y < self.height && z < self.depth)
            .then(|| z * self.width * self.height + y * self.width + x)
    }

    /// True if the cell containing `point` still holds material
    pub fn has_material_at(&self, point: Point3) -> bool {
        let local = (Vec3::new(point.x as f32, point.y as f32, point.z as f32) - self.origin)
            / self.resolution;
        if local.min_element() < 0.0 {
            return false;
        }
        self.index(local.x as usize, local.y as usize, local.z as usize)
            .is_some_and(|i| self.voxels[i] == MATERIAL)
    }

    /// Clear every cell whose center lies inside the sphere
    pub fn remove_sphere(&mut self, center: Vec3, radius: f32) {
        // cell (x, y, z) has its center at (x + 0.5, y + 0.5, z + 0.5) in grid units
        let c = (center - self.origin) / self.resolution - Vec3::splat(0.5);
        let r = radius / self.resolution;
        let r_sq = r * r;

        let lo = (c - Vec3::splat(r)).floor().max(Vec3::ZERO);
        let hi = (c + Vec3::splat(r)).ceil();
        if hi.x < 0.0 || hi.y < 0.0 || hi.z < 0.0 {
            return;
        }
        let max_x = (hi.x as usize).min(self.width.saturating_sub(1));
        let max_y = (hi.y as usize).min(self.height.saturating_sub(1));
        let max_z = (hi.z as usize).min(self.depth.saturating_sub(1));

        for z in lo.z as usize..=max_z {
            for y in lo.y as usize..=max_y {
                for x in lo.x as usize..=max_x {
                    let d = Vec3::new(x as f32, y as f32, z as f32) - c;
                    if d.length_squared() <= r_sq {
                        if let Some(i) = self.index(x, y, z) {
                            self.voxels[i] = REMOVED;
                        }
                    }
                }
            }
        }
    }
}

impl StockVolume<Sphere> for VoxelStock {
    fn subtract(&mut self, solid: &Sphere) -> Result<(), SimulationError> {
        if !solid.center.is_finite() || !solid.radius.is_finite() {
            return Err(SimulationError::MaterialRemoval {
                reason: "non-finite sphere".to_string(),
            });
        }
        self.remove_sphere(solid.center, solid.radius);
        Ok(())
    }
}
