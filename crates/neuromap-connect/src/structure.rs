//! Spatial structures assigning positions to the neurons of a population

use crate::error::{ConnectError, Result};
use crate::space::Position;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Order in which grid points are assigned to neuron indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "order", rename_all = "snake_case"))]
pub enum FillOrder {
    /// Row-major grid order
    #[default]
    Sequential,
    /// Seeded random permutation of the grid points
    Random {
        /// Permutation seed
        seed: u64,
    },
}

/// Volume random positions are drawn from, centred on the origin
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "shape", rename_all = "snake_case"))]
pub enum Boundary {
    /// Axis-aligned box
    Cuboid {
        /// Extent along x
        width: f64,
        /// Extent along y
        height: f64,
        /// Extent along z
        depth: f64,
    },
    /// Ball
    Sphere {
        /// Radius
        radius: f64,
    },
}

impl Boundary {
    fn validate(&self) -> Result<()> {
        let check = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ConnectError::invalid_parameter(name, v.to_string(), "finite and >= 0"))
            }
        };
        match *self {
            Self::Cuboid { width, height, depth } => {
                check("width", width)?;
                check("height", height)?;
                check("depth", depth)
            }
            Self::Sphere { radius } => check("radius", radius),
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Position {
        match *self {
            Self::Cuboid { width, height, depth } => [
                (rng.gen::<f64>() - 0.5) * width,
                (rng.gen::<f64>() - 0.5) * height,
                (rng.gen::<f64>() - 0.5) * depth,
            ],
            Self::Sphere { radius } => loop {
                let p: Position = [
                    rng.gen::<f64>() * 2.0 - 1.0,
                    rng.gen::<f64>() * 2.0 - 1.0,
                    rng.gen::<f64>() * 2.0 - 1.0,
                ];
                if p.iter().map(|v| v * v).sum::<f64>() <= 1.0 {
                    break [p[0] * radius, p[1] * radius, p[2] * radius];
                }
            },
        }
    }
}

/// Arrangement of a population's neurons in space
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Structure {
    /// Evenly spaced along x
    Line {
        /// Spacing
        dx: f64,
        /// Position of neuron 0
        x0: f64,
        /// Fixed y
        y: f64,
        /// Fixed z
        z: f64,
    },
    /// Rectangular grid in the z plane
    #[cfg_attr(feature = "serde", serde(rename = "grid_2d"))]
    Grid2D {
        /// Ratio of columns to rows
        aspect_ratio: f64,
        /// Spacing along x
        dx: f64,
        /// Spacing along y
        dy: f64,
        /// Grid origin x
        x0: f64,
        /// Grid origin y
        y0: f64,
        /// Fixed z
        z: f64,
        /// Point-to-index assignment
        fill_order: FillOrder,
    },
    /// Cuboid grid
    #[cfg_attr(feature = "serde", serde(rename = "grid_3d"))]
    Grid3D {
        /// Ratio of x extent to y extent
        aspect_ratio_xy: f64,
        /// Ratio of x extent to z extent
        aspect_ratio_xz: f64,
        /// Spacing along x
        dx: f64,
        /// Spacing along y
        dy: f64,
        /// Spacing along z
        dz: f64,
        /// Grid origin x
        x0: f64,
        /// Grid origin y
        y0: f64,
        /// Grid origin z
        z0: f64,
        /// Point-to-index assignment
        fill_order: FillOrder,
    },
    /// Uniformly random inside a boundary
    Random {
        /// Sampling volume
        boundary: Boundary,
        /// Centre of the volume
        origin: Position,
        /// Position seed
        seed: u64,
    },
}

impl Structure {
    /// Line with unit spacing starting at the origin
    pub fn line() -> Self {
        Self::Line {
            dx: 1.0,
            x0: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Unit-spaced 2D grid with the given aspect ratio
    pub fn grid_2d(aspect_ratio: f64) -> Self {
        Self::Grid2D {
            aspect_ratio,
            dx: 1.0,
            dy: 1.0,
            x0: 0.0,
            y0: 0.0,
            z: 0.0,
            fill_order: FillOrder::Sequential,
        }
    }

    /// Unit-spaced 3D grid with the given aspect ratios
    pub fn grid_3d(aspect_ratio_xy: f64, aspect_ratio_xz: f64) -> Self {
        Self::Grid3D {
            aspect_ratio_xy,
            aspect_ratio_xz,
            dx: 1.0,
            dy: 1.0,
            dz: 1.0,
            x0: 0.0,
            y0: 0.0,
            z0: 0.0,
            fill_order: FillOrder::Sequential,
        }
    }

    /// Short structure name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Line { .. } => "line",
            Self::Grid2D { .. } => "grid_2d",
            Self::Grid3D { .. } => "grid_3d",
            Self::Random { .. } => "random",
        }
    }

    /// Grid dimensions for `n` points; fails when the grid cannot hold exactly `n`
    pub fn grid_shape(&self, n: usize) -> Result<[usize; 3]> {
        match *self {
            Self::Line { .. } | Self::Random { .. } => Ok([n, 1, 1]),
            Self::Grid2D { aspect_ratio, .. } => {
                positive("aspect_ratio", aspect_ratio)?;
                let nx = whole((n as f64 * aspect_ratio).sqrt()).filter(|&nx| nx > 0 && n % nx == 0);
                match nx {
                    Some(nx) => Ok([nx, n / nx, 1]),
                    None => Err(ConnectError::invalid_config(format!(
                        "{} neurons do not fill a 2D grid with aspect ratio {}",
                        n, aspect_ratio
                    ))),
                }
            }
            Self::Grid3D {
                aspect_ratio_xy,
                aspect_ratio_xz,
                ..
            } => {
                positive("aspect_ratio_xy", aspect_ratio_xy)?;
                positive("aspect_ratio_xz", aspect_ratio_xz)?;
                let nx = (n as f64 * aspect_ratio_xy * aspect_ratio_xz).cbrt();
                let shape = whole(nx)
                    .zip(whole(nx / aspect_ratio_xy))
                    .zip(whole(nx / aspect_ratio_xz))
                    .map(|((x, y), z)| [x, y, z])
                    .filter(|s| s[0] * s[1] * s[2] == n);
                shape.ok_or_else(|| {
                    ConnectError::invalid_config(format!(
                        "{} neurons do not fill a 3D grid with aspect ratios {} (xy) and {} (xz)",
                        n, aspect_ratio_xy, aspect_ratio_xz
                    ))
                })
            }
        }
    }

    /// Positions of `n` neurons
    pub fn generate_positions(&self, n: usize) -> Result<Vec<Position>> {
        match *self {
            Self::Line { dx, x0, y, z } => Ok((0..n).map(|i| [x0 + dx * i as f64, y, z]).collect()),
            Self::Grid2D {
                dx,
                dy,
                x0,
                y0,
                z,
                fill_order,
                ..
            } => {
                let [_, ny, _] = self.grid_shape(n)?;
                let mut positions: Vec<Position> = (0..n)
                    .map(|i| [x0 + dx * (i / ny) as f64, y0 + dy * (i % ny) as f64, z])
                    .collect();
                fill(&mut positions, fill_order);
                Ok(positions)
            }
            Self::Grid3D {
                dx,
                dy,
                dz,
                x0,
                y0,
                z0,
                fill_order,
                ..
            } => {
                let [_, ny, nz] = self.grid_shape(n)?;
                let mut positions: Vec<Position> = (0..n)
                    .map(|i| {
                        [
                            x0 + dx * (i / (ny * nz)) as f64,
                            y0 + dy * ((i / nz) % ny) as f64,
                            z0 + dz * (i % nz) as f64,
                        ]
                    })
                    .collect();
                fill(&mut positions, fill_order);
                Ok(positions)
            }
            Self::Random {
                boundary,
                origin,
                seed,
            } => {
                boundary.validate()?;
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                Ok((0..n)
                    .map(|_| {
                        let p = boundary.sample(&mut rng);
                        [origin[0] + p[0], origin[1] + p[1], origin[2] + p[2]]
                    })
                    .collect())
            }
        }
    }
}

fn positive(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ConnectError::invalid_parameter(name, v.to_string(), "finite and > 0"))
    }
}

/// `v` as an integer when it is one, up to rounding noise
fn whole(v: f64) -> Option<usize> {
    let r = v.round();
    ((v - r).abs() < 1e-9 && r >= 0.0).then_some(r as usize)
}

fn fill(positions: &mut [Position], order: FillOrder) {
    if let FillOrder::Random { seed } = order {
        positions.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line() {
        let positions = Structure::line().generate_positions(3).unwrap();
        assert_eq!(positions, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_grid_2d() {
        let grid = Structure::grid_2d(1.0);
        assert_eq!(grid.grid_shape(9).unwrap(), [3, 3, 1]);
        let positions = grid.generate_positions(9).unwrap();
        assert_eq!(positions[0], [0.0, 0.0, 0.0]);
        assert_eq!(positions[1], [0.0, 1.0, 0.0]);
        assert_eq!(positions[3], [1.0, 0.0, 0.0]);
        assert_eq!(positions[8], [2.0, 2.0, 0.0]);

        assert_eq!(Structure::grid_2d(2.0).grid_shape(8).unwrap(), [4, 2, 1]);
    }

    #[test]
    fn test_grid_size_mismatch() {
        let err = Structure::grid_2d(1.0).generate_positions(10).unwrap_err();
        assert!(err.is_configuration());
        assert!(Structure::grid_3d(1.0, 1.0).generate_positions(9).is_err());
        assert!(Structure::grid_2d(0.0).grid_shape(4).is_err());
    }

    #[test]
    fn test_grid_3d() {
        let grid = Structure::grid_3d(1.0, 1.0);
        assert_eq!(grid.grid_shape(8).unwrap(), [2, 2, 2]);
        let positions = grid.generate_positions(8).unwrap();
        assert_eq!(positions[1], [0.0, 0.0, 1.0]);
        assert_eq!(positions[2], [0.0, 1.0, 0.0]);
        assert_eq!(positions[4], [1.0, 0.0, 0.0]);
        assert_eq!(positions[7], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_random_fill_is_permutation() {
        let sequential = Structure::grid_2d(1.0).generate_positions(16).unwrap();
        let shuffled = Structure::Grid2D {
            aspect_ratio: 1.0,
            dx: 1.0,
            dy: 1.0,
            x0: 0.0,
            y0: 0.0,
            z: 0.0,
            fill_order: FillOrder::Random { seed: 3 },
        }
        .generate_positions(16)
        .unwrap();
        assert_ne!(sequential, shuffled);
        let key = |p: &Position| (p[0] as i64, p[1] as i64);
        let mut a: Vec<_> = sequential.iter().map(key).collect();
        let mut b: Vec<_> = shuffled.iter().map(key).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_structure() {
        let sphere = Structure::Random {
            boundary: Boundary::Sphere { radius: 2.0 },
            origin: [10.0, 0.0, 0.0],
            seed: 1,
        };
        let positions = sphere.generate_positions(100).unwrap();
        assert_eq!(positions, sphere.generate_positions(100).unwrap());
        for p in &positions {
            let r2 = (p[0] - 10.0).powi(2) + p[1].powi(2) + p[2].powi(2);
            assert!(r2 <= 4.0 + 1e-12);
        }

        let cuboid = Structure::Random {
            boundary: Boundary::Cuboid {
                width: 2.0,
                height: 4.0,
                depth: 0.0,
            },
            origin: [0.0; 3],
            seed: 1,
        };
        for p in cuboid.generate_positions(100).unwrap() {
            assert!(p[0].abs() <= 1.0 && p[1].abs() <= 2.0 && p[2] == 0.0);
        }
    }
}
