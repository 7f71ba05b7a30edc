//! Material removal contracts
//!
//! The player only knows [`MaterialRemoval`]. Tool and stock volumes stay
//! opaque: a tool can be swept at a point, a stock can have a solid
//! subtracted from it. [`StockRemoval`] glues the two together.

use parking_lot::Mutex;
use pathplay_core::{Point3, SimulationError};
use std::sync::Arc;

/// Hook invoked by the player at the marker position
pub trait MaterialRemoval: Send {
    fn remove_at(&mut self, position: Point3) -> Result<(), SimulationError>;
}

/// A tool shape that can be placed at a point
pub trait ToolVolume {
    type Solid;

    /// The solid the tool occupies with its tip at `position`
    fn sweep_at(&self, position: Point3) -> Result<Self::Solid, SimulationError>;
}

/// A stock body that material can be cut from
pub trait StockVolume<S> {
    /// Remove `solid` from the stock
    fn subtract(&mut self, solid: &S) -> Result<(), SimulationError>;
}

/// Removal hook cutting `tool` out of a shared `stock`
///
/// The stock sits behind a mutex so a renderer can read it between ticks.
pub struct StockRemoval<T, S> {
    tool: T,
    stock: Arc<Mutex<S>>,
}

impl<T, S> StockRemoval<T, S> {
    pub fn new(tool: T, stock: Arc<Mutex<S>>) -> Self {
        Self { tool, stock }
    }

    /// Shared handle to the stock
    pub fn stock(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.stock)
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }
}

impl<T, S> MaterialRemoval for StockRemoval<T, S>
where
    T: ToolVolume + Send,
    S: StockVolume<T::Solid> + Send,
{
    fn remove_at(&mut self, position: Point3) -> Result<(), SimulationError> {
        let solid = self.tool.sweep_at(position)?;
        self.stock.lock().subtract(&solid)
    }
}

impl<F> MaterialRemoval for F
where
    F: FnMut(Point3) -> Result<(), SimulationError> + Send,
{
    fn remove_at(&mut self, position: Point3) -> Result<(), SimulationError> {
        self(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PointTool;

    impl ToolVolume for PointTool {
        type Solid = Point3;

        fn sweep_at(&self, position: Point3) -> Result<Point3, SimulationError> {
            Ok(position)
        }
    }

    #[derive(Default)]
    struct CutList(Vec<Point3>);

    impl StockVolume<Point3> for CutList {
        fn subtract(&mut self, solid: &Point3) -> Result<(), SimulationError> {
            if solid.z > 0.0 {
                return Err(SimulationError::MaterialRemoval {
                    reason: "above stock".to_string(),
                });
            }
            self.0.push(*solid);
            Ok(())
        }
    }

    #[test]
    fn test_stock_removal_forwards_to_stock() {
        let stock = Arc::new(Mutex::new(CutList::default()));
        let mut removal = StockRemoval::new(PointTool, Arc::clone(&stock));
        removal.remove_at(Point3::new(1.0, 2.0, -1.0)).unwrap();
        assert!(removal.remove_at(Point3::new(0.0, 0.0, 1.0)).is_err());
        assert_eq!(stock.lock().0, vec![Point3::new(1.0, 2.0, -1.0)]);
    }

    #[test]
    fn test_closure_is_a_removal_hook() {
        let mut calls = 0;
        let mut hook = |_: Point3| -> Result<(), SimulationError> {
            calls += 1;
            Ok(())
        };
        hook.remove_at(Point3::ORIGIN).unwrap();
        drop(hook);
        assert_eq!(calls, 1);
    }
}
