use super::cell::Cell;
use crate::common::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Moves along its row; the column changes.
    Horizontal,
    /// Moves along its column; the row changes.
    Vertical,
}

/// An occupant that shuttles between two cells on its own schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicObstacle {
    pub id: String,
    pub position: Cell,
    pub start: Cell,
    pub end: Cell,
    pub axis: Axis,
    pub direction: i8,
    pub ticks_per_step: u32,
    #[serde(skip)]
    move_timer: u32,
}

impl DynamicObstacle {
    pub fn new(id: String, start: Cell, end: Cell, axis: Axis, ticks_per_step: u32) -> DomainResult<Self> {
        if ticks_per_step == 0 {
            return Err(DomainError::InvalidCommand {
                reason: format!("Obstacle {} needs at least one tick per step", id),
            });
        }
        let aligned = match axis {
            Axis::Horizontal => start.row == end.row,
            Axis::Vertical => start.col == end.col,
        };
        if !aligned {
            return Err(DomainError::InvalidCommand {
                reason: format!("Obstacle {} endpoints {} and {} do not share its axis", id, start, end),
            });
        }
        Ok(Self {
            id,
            position: start,
            start,
            end,
            axis,
            direction: 1,
            ticks_per_step,
            move_timer: 0,
        })
    }

    fn target(&self) -> Cell {
        if self.direction > 0 {
            self.end
        } else {
            self.start
        }
    }

    fn reverse(&mut self) {
        self.direction = -self.direction;
    }

    /// Called once per simulation tick; the obstacle only moves every
    /// `ticks_per_step` calls.
    pub fn advance(&mut self, rows: usize, cols: usize) {
        self.move_timer += 1;
        if self.move_timer < self.ticks_per_step {
            return;
        }
        self.move_timer = 0;

        let target = self.target();
        let (current, goal, limit) = match self.axis {
            Axis::Horizontal => (self.position.col, target.col, cols),
            Axis::Vertical => (self.position.row, target.row, rows),
        };
        if current == goal {
            self.reverse();
            return;
        }

        let next = current as i64 + self.direction as i64;
        if next < 0 || next >= limit as i64 {
            self.reverse();
            return;
        }
        self.position = match self.axis {
            Axis::Horizontal => Cell::new(self.position.row, next as usize),
            Axis::Vertical => Cell::new(next as usize, self.position.col),
        };
        if self.position == target {
            self.reverse();
        }
    }
}
