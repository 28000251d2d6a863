// edge_indexer.rs
//
// Dense, stable numbering of every edge of the grid. Observation vectors
// depend on this layout, so the ordering below is a contract:
//
//   row-block r = 0..=rows
//     horizontal pairs of row r (r < rows), by column: bot, top
//     vertical pairs of row r, by column:             left, right
//   center edges, by intersection id
//
// With B = 4 * cols + 2 edges per full row-block:
//   bot/top(r, c)    = r * B + 2c + {0, 1}
//   left/right(r, c) = r * B + 2(cols + 1) + 2c + {0, 1}   (r < rows)
//                    = rows * B + 2c + {0, 1}              (r = rows)
//   center(i)        = num_through_edges + i

use crate::error::{GridEnvError, Result};
use crate::simulation_engine::edges::{EdgeLabel, EdgeType, ThroughEdge};
use crate::simulation_engine::grid::Grid;

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeIndexer {
    grid: Grid,
}

impl EdgeIndexer {
    pub fn new(grid: &Grid) -> Self {
        Self { grid: grid.clone() }
    }

    pub fn num_edges(&self) -> usize {
        self.grid.num_edges()
    }

    pub fn num_through_edges(&self) -> usize {
        self.grid.num_through_edges()
    }

    fn block_size(&self) -> usize {
        4 * self.grid.cols() + 2
    }

    fn horizontal_span(&self) -> usize {
        2 * (self.grid.cols() + 1)
    }

    pub fn index_of(&self, label: &EdgeLabel) -> Result<usize> {
        self.grid.validate_edge(label)?;
        let index = match label {
            EdgeLabel::Center(id) => self.num_through_edges() + id,
            EdgeLabel::Through(edge) => {
                let block = edge.row * self.block_size();
                match edge.edge_type {
                    EdgeType::Bot | EdgeType::Top => {
                        block + 2 * edge.col + pair_offset(edge.edge_type)
                    }
                    EdgeType::Left | EdgeType::Right => {
                        let span = if edge.row < self.grid.rows() {
                            self.horizontal_span()
                        } else {
                            0
                        };
                        block + span + 2 * edge.col + pair_offset(edge.edge_type)
                    }
                }
            }
        };
        Ok(index)
    }

    /// Parses a simulator edge name and returns its index.
    pub fn index_of_str(&self, label: &str) -> Result<usize> {
        self.index_of(&EdgeLabel::parse(label)?)
    }

    pub fn label_of(&self, index: usize) -> Result<EdgeLabel> {
        let through = self.num_through_edges();
        if index >= self.num_edges() {
            return Err(GridEnvError::invalid_edge(
                format!("#{index}"),
                format!("grid has {} edges", self.num_edges()),
            ));
        }
        if index >= through {
            return Ok(EdgeLabel::Center(index - through));
        }

        let row = index / self.block_size();
        let mut offset = index % self.block_size();
        let pair = offset % 2;
        if row < self.grid.rows() && offset < self.horizontal_span() {
            let edge_type = if pair == 0 { EdgeType::Bot } else { EdgeType::Top };
            return Ok(EdgeLabel::through(edge_type, row, offset / 2));
        }
        if row < self.grid.rows() {
            offset -= self.horizontal_span();
        }
        let edge_type = if pair == 0 { EdgeType::Left } else { EdgeType::Right };
        Ok(EdgeLabel::through(edge_type, row, offset / 2))
    }

    /// Index scaled into `[0, 1]`.
    pub fn normalized(&self, index: usize) -> f64 {
        index as f64 / (self.num_edges() - 1) as f64
    }

    /// All through edges in index order.
    pub fn through_edges(&self) -> impl Iterator<Item = ThroughEdge> + '_ {
        (0..self.num_through_edges()).filter_map(move |index| match self.label_of(index) {
            Ok(EdgeLabel::Through(edge)) => Some(edge),
            _ => None,
        })
    }
}

fn pair_offset(edge_type: EdgeType) -> usize {
    match edge_type {
        EdgeType::Bot | EdgeType::Left => 0,
        EdgeType::Top | EdgeType::Right => 1,
    }
}
