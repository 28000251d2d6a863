use crate::config::GridConfig;
use crate::error::{GridEnvError, Result};
use crate::global_variables::{CENTER_PREFIX, INTERNAL_EDGE_MARKER};
use crate::simulation_engine::edges::{EdgeLabel, EdgeType, ThroughEdge};
use crate::simulation_engine::intersections::{Direction, IntersectionId};

/// Immutable description of a `rows` x `cols` traffic light grid.
///
/// Intersections sit at 1-based `(x, y)` with `x` the column and `y` the
/// row. Horizontal through edges (`bot`, `top`) exist for every row and
/// `cols + 1` column gaps; vertical ones (`left`, `right`) for every column
/// and `rows + 1` row gaps. Each intersection also owns one center edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    short_length: f64,
    long_length: f64,
    inner_length: f64,
    horizontal_lanes: usize,
    vertical_lanes: usize,
}

impl Grid {
    pub fn from_config(config: &GridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rows: config.rows,
            cols: config.cols,
            short_length: config.short_length,
            long_length: config.long_length,
            inner_length: config.inner_length,
            horizontal_lanes: config.horizontal_lanes,
            vertical_lanes: config.vertical_lanes,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn horizontal_lanes(&self) -> usize {
        self.horizontal_lanes
    }

    pub fn vertical_lanes(&self) -> usize {
        self.vertical_lanes
    }

    pub fn num_intersections(&self) -> usize {
        self.rows * self.cols
    }

    pub fn num_through_edges(&self) -> usize {
        2 * self.rows * (self.cols + 1) + 2 * self.cols * (self.rows + 1)
    }

    /// Through edges plus one center edge per intersection.
    pub fn num_edges(&self) -> usize {
        self.num_through_edges() + self.num_intersections()
    }

    /// Longest segment; used to normalise distances.
    pub fn max_segment_length(&self) -> f64 {
        self.short_length.max(self.long_length).max(self.inner_length)
    }

    // --- Intersections ---

    pub fn intersection(&self, index: usize) -> Result<IntersectionId> {
        if index < self.num_intersections() {
            Ok(IntersectionId::new_unchecked(index))
        } else {
            Err(GridEnvError::invalid_edge(
                format!("{CENTER_PREFIX}{index}"),
                format!("grid has {} intersections", self.num_intersections()),
            ))
        }
    }

    /// Looks up the intersection at 1-based `(x, y)`.
    pub fn intersection_at(&self, x: usize, y: usize) -> Result<IntersectionId> {
        if x == 0 || y == 0 || x > self.cols || y > self.rows {
            return Err(GridEnvError::invalid_edge(
                format!("({x}.{y})"),
                format!("outside a {}x{} grid", self.rows, self.cols),
            ));
        }
        Ok(IntersectionId::new_unchecked((x - 1) + (y - 1) * self.cols))
    }

    /// 1-based `(x, y)` of an intersection.
    pub fn coordinates(&self, id: IntersectionId) -> (usize, usize) {
        (id.index() % self.cols + 1, id.index() / self.cols + 1)
    }

    pub fn intersections(&self) -> impl Iterator<Item = IntersectionId> {
        (0..self.num_intersections()).map(IntersectionId::new_unchecked)
    }

    /// Accepts `center{id}`, `(x.y)` and `:(x.y)` node names.
    pub fn parse_node(&self, label: &str) -> Result<IntersectionId> {
        if let Some(index) = label.strip_prefix(CENTER_PREFIX) {
            let index = index
                .parse()
                .map_err(|_| GridEnvError::invalid_edge(label, "malformed node index"))?;
            return self.intersection(index);
        }

        let coords = label
            .trim_start_matches(INTERNAL_EDGE_MARKER)
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|inner| inner.split_once('.'))
            .ok_or_else(|| GridEnvError::invalid_edge(label, "expected center{id} or (x.y)"))?;
        let x = coords
            .0
            .parse()
            .map_err(|_| GridEnvError::invalid_edge(label, "malformed x coordinate"))?;
        let y = coords
            .1
            .parse()
            .map_err(|_| GridEnvError::invalid_edge(label, "malformed y coordinate"))?;
        self.intersection_at(x, y)
    }

    /// Neighbor of `id` in `direction`, or `None` at the grid border.
    pub fn neighbor(&self, id: IntersectionId, direction: Direction) -> Option<IntersectionId> {
        let index = id.index();
        let neighbor = match direction {
            Direction::Top => Some(index + self.cols).filter(|&n| n < self.num_intersections()),
            Direction::Bottom => index.checked_sub(self.cols),
            Direction::Left => (index % self.cols != 0).then(|| index - 1),
            Direction::Right => (index % self.cols != self.cols - 1).then(|| index + 1),
        };
        neighbor.map(IntersectionId::new_unchecked)
    }

    /// String-level form of [`Grid::neighbor`] for simulator node names.
    pub fn relative_node(&self, node: &str, direction: &str) -> Result<Option<IntersectionId>> {
        let direction: Direction = direction.parse()?;
        let id = self.parse_node(node)?;
        Ok(self.neighbor(id, direction))
    }

    // --- Edges ---

    /// Checks that `label` names an edge of this grid.
    pub fn validate_edge(&self, label: &EdgeLabel) -> Result<()> {
        let in_bounds = match label {
            EdgeLabel::Center(id) => *id < self.num_intersections(),
            EdgeLabel::Through(edge) if edge.edge_type.is_horizontal() => {
                edge.row < self.rows && edge.col <= self.cols
            }
            EdgeLabel::Through(edge) => edge.row <= self.rows && edge.col < self.cols,
        };
        if in_bounds {
            Ok(())
        } else {
            Err(GridEnvError::invalid_edge(
                label.to_string(),
                format!("outside a {}x{} grid", self.rows, self.cols),
            ))
        }
    }

    /// Intersection a through edge leads into, `None` for terminal edges.
    pub fn downstream_intersection(&self, edge: &ThroughEdge) -> Option<IntersectionId> {
        let (row, col) = match edge.edge_type {
            EdgeType::Bot => (edge.col < self.cols).then_some((edge.row, edge.col))?,
            EdgeType::Top => (edge.col > 0).then(|| (edge.row, edge.col - 1))?,
            EdgeType::Right => (edge.row < self.rows).then_some((edge.row, edge.col))?,
            EdgeType::Left => (edge.row > 0).then(|| (edge.row - 1, edge.col))?,
        };
        Some(IntersectionId::new_unchecked(col + row * self.cols))
    }

    /// Terminal edges leave the grid; vehicles on them get rerouted.
    pub fn is_terminal(&self, edge: &ThroughEdge) -> bool {
        match edge.edge_type {
            EdgeType::Bot => edge.col == self.cols,
            EdgeType::Top => edge.col == 0,
            EdgeType::Left => edge.row == 0,
            EdgeType::Right => edge.row == self.rows,
        }
    }

    /// Entrance edges start at the grid border.
    pub fn is_entrance(&self, edge: &ThroughEdge) -> bool {
        match edge.edge_type {
            EdgeType::Bot => edge.col == 0,
            EdgeType::Top => edge.col == self.cols,
            EdgeType::Left => edge.row == self.rows,
            EdgeType::Right => edge.row == 0,
        }
    }

    /// Entrance edge on the opposite side of the same row or column.
    pub fn entrance_for(&self, edge: &ThroughEdge) -> ThroughEdge {
        match edge.edge_type {
            EdgeType::Bot => ThroughEdge::new(EdgeType::Bot, edge.row, 0),
            EdgeType::Top => ThroughEdge::new(EdgeType::Top, edge.row, self.cols),
            EdgeType::Left => ThroughEdge::new(EdgeType::Left, self.rows, edge.col),
            EdgeType::Right => ThroughEdge::new(EdgeType::Right, 0, edge.col),
        }
    }

    /// Edge a vehicle continues on after driving straight through the
    /// intersection at the end of `edge`.
    pub fn next_straight(&self, edge: &ThroughEdge) -> Option<ThroughEdge> {
        self.downstream_intersection(edge)?;
        let next = match edge.edge_type {
            EdgeType::Bot => ThroughEdge::new(EdgeType::Bot, edge.row, edge.col + 1),
            EdgeType::Top => ThroughEdge::new(EdgeType::Top, edge.row, edge.col - 1),
            EdgeType::Right => ThroughEdge::new(EdgeType::Right, edge.row + 1, edge.col),
            EdgeType::Left => ThroughEdge::new(EdgeType::Left, edge.row - 1, edge.col),
        };
        Some(next)
    }

    /// Incoming approaches of an intersection, ordered top, right, bottom,
    /// left (the order of the signal state string).
    pub fn incoming_edges(&self, id: IntersectionId) -> [ThroughEdge; 4] {
        let row = id.index() / self.cols;
        let col = id.index() % self.cols;
        [
            ThroughEdge::new(EdgeType::Left, row + 1, col),
            ThroughEdge::new(EdgeType::Top, row, col + 1),
            ThroughEdge::new(EdgeType::Right, row, col),
            ThroughEdge::new(EdgeType::Bot, row, col),
        ]
    }

    /// Nominal length: entrance edges are short, terminal edges long,
    /// everything between two intersections uses the inner length.
    pub fn segment_length(&self, edge: &ThroughEdge) -> f64 {
        if self.is_entrance(edge) {
            self.short_length
        } else if self.is_terminal(edge) {
            self.long_length
        } else {
            self.inner_length
        }
    }

    /// Lanes per direction on a through edge.
    pub fn lanes_on(&self, edge: &ThroughEdge) -> usize {
        if edge.edge_type.is_horizontal() {
            self.horizontal_lanes
        } else {
            self.vertical_lanes
        }
    }
}
