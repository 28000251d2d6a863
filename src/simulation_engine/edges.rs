// edges.rs
//
// Typed edge labels. String handling for edge names lives here only; the
// rest of the crate passes `EdgeLabel` values around.

use crate::error::{GridEnvError, Result};
use crate::global_variables::{CENTER_PREFIX, INTERNAL_EDGE_MARKER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Orientation family of a through edge.
///
/// `Bot` runs eastbound and `Top` westbound along a row; `Right` runs
/// northbound and `Left` southbound along a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    Bot,
    Top,
    Left,
    Right,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::Bot => "bot",
            EdgeType::Top => "top",
            EdgeType::Left => "left",
            EdgeType::Right => "right",
        }
    }

    /// Bot/top edges run along rows.
    pub fn is_horizontal(self) -> bool {
        matches!(self, EdgeType::Bot | EdgeType::Top)
    }
}

impl FromStr for EdgeType {
    type Err = GridEnvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bot" => Ok(EdgeType::Bot),
            "top" => Ok(EdgeType::Top),
            "left" => Ok(EdgeType::Left),
            "right" => Ok(EdgeType::Right),
            other => Err(GridEnvError::invalid_edge(other, "unknown edge type")),
        }
    }
}

/// A road segment between two nodes (or a node and the grid border).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThroughEdge {
    pub edge_type: EdgeType,
    pub row: usize,
    pub col: usize,
}

impl ThroughEdge {
    pub fn new(edge_type: EdgeType, row: usize, col: usize) -> Self {
        Self { edge_type, row, col }
    }
}

/// Any edge of the grid network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeLabel {
    Through(ThroughEdge),
    /// Connector inside intersection `n` (linear intersection index).
    Center(usize),
}

impl EdgeLabel {
    pub fn through(edge_type: EdgeType, row: usize, col: usize) -> Self {
        EdgeLabel::Through(ThroughEdge::new(edge_type, row, col))
    }

    pub fn is_center(&self) -> bool {
        matches!(self, EdgeLabel::Center(_))
    }

    pub fn as_through(&self) -> Option<&ThroughEdge> {
        match self {
            EdgeLabel::Through(edge) => Some(edge),
            EdgeLabel::Center(_) => None,
        }
    }

    /// Parses simulator edge names such as `bot0_2`, `left1_0` or
    /// `:center3_1` (the internal-lane suffix is ignored).
    pub fn parse(label: &str) -> Result<Self> {
        if let Some(rest) = label.strip_prefix(INTERNAL_EDGE_MARKER) {
            return parse_center(label, rest);
        }

        let split = label
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(|| GridEnvError::invalid_edge(label, "missing row/column suffix"))?;
        let (prefix, coords) = label.split_at(split);
        let edge_type: EdgeType = prefix
            .parse()
            .map_err(|_| GridEnvError::invalid_edge(label, "unknown edge type"))?;

        let (row, col) = coords
            .split_once('_')
            .ok_or_else(|| GridEnvError::invalid_edge(label, "expected '<row>_<col>'"))?;
        let row = parse_number(label, row)?;
        let col = parse_number(label, col)?;
        Ok(EdgeLabel::through(edge_type, row, col))
    }
}

fn parse_center(label: &str, rest: &str) -> Result<EdgeLabel> {
    let digits = rest
        .strip_prefix(CENTER_PREFIX)
        .ok_or_else(|| GridEnvError::invalid_edge(label, "internal edge is not a center edge"))?;
    let id = match digits.split_once('_') {
        Some((id, lane)) => {
            parse_number(label, lane)?;
            id
        }
        None => digits,
    };
    Ok(EdgeLabel::Center(parse_number(label, id)?))
}

fn parse_number(label: &str, digits: &str) -> Result<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GridEnvError::invalid_edge(label, format!("'{digits}' is not an index")));
    }
    digits
        .parse()
        .map_err(|_| GridEnvError::invalid_edge(label, format!("'{digits}' is out of range")))
}

impl FromStr for EdgeLabel {
    type Err = GridEnvError;

    fn from_str(s: &str) -> Result<Self> {
        EdgeLabel::parse(s)
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeLabel::Through(edge) => {
                write!(f, "{}{}_{}", edge.edge_type.as_str(), edge.row, edge.col)
            }
            EdgeLabel::Center(id) => write!(f, "{INTERNAL_EDGE_MARKER}{CENTER_PREFIX}{id}"),
        }
    }
}
