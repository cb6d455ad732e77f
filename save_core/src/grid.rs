//! Parsing of the packed numeric arrays stored in world documents.

use save_proto::{Grid, ShapeError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("invalid numeric token '{token}' at index {index}")]
    InvalidToken { index: usize, token: String },
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Parse one array token.
///
/// Trailing dots are stripped first: some saves write evaporation modifiers
/// as `0.87.`. Non-finite values (`NaN`, `inf`, overflowing exponents) are
/// rejected; snapshots are stored as JSON, which cannot hold them.
pub fn parse_token(token: &str) -> Option<f64> {
    token
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse a whitespace-delimited array into values in save order.
pub fn parse_packed_values(packed: &str) -> Result<Vec<f64>, GridError> {
    packed
        .split_whitespace()
        .enumerate()
        .map(|(index, token)| {
            parse_token(token).ok_or_else(|| GridError::InvalidToken {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Parse a packed array and reshape it into map orientation.
pub fn parse_packed_grid(packed: &str, width: u32, height: u32) -> Result<Grid, GridError> {
    let values = parse_packed_values(packed)?;
    Ok(Grid::from_stored(width, height, values)?)
}

/// Render values in save order back into the packed text layout.
pub fn format_packed_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
