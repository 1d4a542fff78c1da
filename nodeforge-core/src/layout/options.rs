//! Layout Options
//!
//! Spacing and origin for the layered layout. Options can be built in code
//! or read from a JSON document; missing fields fall back to the defaults.

use serde::{Deserialize, Serialize};

use super::LayoutError;

/// Spacing and origin used when positioning layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Horizontal distance between consecutive layers.
    pub x_spacing: f32,
    /// Vertical distance between nodes of one layer.
    pub y_spacing: f32,
    /// x of layer 0.
    pub start_x: f32,
    /// Vertical center of every layer.
    pub start_y: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            x_spacing: 250.0,
            y_spacing: 150.0,
            start_x: -1400.0,
            start_y: 0.0,
        }
    }
}

impl LayoutOptions {
    pub fn with_x_spacing(mut self, x_spacing: f32) -> Self {
        self.x_spacing = x_spacing;
        self
    }

    pub fn with_y_spacing(mut self, y_spacing: f32) -> Self {
        self.y_spacing = y_spacing;
        self
    }

    /// Move the origin of layer 0.
    pub fn with_start(mut self, start_x: f32, start_y: f32) -> Self {
        self.start_x = start_x;
        self.start_y = start_y;
        self
    }

    /// Parse options from JSON and validate them.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject non-finite values and negative spacing.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let fields = [
            ("x_spacing", self.x_spacing),
            ("y_spacing", self.y_spacing),
            ("start_x", self.start_x),
            ("start_y", self.start_y),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(LayoutError::InvalidOptions(format!(
                    "{field} must be finite, got {value}"
                )));
            }
        }
        for (field, value) in &fields[..2] {
            if *value < 0.0 {
                return Err(LayoutError::InvalidOptions(format!(
                    "{field} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}
