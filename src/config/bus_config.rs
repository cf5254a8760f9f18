use serde::Deserialize;

/// The `[bus]` table: the i2c-dev node the sensor hangs off
#[derive(Debug, Clone, Deserialize)]
pub struct BusEntry {
    pub path: String,
}

impl Default for BusEntry {
    fn default() -> Self {
        Self {
            path: "/dev/i2c-1".to_string(),
        }
    }
}
