//! Configuration system
//!
//! World-level tuning constants and the defaults applied to newly attached
//! dynamic bodies. Everything can be loaded from TOML or RON.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Pick the format from the extension
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Motion parameters copied into every new dynamic body
///
/// Units are world units per tick (velocity) and per tick squared (gravity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorDefaults {
    /// Downward acceleration applied after each integration step
    pub gravity: f32,
    /// Horizontal contact tolerance between two dynamic bodies
    pub skin_width: f32,
    /// Maximum gap below a body within which it lands on the ground
    pub snap_height: f32,
    /// Fraction of the penetration depth a body moves to resolve an overlap
    pub penetration_response: f32,
    /// Tallest step a body may walk over without treating it as a wall
    pub climb_height: f32,
    /// Vertical restitution on ground impact
    pub bounce: f32,
    /// Horizontal speed factor applied on a bounce
    pub bounce_horizontal: f32,
    /// Minimum vertical impact speed that triggers a bounce
    pub bounce_min_speed: f32,
    /// Horizontal speed lost per grounded tick
    pub sliding_friction: f32,
}

impl Default for DescriptorDefaults {
    fn default() -> Self {
        let gravity = 0.4;
        Self {
            gravity,
            skin_width: 4.0,
            snap_height: 4.0,
            penetration_response: 0.5,
            climb_height: 16.0,
            bounce: 0.5,
            bounce_horizontal: 0.8,
            bounce_min_speed: gravity * 2.0,
            sliding_friction: 0.0,
        }
    }
}

/// World-level collision configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Defaults for newly attached dynamic bodies
    pub descriptor: DescriptorDefaults,
    /// Minimum thickness added around swept AABBs before pair tests
    pub aabb_padding: f32,
    /// Skin used when probing static colliders with the lower hemisphere
    pub wall_probe_skin: f32,
    /// Wall contacts kept per body per tick
    pub max_wall_hits: usize,
    /// Normal Y component separating ground from wall (and wall from ceiling)
    pub ground_threshold: f32,
    /// Longest distance a sphere cast will travel
    pub sphere_cast_max_distance: f32,
    /// Smallest sampling step of a sphere cast
    pub sphere_cast_min_step: f32,
    /// Penetration allowance used by `snap_to_ground`
    pub snap_to_ground_penetration: f32,
    /// Penetration allowance used by `dynamic_body_altitude`
    pub dynamic_altitude_penetration: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            descriptor: DescriptorDefaults::default(),
            aabb_padding: 4.0,
            wall_probe_skin: 0.5,
            max_wall_hits: 4,
            ground_threshold: 0.7,
            sphere_cast_max_distance: 1000.0,
            sphere_cast_min_step: 8.0,
            snap_to_ground_penetration: 10.0,
            dynamic_altitude_penetration: 1.0,
        }
    }
}

impl Config for CollisionConfig {}
