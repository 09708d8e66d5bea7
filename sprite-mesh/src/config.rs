//! Tunables for triangulation, weight generation and interactive editing
//!
//! All settings deserialize with `#[serde(default)]`, so a partial TOML/JSON
//! document only overrides the fields it names.

use serde::{Deserialize, Serialize};

/// Quality bounds for `Triangulator::tessellate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationSettings {
    /// Minimum triangle angle in degrees (0 disables the bound)
    pub min_angle: f32,
    /// Maximum triangle angle in degrees (0 disables the bound)
    pub max_angle: f32,
    /// Area bound as a fraction of the total mesh area
    pub mesh_area_factor: f32,
    /// Area bound as a fraction of the largest initial triangle, clamped to [0, 1]
    pub largest_triangle_area_factor: f32,
    /// Relaxation passes applied after refinement
    pub smooth_iterations: u32,
    /// `largest_triangle_area_factor` used by `SpriteMeshData::subdivide`
    pub subdivide_area_factor: f32,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self {
            min_angle: 0.0,
            max_angle: 0.0,
            mesh_area_factor: 0.0,
            largest_triangle_area_factor: 0.0,
            smooth_iterations: 0,
            subdivide_area_factor: 0.5,
        }
    }
}

/// Parameters of the bounded biharmonic weight solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightGenerationSettings {
    /// Spacing of samples inserted along each control edge
    pub distance_per_sample: f32,
    /// Upper bound on samples per control edge
    pub min_samples: u32,
    /// Area factor of the dense tessellation the diffusion runs on
    pub mesh_area_factor: f32,
    /// Bone points closer than this share one control point
    pub control_point_tolerance: f32,
    /// Channels at or below this weight are dropped after solving
    pub filter_tolerance: f32,
    /// Conjugate gradient iteration cap per bone
    pub solver_max_iterations: u32,
    /// Relative residual at which conjugate gradient stops
    pub solver_tolerance: f64,
    /// Projected Gauss-Seidel sweeps enforcing the [0, 1] bound
    pub bound_iterations: u32,
}

impl Default for WeightGenerationSettings {
    fn default() -> Self {
        Self {
            distance_per_sample: 5.0,
            min_samples: 10,
            mesh_area_factor: 0.0005,
            control_point_tolerance: 0.01,
            filter_tolerance: 0.01,
            solver_max_iterations: 2000,
            solver_tolerance: 1e-8,
            bound_iterations: 50,
        }
    }
}

/// Editing behaviour shared by the mesh and weight controllers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditSettings {
    /// Snap radius (mesh units) when a new edge crosses near a vertex
    pub snap_distance: f32,
    /// Number of cached smoothing iterations for the smooth weight tool
    pub max_smooth_iterations: u32,
    /// Normalize edited weights when a weight edit ends
    pub auto_normalize: bool,
    /// Weight edits with an empty selection apply to every vertex
    pub empty_selection_edits_all: bool,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            snap_distance: 10.0,
            max_smooth_iterations: 8,
            auto_normalize: true,
            empty_selection_edits_all: true,
        }
    }
}

/// All tunables in one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tessellation: TessellationSettings,
    pub weights: WeightGenerationSettings,
    pub edit: EditSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "weights": { "min_samples": 4 } }"#).unwrap();
        assert_eq!(settings.weights.min_samples, 4);
        assert_eq!(settings.weights.distance_per_sample, 5.0);
        assert_eq!(settings.edit.snap_distance, 10.0);
        assert_eq!(settings.tessellation, TessellationSettings::default());
    }
}
