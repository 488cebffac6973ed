use std::path::Path;

use crate::core::params::PipelineConfig;
use crate::core::sensor::{SensorProfile, composite_bands};
use crate::io::scratch::ScratchDir;

/// Canonical raster of one run together with where and how it is rendered.
/// Shared by tile and thumbnail generation.
pub struct RenderContext<'a, T: ?Sized> {
    pub toolkit: &'a T,
    pub canonical: &'a Path,
    pub band_count: usize,
    pub profile: &'a SensorProfile,
    pub name: &'a str,
    pub config: &'a PipelineConfig,
    pub scratch: &'a ScratchDir,
}

impl<T: ?Sized> RenderContext<'_, T> {
    /// RGB bands of the profile, or the fallback triple when the raster lacks them
    pub fn composite_bands(&self) -> [usize; 3] {
        composite_bands(self.profile, self.band_count)
    }
}
