use std::path::Path;

use tracing::{info, warn};

use crate::core::render::RenderContext;
use crate::error::Degradation;
use crate::io::scratch::{publish, remove_quietly};
use crate::io::toolkit::{RasterToolkit, TranslateOptions};
use crate::types::StretchRange;

/// Render `{thumbnails_dir}/{name}_thumb.png` and return the reference stored
/// on the record.
///
/// The PNG is rendered in scratch and only moved over the published file once
/// complete, so a failure never touches an earlier thumbnail. Failures are
/// recoverable.
pub fn generate_thumbnail<T: RasterToolkit + ?Sized>(
    ctx: &RenderContext<'_, T>,
    stretch: StretchRange,
) -> Result<String, Degradation> {
    let composite = ctx.scratch.join(&format!("{}_thumb_rgb.vrt", ctx.name));
    let staged = ctx.scratch.join(&format!("{}_thumb.png", ctx.name));
    let output = ctx.config.thumbnail_path(ctx.name);

    let result = render(ctx, &composite, &staged, stretch).and_then(|()| {
        publish(&staged, &output).map_err(|e| format!("cannot publish {:?}: {}", output, e))
    });
    remove_quietly(&composite);
    remove_quietly(&staged);

    match result {
        Ok(()) => {
            info!("Thumbnail written to {:?}", output);
            Ok(ctx.config.thumbnail_reference(ctx.name))
        }
        Err(reason) => {
            let d = Degradation::Thumbnail(reason);
            warn!("{}", d);
            Err(d)
        }
    }
}

fn render<T: RasterToolkit + ?Sized>(
    ctx: &RenderContext<'_, T>,
    composite: &Path,
    output: &Path,
    stretch: StretchRange,
) -> Result<(), String> {
    let (toolkit, profile, config) = (ctx.toolkit, ctx.profile, ctx.config);
    toolkit
        .build_composite(ctx.canonical, composite, ctx.composite_bands())
        .map_err(|e| format!("composite: {}", e))?;
    std::fs::create_dir_all(&config.thumbnails_dir)
        .map_err(|e| format!("cannot create {:?}: {}", config.thumbnails_dir, e))?;
    let opts = TranslateOptions::new("PNG")
        .byte_stretch(stretch)
        .resampling(profile.thumbnail_resampling)
        .out_size(config.thumbnail_size, config.thumbnail_size)
        .nodata(profile.nodata());
    toolkit
        .translate(composite, output, &opts)
        .map_err(|e| format!("render: {}", e))?;
    Ok(())
}
