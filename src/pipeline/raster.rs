//! Image re-encoding: decode → normalise colour mode → encode.
//!
//! Images with an alpha channel are flattened to 8-bit RGB for every target.
//! Other colour types are kept when the target encoder accepts them: PNG and
//! TIFF keep 8/16-bit greyscale and RGB, JPEG and BMP keep 8-bit greyscale
//! and RGB (16-bit greyscale drops to 8-bit), GIF takes 8-bit RGB only.

use image::{ColorType, DynamicImage, ImageFormat, ImageReader, ImageResult};
use std::path::Path;
use tracing::debug;

/// Convert `img` to a colour type the `target` encoder accepts.
pub fn normalize(img: DynamicImage, target: ImageFormat) -> DynamicImage {
    let color = img.color();
    let keep = !color.has_alpha()
        && match target {
            ImageFormat::Png | ImageFormat::Tiff => matches!(
                color,
                ColorType::L8 | ColorType::L16 | ColorType::Rgb8 | ColorType::Rgb16
            ),
            ImageFormat::Jpeg | ImageFormat::Bmp => {
                matches!(color, ColorType::L8 | ColorType::Rgb8)
            }
            _ => color == ColorType::Rgb8,
        };
    if keep {
        return img;
    }

    if color == ColorType::L16 && matches!(target, ImageFormat::Jpeg | ImageFormat::Bmp) {
        debug!("Normalising L16 image to L8 for {:?}", target);
        return DynamicImage::ImageLuma8(img.to_luma8());
    }
    debug!("Normalising {:?} image to Rgb8 for {:?}", color, target);
    DynamicImage::ImageRgb8(img.to_rgb8())
}

/// Decode `input` (format guessed from content) and write it to `output` as `format`.
pub fn convert_image(input: &Path, output: &Path, format: ImageFormat) -> ImageResult<()> {
    let img = ImageReader::open(input)?.with_guessed_format()?.decode()?;
    debug!(
        "Decoded {}x{} {:?} image",
        img.width(),
        img.height(),
        img.color()
    );
    normalize(img, format).save_with_format(output, format)
}
