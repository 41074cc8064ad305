// Removal mask: filled block rectangles, grown by morphological dilation

use image::{GrayImage, Luma};
use opencv::core::{Mat, Point, Size, BORDER_CONSTANT};
use opencv::imgproc;

use crate::core::errors::CleaningResult;
use crate::core::types::TextBlock;
use crate::utils::cv::{gray_to_mat, mat_to_gray};

pub const MASK_ON: u8 = 255;

/// Single-channel mask with every block rectangle filled.
///
/// Rectangles are inclusive of both corners, `(x, y)` through `(x + w, y + h)`,
/// and clipped to the image.
pub fn build_mask(width: u32, height: u32, blocks: &[TextBlock]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    for block in blocks {
        let b = &block.bbox;
        if b.x >= width || b.y >= height {
            continue;
        }
        let x_end = b.right().min(width - 1);
        let y_end = b.bottom().min(height - 1);
        for y in b.y..=y_end {
            for x in b.x..=x_end {
                mask.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
    }

    mask
}

/// Dilate with a `kernel`x`kernel` rectangle, `iterations` times.
///
/// Never shrinks the mask and never disconnects a connected region.
pub fn dilate_mask(mask: &GrayImage, kernel: i32, iterations: i32) -> CleaningResult<GrayImage> {
    if iterations <= 0 || kernel <= 1 {
        return Ok(mask.clone());
    }

    let src = gray_to_mat(mask)?;
    let element = imgproc::get_structuring_element(
        imgproc::MORPH_RECT,
        Size::new(kernel, kernel),
        Point::new(-1, -1),
    )?;

    let mut dilated = Mat::default();
    imgproc::dilate(
        &src,
        &mut dilated,
        &element,
        Point::new(-1, -1),
        iterations,
        BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;

    Ok(mat_to_gray(&dilated)?)
}

pub fn lit_pixels(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}
