// Conversions between `image` buffers and OpenCV matrices
//
// Pixels are copied one by one through `at_2d`, so the resulting Mats are always
// continuous and owned. Channel order is kept as RGB; none of the OpenCV calls made
// on colour images here depend on BGR ordering.

use image::{GrayImage, Luma, Rgb, RgbImage};
use opencv::core::{Mat, Scalar, Vec3b, CV_8UC1, CV_8UC3};
use opencv::prelude::*;

/// Copy a single-channel image into a CV_8UC1 Mat
pub fn gray_to_mat(img: &GrayImage) -> opencv::Result<Mat> {
    let (width, height) = img.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(
        height as i32,
        width as i32,
        CV_8UC1,
        Scalar::all(0.0),
    )?;

    for (x, y, pixel) in img.enumerate_pixels() {
        *mat.at_2d_mut::<u8>(y as i32, x as i32)? = pixel[0];
    }

    Ok(mat)
}

/// Copy a CV_8UC1 Mat back into a single-channel image
pub fn mat_to_gray(mat: &Mat) -> opencv::Result<GrayImage> {
    let width = mat.cols().max(0) as u32;
    let height = mat.rows().max(0) as u32;
    let mut img = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let value = *mat.at_2d::<u8>(y as i32, x as i32)?;
            img.put_pixel(x, y, Luma([value]));
        }
    }

    Ok(img)
}

/// Copy an RGB image into a CV_8UC3 Mat
pub fn rgb_to_mat(img: &RgbImage) -> opencv::Result<Mat> {
    let (width, height) = img.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(
        height as i32,
        width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;

    for (x, y, pixel) in img.enumerate_pixels() {
        let dst = mat.at_2d_mut::<Vec3b>(y as i32, x as i32)?;
        dst.0 = pixel.0;
    }

    Ok(mat)
}

/// Copy a CV_8UC3 Mat back into an RGB image
pub fn mat_to_rgb(mat: &Mat) -> opencv::Result<RgbImage> {
    let width = mat.cols().max(0) as u32;
    let height = mat.rows().max(0) as u32;
    let mut img = RgbImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let px = mat.at_2d::<Vec3b>(y as i32, x as i32)?;
            img.put_pixel(x, y, Rgb(px.0));
        }
    }

    Ok(img)
}
