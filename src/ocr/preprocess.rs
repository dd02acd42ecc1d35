use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// Converts an RGBA crop to a pure black/white image.
///
/// Luminance uses the ITU-R BT.601 weights, rounded to nearest. Pixels brighter than `threshold`
/// become white, everything else black. This gives the OCR tool maximum
/// contrast on the stylized MotionMark score display.
pub fn binarize(img: &RgbaImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if luminance(pixel) > threshold { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

fn luminance(pixel: &Rgba<u8>) -> u8 {
    let r = pixel[0] as u32;
    let g = pixel[1] as u32;
    let b = pixel[2] as u32;
    ((r * 299 + g * 587 + b * 114 + 500) / 1000) as u8
}

/// Crops `[left, top, right, bottom]` from an image, clamped to its bounds.
///
/// Returns `None` when nothing of the box lies inside the image.
pub fn crop_box(img: &RgbaImage, bbox: [i32; 4]) -> Option<RgbaImage> {
    let (w, h) = img.dimensions();
    let clamp = |v: i32, max: u32| v.clamp(0, max as i32) as u32;

    let x0 = clamp(bbox[0], w);
    let y0 = clamp(bbox[1], h);
    let x1 = clamp(bbox[2], w);
    let y1 = clamp(bbox[3], h);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(image::imageops::crop_imm(img, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Cuts a polygon out of the image.
///
/// Everything outside the polygon is painted black and the result is cropped
/// to the polygon's bounding box. Returns `None` for degenerate polygons or
/// ones lying entirely outside the image.
pub fn crop_polygon(img: &RgbaImage, points: &[[i32; 2]]) -> Option<RgbImage> {
    let mut poly: Vec<Point<i32>> = points.iter().map(|&[x, y]| Point::new(x, y)).collect();
    // The polygon closes implicitly; a repeated end point is rejected by the rasterizer
    if poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() < 3 {
        return None;
    }

    let (w, h) = img.dimensions();
    let mut mask = GrayImage::new(w, h);
    draw_polygon_mut(&mut mask, &poly, Luma([255u8]));

    let (x0, y0, x1, y1) = mask_bounds(&mask)?;
    let mut output = RgbImage::new(x1 - x0 + 1, y1 - y0 + 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            if mask.get_pixel(x, y)[0] > 0 {
                let p = img.get_pixel(x, y);
                output.put_pixel(x - x0, y - y0, Rgb([p[0], p[1], p[2]]));
            }
        }
    }

    Some(output)
}

/// Inclusive bounding box of the non-zero mask pixels.
fn mask_bounds(mask: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_box() {
        // 100x200 image
        let img: RgbaImage = ImageBuffer::from_fn(100, 200, |x, y| Rgba([x as u8, y as u8, 0, 255]));

        let cropped = crop_box(&img, [10, 50, 60, 70]).unwrap();

        assert_eq!(cropped.dimensions(), (50, 20));
        // Top-left pixel should be (10, 50) from original
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_box_clamps() {
        let img = RgbaImage::new(100, 100);
        let cropped = crop_box(&img, [90, -5, 150, 10]).unwrap();
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_crop_box_outside_image() {
        let img = RgbaImage::new(100, 100);
        assert!(crop_box(&img, [120, 0, 150, 10]).is_none());
        assert!(crop_box(&img, [50, 50, 50, 60]).is_none());
    }

    #[test]
    fn test_binarize() {
        let mut img = RgbaImage::new(3, 1);

        // Dark → black
        img.put_pixel(0, 0, Rgba([100, 100, 100, 255]));
        // Bright → white
        img.put_pixel(1, 0, Rgba([250, 250, 250, 255]));
        // Luminance exactly at the threshold stays black
        img.put_pixel(2, 0, Rgba([128, 128, 128, 255]));

        let result = binarize(&img, 128);

        assert_eq!(result.get_pixel(0, 0)[0], 0);
        assert_eq!(result.get_pixel(1, 0)[0], 255);
        assert_eq!(result.get_pixel(2, 0)[0], 0);
    }

    #[test]
    fn test_binarize_rounds_luminance() {
        let mut img = RgbaImage::new(2, 1);
        // 128.712 rounds up past the threshold
        img.put_pixel(0, 0, Rgba([130, 128, 129, 255]));
        // 128.43 rounds down onto it
        img.put_pixel(1, 0, Rgba([129, 129, 124, 255]));

        let result = binarize(&img, 128);
        assert_eq!(result.get_pixel(0, 0)[0], 255);
        assert_eq!(result.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_binarize_uses_weighted_luminance() {
        let mut img = RgbaImage::new(2, 1);
        // Pure green is bright (~150), pure blue is dark (~29)
        img.put_pixel(0, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));

        let result = binarize(&img, 128);
        assert_eq!(result.get_pixel(0, 0)[0], 255);
        assert_eq!(result.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_crop_polygon_masks_outside() {
        let img: RgbaImage = ImageBuffer::from_pixel(40, 40, Rgba([200, 100, 50, 255]));

        // Triangle with its right angle at the top-left
        let cropped = crop_polygon(&img, &[[10, 10], [30, 10], [10, 30]]).unwrap();
        let (w, h) = cropped.dimensions();
        assert!((20..=21).contains(&w));
        assert!((20..=21).contains(&h));

        // Inside keeps the source colour, far corner is masked to black
        assert_eq!(cropped.get_pixel(1, 1), &Rgb([200, 100, 50]));
        assert_eq!(cropped.get_pixel(w - 1, h - 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_crop_polygon_degenerate() {
        let img = RgbaImage::new(10, 10);
        assert!(crop_polygon(&img, &[[1, 1], [5, 5]]).is_none());
        assert!(crop_polygon(&img, &[[100, 100], [120, 100], [120, 120]]).is_none());
    }

    #[test]
    fn test_crop_polygon_with_repeated_end_point() {
        let img: RgbaImage = ImageBuffer::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        let cropped = crop_polygon(&img, &[[2, 2], [12, 2], [12, 12], [2, 12], [2, 2]]).unwrap();
        assert_eq!(cropped.dimensions(), (11, 11));
        assert_eq!(cropped.get_pixel(5, 5), &Rgb([255, 255, 255]));
    }
}
