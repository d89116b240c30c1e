//! PNG rendering of the step-count histogram and of a traced walk.

use crate::model::Position;
use crate::stats::Histogram;
use anyhow::{Context, Result, bail};
use image::{Rgba, RgbaImage};
use std::path::Path;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const GRID: Rgba<u8> = Rgba([200, 200, 200, 255]);
const BLUE: Rgba<u8> = Rgba([31, 119, 180, 255]);
const RED: Rgba<u8> = Rgba([214, 39, 40, 255]);
const GREEN: Rgba<u8> = Rgba([44, 160, 44, 255]);

const HIST_BAR_PX: u32 = 24;
const HIST_HEIGHT_PX: u32 = 320;
const MARGIN_PX: u32 = 16;

/// Largest side length, in pixels, of a rendered path map.
pub const MAX_MAP_SIDE_PX: u32 = 16_384;

/// Draw `hist` as a bar chart.
pub fn histogram_image(hist: &Histogram) -> RgbaImage {
    let plot_w = hist.n_bins() as u32 * HIST_BAR_PX;
    let plot_h = HIST_HEIGHT_PX;
    let mut img = RgbaImage::from_pixel(plot_w + 2 * MARGIN_PX, plot_h + 2 * MARGIN_PX, WHITE);

    let base_y = MARGIN_PX + plot_h;
    let max_count = hist.max_count().max(1) as f64;
    for (i_bin, &count) in hist.counts().iter().enumerate() {
        if count == 0 {
            continue;
        }
        let bar_h = ((count as f64 / max_count) * plot_h as f64).round().max(1.0) as u32;
        let x0 = MARGIN_PX + i_bin as u32 * HIST_BAR_PX;
        let x1 = x0 + HIST_BAR_PX - 1;
        let y0 = base_y - bar_h;
        fill_rect(&mut img, x0, y0, x1, base_y, BLUE);
        outline_rect(&mut img, x0, y0, x1, base_y, BLACK);
    }

    draw_line(
        &mut img,
        (MARGIN_PX as i64, base_y as i64),
        ((MARGIN_PX + plot_w) as i64, base_y as i64),
        BLACK,
    );
    draw_line(
        &mut img,
        (MARGIN_PX as i64, MARGIN_PX as i64),
        (MARGIN_PX as i64, base_y as i64),
        BLACK,
    );

    img
}

/// Draw `path` on a `grid_size` x `grid_size` grid, with `y` pointing up.
///
/// The first position is marked red and the last one green.
pub fn path_map_image(grid_size: usize, path: &[Position], cell_px: u32) -> Result<RgbaImage> {
    let (Some(&start), Some(&end)) = (path.first(), path.last()) else {
        bail!("path must contain at least one position");
    };
    if let Some(pos) = path.iter().find(|p| p.x >= grid_size || p.y >= grid_size) {
        bail!("{pos:?} is outside the {grid_size}x{grid_size} grid");
    }

    let side = u32::try_from(grid_size)
        .ok()
        .and_then(|n| n.checked_mul(cell_px))
        .filter(|&side| side <= MAX_MAP_SIDE_PX)
        .with_context(|| {
            format!("{grid_size}x{grid_size} grid at {cell_px} px per cell exceeds {MAX_MAP_SIDE_PX} px")
        })?;
    let mut img = RgbaImage::from_pixel(side, side, WHITE);

    let center = |pos: Position| -> (i64, i64) {
        let half = (cell_px / 2) as i64;
        let px = pos.x as i64 * cell_px as i64 + half;
        let py = (grid_size - 1 - pos.y) as i64 * cell_px as i64 + half;
        (px, py)
    };

    for i in 0..grid_size {
        let (c, _) = center(Position::new(i, 0));
        draw_line(&mut img, (c, 0), (c, side as i64 - 1), GRID);
        draw_line(&mut img, (0, c), (side as i64 - 1, c), GRID);
    }

    for pair in path.windows(2) {
        draw_line(&mut img, center(pair[0]), center(pair[1]), BLUE);
    }

    let dot = (cell_px / 10).max(1) as i64;
    for &pos in path {
        draw_dot(&mut img, center(pos), dot, BLUE);
    }
    let marker = (cell_px / 6).max(2) as i64;
    draw_dot(&mut img, center(start), marker, RED);
    draw_dot(&mut img, center(end), marker, GREEN);

    Ok(img)
}

pub fn save_image<P: AsRef<Path>>(img: &RgbaImage, file: P) -> Result<()> {
    let file = file.as_ref();
    img.save(file)
        .with_context(|| format!("failed to save {file:?}"))?;
    log::info!("created {file:?}");
    Ok(())
}

fn put(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < img.width() as i64 && y < img.height() as i64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            put(img, x as i64, y as i64, color);
        }
    }
}

fn outline_rect(img: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
    draw_line(img, (x0, y0), (x1, y0), color);
    draw_line(img, (x0, y1), (x1, y1), color);
    draw_line(img, (x0, y0), (x0, y1), color);
    draw_line(img, (x1, y0), (x1, y1), color);
}

fn draw_dot(img: &mut RgbaImage, (cx, cy): (i64, i64), radius: i64, color: Rgba<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(img, cx + dx, cy + dy, color);
            }
        }
    }
}

// Bresenham
fn draw_line(img: &mut RgbaImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgba<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        put(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_image_has_one_bar_per_bin() {
        let hist = Histogram::new(&[1, 2, 2, 3, 3, 3], 3).expect("histogram");
        let img = histogram_image(&hist);
        assert_eq!(img.width(), 3 * HIST_BAR_PX + 2 * MARGIN_PX);
        assert_eq!(img.height(), HIST_HEIGHT_PX + 2 * MARGIN_PX);

        // Tallest bar reaches the top of the plot area.
        let x_mid = MARGIN_PX + 2 * HIST_BAR_PX + HIST_BAR_PX / 2;
        assert_eq!(*img.get_pixel(x_mid, MARGIN_PX + 1), BLUE);
        // Shortest bar does not.
        let x_mid = MARGIN_PX + HIST_BAR_PX / 2;
        assert_eq!(*img.get_pixel(x_mid, MARGIN_PX + 1), WHITE);
    }

    #[test]
    fn path_map_marks_endpoints() {
        let path = [
            Position::new(0, 0),
            Position::new(0, 1),
            Position::new(0, 1),
            Position::new(1, 1),
        ];
        let cell_px = 20;
        let img = path_map_image(2, &path, cell_px).expect("image");
        assert_eq!(img.dimensions(), (40, 40));
        // Start (0, 0) is drawn in the bottom-left cell, end (1, 1) in the top-right one.
        assert_eq!(*img.get_pixel(10, 30), RED);
        assert_eq!(*img.get_pixel(30, 10), GREEN);
        // Segment between (0, 1) and (1, 1).
        assert_eq!(*img.get_pixel(20, 10), BLUE);
    }

    #[test]
    fn path_map_rejects_bad_paths() {
        assert!(path_map_image(2, &[], 20).is_err());
        assert!(path_map_image(2, &[Position::new(2, 0)], 20).is_err());
        assert!(path_map_image(1_000, &[Position::new(0, 0)], 256).is_err());
    }

    #[test]
    fn lines_cover_both_endpoints() {
        let mut img = RgbaImage::from_pixel(10, 10, WHITE);
        draw_line(&mut img, (1, 8), (7, 2), BLACK);
        assert_eq!(*img.get_pixel(1, 8), BLACK);
        assert_eq!(*img.get_pixel(7, 2), BLACK);
        assert_eq!(*img.get_pixel(4, 5), BLACK);
    }
}
