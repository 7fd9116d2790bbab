//! Grid compositing tests.

mod common;

use image::{DynamicImage, GenericImageView};
use thumbsheet::{CellFit, CellSize, ThumbnailError, composite, fit_to_cell};

use common::{close, solid};

const COLORS: [[u8; 3]; 6] = [
    [200, 0, 0],
    [0, 200, 0],
    [0, 0, 200],
    [200, 200, 0],
    [0, 200, 200],
    [200, 0, 200],
];

fn frames() -> Vec<DynamicImage> {
    COLORS.iter().map(|color| solid(64, 36, *color)).collect()
}

fn rgb_at(image: &DynamicImage, x: u32, y: u32) -> [u8; 3] {
    let pixel = image.get_pixel(x, y).0;
    [pixel[0], pixel[1], pixel[2]]
}

#[test]
fn composite_size_is_columns_by_rows_cells() {
    let sheet = composite(&frames(), 2, 3, CellSize::new(32, 18), CellFit::Fill).unwrap();
    assert_eq!(sheet.dimensions(), (96, 36));
}

#[test]
fn composite_fills_row_major() {
    let cell = CellSize::new(32, 18);
    let sheet = composite(&frames(), 2, 3, cell, CellFit::Letterbox).unwrap();

    for (index, expected) in COLORS.iter().enumerate() {
        let column = index as u32 % 3;
        let row = index as u32 / 3;
        let center_x = column * cell.width + cell.width / 2;
        let center_y = row * cell.height + cell.height / 2;
        let actual = rgb_at(&sheet, center_x, center_y);
        assert!(
            close(actual, *expected, 2),
            "cell {index}: expected {expected:?}, got {actual:?}"
        );
    }
}

#[test]
fn composite_rejects_frame_count_mismatch() {
    let mut frames = frames();
    frames.pop();
    let result = composite(&frames, 2, 3, CellSize::new(32, 18), CellFit::Fill);
    assert!(matches!(
        result,
        Err(ThumbnailError::DimensionMismatch { .. })
    ));
}

#[test]
fn composite_rejects_zero_cell() {
    let result = composite(&frames(), 2, 3, CellSize::new(0, 18), CellFit::Fill);
    assert!(matches!(
        result,
        Err(ThumbnailError::DimensionMismatch { .. })
    ));
}

#[test]
fn composite_rejects_zero_rows() {
    let result = composite(&[], 0, 3, CellSize::default(), CellFit::Fill);
    assert!(matches!(
        result,
        Err(ThumbnailError::DimensionMismatch { .. })
    ));
}

#[test]
fn letterbox_pads_with_black_bars() {
    let frame = solid(64, 36, [250, 250, 250]);
    let tile = fit_to_cell(&frame, CellSize::new(32, 32), CellFit::Letterbox);
    assert_eq!(tile.dimensions(), (32, 32));
    // 64x36 scales to 32x18, centered vertically.
    assert_eq!(tile.get_pixel(16, 0).0, [0, 0, 0]);
    assert_eq!(tile.get_pixel(16, 31).0, [0, 0, 0]);
    assert!(close(tile.get_pixel(16, 16).0, [250, 250, 250], 2));
}

#[test]
fn fill_covers_whole_cell() {
    let frame = solid(64, 36, [250, 250, 250]);
    let tile = fit_to_cell(&frame, CellSize::new(32, 32), CellFit::Fill);
    assert_eq!(tile.dimensions(), (32, 32));
    assert!(close(tile.get_pixel(16, 0).0, [250, 250, 250], 2));
    assert!(close(tile.get_pixel(0, 31).0, [250, 250, 250], 2));
}

#[test]
fn cell_fit_names() {
    assert_eq!(CellFit::default(), CellFit::Letterbox);
    assert_eq!(CellFit::from_name("FILL"), Some(CellFit::Fill));
    assert_eq!(CellFit::from_name("letterbox"), Some(CellFit::Letterbox));
    assert_eq!(CellFit::from_name("stretch"), None);
    assert_eq!(CellFit::from_name(CellFit::Fill.name()), Some(CellFit::Fill));
}
