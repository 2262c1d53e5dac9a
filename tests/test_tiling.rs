//! Integration tests for tile layout and tile generation.

mod common;

use common::*;
use image::GenericImageView;

fn assert_exact_cover(width: u32, height: u32, patch_size: u32, overlap: f32) {
    let tiler = TileGenerator::new(patch_size, overlap).unwrap();
    let slots = tiler.layout(width, height);

    let mut covered = vec![false; (width * height) as usize];
    for slot in &slots {
        let r = slot.region;
        assert!(r.width > 0 && r.height > 0, "empty tile {:?}", r);
        assert!(r.width <= patch_size && r.height <= patch_size);
        assert!(
            r.right() <= width && r.bottom() <= height,
            "tile {:?} leaves a {}x{} image",
            r,
            width,
            height
        );
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                covered[(y * width + x) as usize] = true;
            }
        }
    }

    let gaps = covered.iter().filter(|c| !**c).count();
    assert_eq!(
        gaps, 0,
        "{}x{} patch={} overlap={} left {} pixels uncovered",
        width, height, patch_size, overlap, gaps
    );
}

#[test]
fn test_tiles_cover_image_without_gaps() {
    assert_exact_cover(250, 130, 64, 0.25);
    assert_exact_cover(64, 64, 64, 0.2);
    assert_exact_cover(1, 1, 16, 0.5);
    assert_exact_cover(300, 17, 32, 0.0);
    assert_exact_cover(97, 203, 50, 0.9);
    assert_exact_cover(129, 65, 64, 0.0);
}

#[test]
fn test_edge_tiles_are_clipped_not_padded() {
    let tiler = TileGenerator::new(1024, 0.2).unwrap();
    assert_eq!(tiler.stride(), 819);

    let slots = tiler.layout(2500, 2500);
    assert_eq!(slots.len(), 9);

    let xs: Vec<u32> = slots.iter().filter(|s| s.row == 0).map(|s| s.region.x).collect();
    assert_eq!(xs, vec![0, 819, 1638]);

    for slot in &slots {
        assert!(slot.region.width <= 1024);
        assert!(slot.region.height <= 1024);
    }

    let last = slots.last().unwrap();
    assert_eq!(last.region.x, 1638);
    assert_eq!(last.region.y, 1638);
    assert_eq!(last.region.width, 862);
    assert_eq!(last.region.height, 862);
    assert_eq!(last.region.right(), 2500);
    assert_eq!(last.region.bottom(), 2500);
}

#[test]
fn test_tiles_are_row_major() {
    let tiler = TileGenerator::new(40, 0.5).unwrap();
    let slots = tiler.layout(100, 70);

    for (index, slot) in slots.iter().enumerate() {
        assert_eq!(slot.id, index);
    }
    for pair in slots.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            (a.row, a.col) < (b.row, b.col),
            "{:?} should come before {:?}",
            a,
            b
        );
        if a.row == b.row {
            assert!(a.region.x < b.region.x);
            assert_eq!(a.region.y, b.region.y);
        } else {
            assert!(a.region.y < b.region.y);
            assert_eq!(b.region.x, 0);
        }
    }
}

#[test]
fn test_generate_copies_tile_pixels() {
    let image = gradient_image(90, 60);
    let tiler = TileGenerator::new(32, 0.25).unwrap();
    let tiles = tiler.generate(&image);

    assert_eq!(tiles.len(), tiler.layout(90, 60).len());
    for tile in &tiles {
        let (ox, oy) = tile.origin();
        assert_eq!(tile.width(), tile.region().width);
        assert_eq!(tile.height(), tile.region().height);
        for (x, y) in [(0, 0), (tile.width() - 1, tile.height() - 1)] {
            assert_eq!(
                tile.image().get_pixel(x, y),
                image.image().get_pixel(ox + x, oy + y),
                "tile {} pixel ({}, {})",
                tile.id(),
                x,
                y
            );
        }
    }
}

#[test]
fn test_image_smaller_than_patch_is_single_tile() {
    let tiler = TileGenerator::new(1024, 0.2).unwrap();
    let slots = tiler.layout(300, 200);

    assert_eq!(slots.len(), 1);
    assert_eq!(
        slots[0].region,
        TileRegion {
            x: 0,
            y: 0,
            width: 300,
            height: 200
        }
    );
}

#[test]
fn test_zero_area_image_has_no_tiles() {
    let tiler = TileGenerator::new(64, 0.2).unwrap();
    assert!(tiler.layout(0, 0).is_empty());
    assert!(tiler.layout(0, 100).is_empty());
    assert!(tiler.layout(100, 0).is_empty());
    assert!(tiler.generate(&blank_image(0, 0)).is_empty());
}

#[test]
fn test_invalid_tiling_parameters_are_rejected() {
    assert_eq!(
        TileGenerator::new(1024, 1.0).unwrap_err(),
        ConfigError::OverlapOutOfRange(1.0)
    );
    assert_eq!(
        TileGenerator::new(1024, -0.1).unwrap_err(),
        ConfigError::OverlapOutOfRange(-0.1)
    );
    assert!(matches!(
        TileGenerator::new(1024, f32::NAN),
        Err(ConfigError::OverlapOutOfRange(_))
    ));
    assert_eq!(TileGenerator::new(0, 0.2).unwrap_err(), ConfigError::ZeroPatchSize);
    assert_eq!(
        TileGenerator::new(1, 0.5).unwrap_err(),
        ConfigError::ZeroStride {
            patch_size: 1,
            overlap: 0.5
        }
    );
}
