use siamtrack::{crop_and_resize, CropRegion, ImageView, Point};

fn checker(width: usize, height: usize, cell: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let v = if ((x / cell) + (y / cell)) % 2 == 0 { 40 } else { 210 };
            data.extend_from_slice(&[v, v / 2, 255 - v]);
        }
    }
    data
}

#[test]
fn output_shape_is_fixed_for_any_side() {
    let data = checker(64, 48, 8);
    let view = ImageView::from_slice(&data, 64, 48, 3).unwrap();
    for side in [3.0, 17.4, 48.0, 63.5, 200.0] {
        let patch = crop_and_resize(view, Point::new(24.0, 32.0), side, 31, &[0.0; 3]).unwrap();
        assert_eq!(patch.width(), 31);
        assert_eq!(patch.height(), 31);
        assert_eq!(patch.channels(), 3);
        assert_eq!(patch.data().len(), 31 * 31 * 3);
    }
}

#[test]
fn fully_outside_region_is_pure_fill() {
    let data = checker(64, 48, 8);
    let view = ImageView::from_slice(&data, 64, 48, 3).unwrap();
    let fill = [12.0, 34.0, 56.0];
    let patch = crop_and_resize(view, Point::new(-500.0, 900.0), 50.0, 20, &fill).unwrap();
    for px in patch.data().chunks_exact(3) {
        for (&v, &f) in px.iter().zip(&fill) {
            assert!((v as f64 - f).abs() < 1e-4);
        }
    }
}

#[test]
fn constant_frame_survives_resampling() {
    let data = vec![77u8; 40 * 30 * 3];
    let view = ImageView::from_slice(&data, 40, 30, 3).unwrap();
    for out in [7, 25, 64] {
        let patch = crop_and_resize(view, Point::new(15.0, 20.0), 21.0, out, &[77.0; 3]).unwrap();
        assert!(patch.data().iter().all(|&v| (v - 77.0).abs() < 1e-3));
    }
}

#[test]
fn strided_frame_matches_contiguous_frame() {
    let (width, height) = (30, 20);
    let contiguous = checker(width, height, 4);
    let stride = width * 3 + 5;
    let mut padded = vec![0u8; stride * height];
    for y in 0..height {
        padded[y * stride..y * stride + width * 3]
            .copy_from_slice(&contiguous[y * width * 3..(y + 1) * width * 3]);
    }
    let a = ImageView::from_slice(&contiguous, width, height, 3).unwrap();
    let b = ImageView::new(&padded, width, height, 3, stride).unwrap();
    for center in [Point::new(10.0, 15.0), Point::new(1.0, 2.0)] {
        let pa = crop_and_resize(a, center, 11.0, 16, &[9.0; 3]).unwrap();
        let pb = crop_and_resize(b, center, 11.0, 16, &[9.0; 3]).unwrap();
        assert_eq!(pa, pb);
    }
}

#[test]
fn region_rounds_half_sizes_to_even() {
    assert_eq!(CropRegion::around(Point::new(50.0, 50.0), 6.5).unwrap().side, 6);
    assert_eq!(CropRegion::around(Point::new(50.0, 50.0), 7.5).unwrap().side, 8);
    assert_eq!(CropRegion::around(Point::new(50.0, 50.0), 0.2).unwrap().side, 1);
}

#[test]
fn fill_must_match_channel_count() {
    let data = checker(8, 8, 2);
    let view = ImageView::from_slice(&data, 8, 8, 3).unwrap();
    assert!(crop_and_resize(view, Point::new(4.0, 4.0), 4.0, 4, &[0.0]).is_err());
}
