use approx::assert_abs_diff_eq;
use ndarray::Array2;
use tempfile::TempDir;

use coreg_core::error::CoregError;
use coreg_core::io::image_io::{load_image, load_labels, save_image, save_labels, save_png, save_tiff};

fn gradient(h: usize, w: usize) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(r, c)| (r * w + c) as f32 / (h * w - 1) as f32)
}

#[test]
fn test_tiff_roundtrip_keeps_16_bit_precision() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frame.tiff");
    let data = gradient(12, 17);

    save_tiff(&data.view(), &path).unwrap();
    let layer = load_image(&path).unwrap();

    assert_eq!(layer.channels(), 1);
    assert_eq!(layer.dim(), (12, 17));
    for (a, b) in layer.channel(0).iter().zip(data.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1.0 / 65535.0);
    }
}

#[test]
fn test_png_roundtrip_keeps_8_bit_precision() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frame.png");
    let data = gradient(9, 9);

    save_png(&data.view(), &path).unwrap();
    let layer = load_image(&path).unwrap();
    for (a, b) in layer.channel(0).iter().zip(data.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 0.5 / 255.0 + 1e-6);
    }
}

#[test]
fn test_save_image_picks_format_from_extension() {
    let dir = TempDir::new().unwrap();
    let data = gradient(4, 4);
    let png = dir.path().join("out.png");
    let other = dir.path().join("out.dat");

    save_image(&data.view(), &png).unwrap();
    save_image(&data.view(), &other).unwrap();

    assert_eq!(
        image::ImageFormat::from_path(&png).unwrap(),
        image::ImageFormat::Png
    );
    let bytes = std::fs::read(&other).unwrap();
    assert!(
        bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*"),
        "unknown extensions fall back to TIFF"
    );
}

#[test]
fn test_values_are_clamped_on_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clamped.tiff");
    let data = Array2::from_shape_vec((1, 3), vec![-0.5f32, 0.5, 1.5]).unwrap();

    save_tiff(&data.view(), &path).unwrap();
    let layer = load_image(&path).unwrap();
    let values: Vec<f32> = layer.channel(0).iter().copied().collect();
    assert_eq!(values[0], 0.0);
    assert_eq!(values[2], 1.0);
}

#[test]
fn test_labels_roundtrip_exactly() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("labels.png");
    let labels = Array2::from_shape_fn((6, 8), |(r, c)| ((r + 2 * c) % 5) as f32 * 50.0);

    save_labels(&labels.view(), &path).unwrap();
    let layer = load_labels(&path).unwrap();
    assert_eq!(layer.channel(0), labels.view());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = load_image(&dir.path().join("missing.tiff"));
    assert!(matches!(
        result,
        Err(CoregError::ImageError(_)) | Err(CoregError::Io(_))
    ));
}
