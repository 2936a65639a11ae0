use super::*;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "tilemosaic_encode_{}_{}_{name}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn format_from_extension() {
    assert_eq!(OutputFormat::from_path(Path::new("a.PNG")).unwrap(), OutputFormat::Png);
    assert_eq!(OutputFormat::from_path(Path::new("a.jpeg")).unwrap(), OutputFormat::Jpeg);
    assert_eq!(OutputFormat::from_path(Path::new("a.tif")).unwrap(), OutputFormat::Tiff);
    assert!(OutputFormat::from_path(Path::new("a.bmp")).is_err());
    assert!(OutputFormat::from_path(Path::new("noext")).is_err());
}

#[test]
fn gray_png_round_trips() {
    let path = temp_path("gray.png");
    let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([90, 90, 90, 255]));
    let opts = EncodeOptions {
        convert_to_gray: true,
        ..EncodeOptions::default()
    };
    save_raster(&img, &path, &opts).unwrap();
    let back = image::open(&path).unwrap();
    assert_eq!(back.color(), image::ColorType::L8);
    assert_eq!(back.to_luma8().get_pixel(2, 1).0, [90]);
    std::fs::remove_file(&path).ok();
}

#[test]
fn jpeg_writes_rgb() {
    let path = temp_path("out.jpg");
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([10, 200, 30, 128]));
    save_raster(&img, &path, &EncodeOptions::default()).unwrap();
    assert_eq!(image::open(&path).unwrap().color(), image::ColorType::Rgb8);
    std::fs::remove_file(&path).ok();
}
