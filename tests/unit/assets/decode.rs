use std::io::Cursor;

use super::*;

fn png_bytes(img: image::GrayImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_png_to_luma_plane() {
    let img = image::GrayImage::from_raw(2, 1, vec![7, 250]).unwrap();
    let plane = decode_plane(&png_bytes(img)).unwrap();
    assert_eq!(plane.dimensions(), (2, 1));
    assert_eq!(plane.data(), &[7.0, 250.0]);
}

#[test]
fn decode_garbage_is_decode_error() {
    let err = decode_plane(b"not an image").unwrap_err();
    assert!(matches!(err, MosaicError::Decode(_)));
}

#[test]
fn downsample_averages_and_floors_dimensions() {
    let plane = Plane::from_vec(3, 2, vec![0.0, 4.0, 99.0, 8.0, 12.0, 99.0]).unwrap();
    let half = downsample(&plane, 1, false);
    assert_eq!(half.dimensions(), (1, 1));
    assert_eq!(half.data(), &[6.0]);

    let gone = downsample(&plane, 2, false);
    assert!(gone.is_empty());
}

#[test]
fn mask_downsample_stays_integral() {
    let plane = Plane::from_vec(2, 2, vec![255.0, 255.0, 255.0, 0.0]).unwrap();
    let half = downsample(&plane, 1, true);
    assert_eq!(half.data(), &[191.0]);
}

#[test]
fn resolve_strips_file_scheme_and_rejects_remote() {
    let root = Path::new("/data");
    assert_eq!(
        resolve_path(root, "file:///abs/tile.png").unwrap(),
        PathBuf::from("/abs/tile.png")
    );
    assert_eq!(
        resolve_path(root, "rel/tile.png").unwrap(),
        PathBuf::from("/data/rel/tile.png")
    );
    assert!(resolve_path(root, "http://host/tile.png").is_err());
}
