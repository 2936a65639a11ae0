use std::io::Cursor;

use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "tilemosaic_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_gray_png(path: &Path, w: u32, h: u32, v: u8) {
    let img = image::GrayImage::from_pixel(w, h, image::Luma([v]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, &buf).unwrap();
}

#[test]
fn repeated_and_downsampled_gets_decode_once() {
    let tmp = temp_dir("cache_decode_once");
    std::fs::create_dir_all(&tmp).unwrap();
    write_gray_png(&tmp.join("a.png"), 8, 4, 100);

    let cache = TileImageCache::new(&tmp, 1 << 20);
    let full = cache.get("a.png", 0, false).unwrap();
    let again = cache.get("a.png", 0, false).unwrap();
    assert!(Arc::ptr_eq(&full, &again));
    let half = cache.get("a.png", 1, false).unwrap();
    assert_eq!(half.dimensions(), (4, 2));
    assert_eq!(cache.decode_count(), 1);
    assert_eq!(cache.size(), 2);

    // Mask flag is part of the key.
    cache.get("a.png", 0, true).unwrap();
    assert_eq!(cache.decode_count(), 2);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn byte_budget_evicts_least_recently_used() {
    let tmp = temp_dir("cache_evict");
    std::fs::create_dir_all(&tmp).unwrap();
    for name in ["a.png", "b.png", "c.png"] {
        write_gray_png(&tmp.join(name), 4, 4, 1);
    }
    // Each plane is 4*4*4 bytes; budget fits two.
    let cache = TileImageCache::new(&tmp, 128);
    cache.get("a.png", 0, false).unwrap();
    cache.get("b.png", 0, false).unwrap();
    cache.get("a.png", 0, false).unwrap();
    cache.get("c.png", 0, false).unwrap();
    assert_eq!(cache.size(), 2);
    assert!(cache.resident_bytes() <= cache.max_bytes());

    cache.get("a.png", 0, false).unwrap();
    assert_eq!(cache.decode_count(), 3);
    cache.get("b.png", 0, false).unwrap();
    assert_eq!(cache.decode_count(), 4);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn hits_reorder_without_growing_recency_list() {
    let tmp = temp_dir("cache_hits");
    std::fs::create_dir_all(&tmp).unwrap();
    for name in ["a.png", "b.png"] {
        write_gray_png(&tmp.join(name), 4, 4, 1);
    }
    let cache = TileImageCache::new(&tmp, 1 << 20);
    for _ in 0..50 {
        cache.get("a.png", 0, false).unwrap();
        cache.get("b.png", 0, false).unwrap();
    }
    cache.get("a.png", 0, false).unwrap();
    {
        let state = cache.lock();
        assert_eq!(state.lru.len(), 2);
        let order: Vec<&str> = state.lru.values().map(|k| k.url.as_str()).collect();
        assert_eq!(order, ["b.png", "a.png"]);
    }
    assert_eq!(cache.decode_count(), 2);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_file_propagates() {
    let cache = UncachedImageLoader::new(temp_dir("cache_missing"));
    assert!(cache.get("nope.png", 0, false).is_err());
}
