use std::collections::HashMap;
use std::sync::Mutex;

use super::*;
use crate::assets::decode::downsample;
use crate::spec::tile::ChannelSpec;
use crate::transform::TransformSpec;

#[derive(Default)]
struct MemoryCache {
    planes: HashMap<String, Plane<f32>>,
    requests: Mutex<Vec<(String, u32)>>,
}

impl MemoryCache {
    fn with(mut self, url: &str, plane: Plane<f32>) -> Self {
        self.planes.insert(url.to_owned(), plane);
        self
    }
}

impl DecodeCache for MemoryCache {
    fn get(&self, url: &str, levels: u32, is_mask: bool) -> MosaicResult<Arc<Plane<f32>>> {
        self.requests.lock().unwrap().push((url.to_owned(), levels));
        let plane = self
            .planes
            .get(url)
            .ok_or_else(|| MosaicError::decode(format!("missing {url}")))?;
        Ok(Arc::new(downsample(plane, levels, is_mask)))
    }
}

fn ramp(w: u32, h: u32) -> Plane<f32> {
    Plane::from_vec(w, h, (0..w * h).map(|i| i as f32).collect()).unwrap()
}

fn tile(id: &str, x: f64, y: f64, url: &str) -> TileSpec {
    let mut t = TileSpec::new(id);
    t.width = Some(8);
    t.height = Some(8);
    t.transforms.push(TransformSpec::stage(x, y));
    t.channels.push(ChannelSpec::new(None).with_level(0, url, None));
    t
}

#[test]
fn params_validate_and_build() {
    assert!(RenderParams::default().validate().is_ok());
    assert!(RenderParams::default().with_scale(0.0).validate().is_err());
    assert!(RenderParams::default().with_threads(0).validate().is_err());
    assert!(RenderParams::default()
        .with_mesh_cell_size(f64::NAN)
        .validate()
        .is_err());
    let p = RenderParams::default()
        .with_origin(1.0, 2.0)
        .with_filter(true)
        .with_background(Some(Rgba8::opaque(1, 2, 3)));
    assert_eq!((p.x, p.y, p.filter), (1.0, 2.0, true));
    let cache = MemoryCache::default();
    assert!(Compositor::new(RenderParams::default().with_threads(0), &cache).is_err());
}

#[test]
fn later_tiles_paint_over_earlier_ones() {
    let cache = MemoryCache::default()
        .with("a", Plane::new(8, 8, 50.0))
        .with("b", Plane::new(8, 8, 150.0));
    let comp = Compositor::new(RenderParams::default().with_threads(2), &cache).unwrap();
    let mut canvas = WorkingCanvas::single(12, 8).unwrap();
    let tiles = [tile("a", 0.0, 0.0, "a"), tile("b", 4.0, 0.0, "b")];
    let stats = comp.render_channels(&tiles, &mut canvas).unwrap();
    assert_eq!((stats.tiles_total, stats.tiles_rendered), (2, 2));

    let ch = canvas.channel(None).unwrap();
    assert_eq!(ch.intensity[0], 50.0);
    assert_eq!(ch.intensity[5], 150.0);
    assert_eq!(ch.intensity[11], 150.0);
    assert!(ch.coverage.iter().all(|c| *c == 255));
}

#[test]
fn unknown_dimensions_reuse_probe_decode() {
    let cache = MemoryCache::default().with("a", Plane::new(8, 8, 10.0));
    let comp = Compositor::new(RenderParams::default(), &cache).unwrap();
    let mut t = tile("a", 0.0, 0.0, "a");
    t.width = None;
    t.height = None;
    let mut canvas = WorkingCanvas::single(8, 8).unwrap();
    comp.render_channels(&[t], &mut canvas).unwrap();
    assert_eq!(cache.requests.lock().unwrap().len(), 1);
}

#[test]
fn zoomed_out_render_decodes_downsampled_level() {
    let cache = MemoryCache::default().with("a", Plane::new(16, 16, 10.0));
    let comp = Compositor::new(
        RenderParams::default()
            .with_scale(0.25)
            .with_mesh_cell_size(4.0),
        &cache,
    )
    .unwrap();
    let mut t = tile("a", 0.0, 0.0, "a");
    t.width = Some(16);
    t.height = Some(16);
    let mut canvas = WorkingCanvas::single(4, 4).unwrap();
    comp.render_channels(&[t], &mut canvas).unwrap();
    assert_eq!(cache.requests.lock().unwrap()[0], ("a".to_owned(), 2));
    // Mipmap pixel centers land a 3/8 pixel right and down of target pixel centers.
    let ch = canvas.channel(None).unwrap();
    assert_eq!(ch.intensity[5], 10.0);
    assert_eq!(ch.coverage[0], 0);
}

#[test]
fn skips_are_recorded_not_fatal() {
    let cache = MemoryCache::default()
        .with("a", Plane::new(8, 8, 10.0))
        .with("empty", Plane::new(0, 0, 0.0));
    let comp = Compositor::new(RenderParams::default(), &cache).unwrap();
    let mut bare = tile("bare", 0.0, 0.0, "a");
    bare.channels.clear();
    // Only a named channel: the default canvas channel falls back to it.
    let mut named = tile("named", 0.0, 0.0, "a");
    named.channels[0].name = Some("gfp".into());
    let tiles = [
        bare,
        named,
        tile("empty", 0.0, 0.0, "empty"),
        tile("ok", 0.0, 0.0, "a"),
    ];
    let mut canvas = WorkingCanvas::single(8, 8).unwrap();
    let stats = comp.render_channels(&tiles, &mut canvas).unwrap();
    assert_eq!(stats.tiles_rendered, 2);
    assert_eq!(
        stats.skipped,
        vec![
            SkipEvent {
                tile_id: "bare".into(),
                reason: SkipReason::NoMatchingChannel
            },
            SkipEvent {
                tile_id: "empty".into(),
                reason: SkipReason::ZeroSizeMipmap
            },
        ]
    );
}

#[test]
fn secondary_channel_with_other_size_is_skipped() {
    let cache = MemoryCache::default()
        .with("a", Plane::new(8, 8, 10.0))
        .with("g", Plane::new(8, 8, 20.0))
        .with("small", Plane::new(4, 4, 30.0));
    let comp = Compositor::new(RenderParams::default(), &cache).unwrap();
    let mut t = tile("t", 0.0, 0.0, "a");
    t.channels
        .push(ChannelSpec::new(Some("gfp".into())).with_level(0, "g", None));
    t.channels
        .push(ChannelSpec::new(Some("rfp".into())).with_level(0, "small", None));
    let names = [None, Some("gfp".to_owned()), Some("rfp".to_owned())];
    let mut canvas = WorkingCanvas::new(8, 8, &names).unwrap();
    let stats = comp.render_channels(&[t], &mut canvas).unwrap();
    assert_eq!(stats.skipped.len(), 1);
    assert_eq!(
        stats.skipped[0].reason,
        SkipReason::ChannelSizeMismatch {
            channel: Some("rfp".into())
        }
    );
    assert_eq!(canvas.channel(Some("gfp")).unwrap().intensity[9], 20.0);
    assert!(canvas.channel(Some("rfp")).unwrap().coverage.iter().all(|c| *c == 0));
}

#[test]
fn raster_output_uses_background() {
    let cache = MemoryCache::default().with("a", Plane::new(8, 8, 200.0));
    let comp = Compositor::new(
        RenderParams::default().with_background(Some(Rgba8::opaque(0, 0, 255))),
        &cache,
    )
    .unwrap();
    let mut dst = image::RgbaImage::new(10, 8);
    comp.render_to_raster(&[tile("a", 0.0, 0.0, "a")], &mut dst)
        .unwrap();
    assert_eq!(dst.get_pixel(0, 0).0, [200, 200, 200, 255]);
    assert_eq!(dst.get_pixel(9, 0).0, [0, 0, 255, 255]);

    let mut empty = image::RgbaImage::new(0, 4);
    assert!(matches!(
        comp.render_to_raster(&[], &mut empty),
        Err(MosaicError::Validation(_))
    ));
}

#[test]
fn nearest_sampling_reproduces_source_pixels() {
    let cache = MemoryCache::default().with("r", ramp(8, 8));
    let t = tile("r", 0.25, 0.0, "r");

    let nearest = Compositor::new(RenderParams::default().with_skip_interpolation(true), &cache)
        .unwrap();
    let mut canvas = WorkingCanvas::single(8, 8).unwrap();
    nearest.render_channels(&[t.clone()], &mut canvas).unwrap();
    let ch = canvas.channel(None).unwrap();
    assert_eq!(ch.coverage[0], 0);
    assert_eq!(&ch.intensity[1..8], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    assert_eq!(ch.intensity[8 * 3 + 5], 29.0);

    let bilinear = Compositor::new(RenderParams::default(), &cache).unwrap();
    let mut canvas = WorkingCanvas::single(8, 8).unwrap();
    bilinear.render_channels(&[t], &mut canvas).unwrap();
    assert_eq!(canvas.channel(None).unwrap().intensity[1], 0.75);
}

#[test]
fn excluded_masks_are_neither_loaded_nor_checked() {
    let cache = MemoryCache::default()
        .with("a", Plane::new(8, 8, 40.0))
        .with("zero", Plane::new(8, 8, 0.0))
        .with("small", Plane::new(4, 4, 255.0));
    let mut hidden = tile("hidden", 0.0, 0.0, "a");
    hidden.channels[0] = ChannelSpec::new(None).with_level(0, "a", Some("zero"));
    let mut mismatched = tile("mismatched", 0.0, 0.0, "a");
    mismatched.channels[0] = ChannelSpec::new(None).with_level(0, "a", Some("small"));

    let masked = Compositor::new(RenderParams::default(), &cache).unwrap();
    let mut canvas = WorkingCanvas::single(8, 8).unwrap();
    masked.render_channels(&[hidden.clone()], &mut canvas).unwrap();
    assert!(canvas.channel(None).unwrap().coverage.iter().all(|c| *c == 0));
    cache.requests.lock().unwrap().clear();

    let comp = Compositor::new(RenderParams::default().with_exclude_mask(true), &cache).unwrap();
    let mut canvas = WorkingCanvas::single(8, 8).unwrap();
    let stats = comp.render_channels(&[hidden, mismatched], &mut canvas).unwrap();
    assert_eq!(stats.tiles_rendered, 2);
    assert!(stats.skipped.is_empty());
    let ch = canvas.channel(None).unwrap();
    assert!(ch.coverage.iter().all(|c| *c == 255));
    assert!(ch.intensity.iter().all(|v| *v == 40.0));
    assert!(cache.requests.lock().unwrap().iter().all(|(url, _)| url == "a"));
}

#[test]
fn binary_mask_writes_only_opaque_pixels() {
    let mut mask = Plane::new(8, 8, 128.0);
    for y in 0..8 {
        for x in 0..4 {
            mask.set(x, y, 255.0);
        }
    }
    let cache = MemoryCache::default()
        .with("r", ramp(8, 8))
        .with("m", mask);
    let mut t = tile("r", 0.0, 0.0, "r");
    t.channels[0] = ChannelSpec::new(None).with_level(0, "r", Some("m"));

    let comp = Compositor::new(
        RenderParams::default()
            .with_skip_interpolation(true)
            .with_binary_mask(true),
        &cache,
    )
    .unwrap();
    let mut canvas = WorkingCanvas::single(8, 8).unwrap();
    comp.render_channels(&[t.clone()], &mut canvas).unwrap();
    let ch = canvas.channel(None).unwrap();
    assert_eq!(&ch.intensity[0..8], &[0.0, 1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(&ch.coverage[0..8], &[255, 255, 255, 255, 0, 0, 0, 0]);
    assert_eq!(ch.coverage[8 * 7 + 7], 0);

    let alpha = Compositor::new(RenderParams::default(), &cache).unwrap();
    let mut canvas = WorkingCanvas::single(8, 8).unwrap();
    alpha.render_channels(&[t], &mut canvas).unwrap();
    assert_eq!(canvas.channel(None).unwrap().coverage[4], 128);
}

#[test]
fn mapper_follows_surviving_channels() {
    let plain = SourceChannel {
        image: Arc::new(Plane::new(4, 4, 1.0)),
        mask: None,
    };
    let masked = SourceChannel {
        mask: Some(Arc::new(Plane::new(4, 4, 255.0))),
        ..plain.clone()
    };
    assert_eq!(select_mapper(&[plain.clone()], false), MapperKind::SingleChannel);
    assert_eq!(
        select_mapper(&[masked.clone()], true),
        MapperKind::SingleChannelWithBinaryMask
    );
    assert_eq!(
        select_mapper(&[masked, plain], false),
        MapperKind::MultiChannelWithAlpha
    );
}

#[test]
fn dropped_secondary_channel_leaves_single_channel_render() {
    let cache = MemoryCache::default()
        .with("a", Plane::new(8, 8, 10.0))
        .with("small", Plane::new(4, 4, 30.0));
    let comp = Compositor::new(RenderParams::default(), &cache).unwrap();
    let mut t = tile("t", 0.0, 0.0, "a");
    t.channels
        .push(ChannelSpec::new(Some("rfp".into())).with_level(0, "small", None));
    let names = [None, Some("rfp".to_owned())];
    let mut canvas = WorkingCanvas::new(8, 8, &names).unwrap();
    let stats = comp.render_channels(&[t], &mut canvas).unwrap();
    assert_eq!(stats.tiles_rendered, 1);
    assert!(canvas.channel(None).unwrap().intensity.iter().all(|v| *v == 10.0));
}
