use super::*;

#[test]
fn decision_table_covers_six_variants() {
    assert_eq!(MapperKind::select(1, false, true), MapperKind::SingleChannel);
    assert_eq!(MapperKind::select(1, true, false), MapperKind::SingleChannelWithAlpha);
    assert_eq!(
        MapperKind::select(1, true, true),
        MapperKind::SingleChannelWithBinaryMask
    );
    assert_eq!(MapperKind::select(3, false, false), MapperKind::MultiChannel);
    assert_eq!(MapperKind::select(2, true, false), MapperKind::MultiChannelWithAlpha);
    assert_eq!(
        MapperKind::select(2, true, true),
        MapperKind::MultiChannelWithBinaryMask
    );
    assert!(MapperKind::MultiChannel.is_multi_channel());
    assert_eq!(MapperKind::SingleChannelWithAlpha.mask_policy(), MaskPolicy::Alpha);
}

#[test]
fn alpha_blends_and_accumulates_coverage() {
    let (mut v, mut c) = (100.0f32, 0u8);
    write_pixel(MaskPolicy::Alpha, 200.0, Some(127.5), &mut v, &mut c);
    assert!((v - 150.0).abs() < 1e-4);
    assert_eq!(c, 128);

    write_pixel(MaskPolicy::Alpha, 0.0, Some(0.0), &mut v, &mut c);
    assert!((v - 150.0).abs() < 1e-4);
    assert_eq!(c, 128);

    write_pixel(MaskPolicy::Alpha, 10.0, None, &mut v, &mut c);
    assert_eq!((v, c), (10.0, 255));
}

#[test]
fn binary_requires_fully_opaque_mask() {
    let (mut v, mut c) = (5.0f32, 0u8);
    write_pixel(MaskPolicy::Binary, 80.0, Some(254.0), &mut v, &mut c);
    assert_eq!((v, c), (5.0, 0));
    write_pixel(MaskPolicy::Binary, 80.0, Some(254.6), &mut v, &mut c);
    assert_eq!((v, c), (80.0, 255));
}

#[test]
fn sample_rejects_outside_source() {
    let ch = SourceChannel {
        image: Arc::new(Plane::new(4, 4, 9.0)),
        mask: None,
    };
    assert_eq!(ch.sample(3.4, 0.0, true), Some((9.0, None)));
    assert_eq!(ch.sample(3.5, 0.0, false), None);
}
