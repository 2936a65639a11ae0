use super::*;

#[test]
fn hex_color_prefixes() {
    assert_eq!(Rgba8::from_hex("ff3366").unwrap(), Rgba8::opaque(255, 51, 102));
    assert_eq!(Rgba8::from_hex("#ff3366").unwrap(), Rgba8::opaque(255, 51, 102));
    assert_eq!(Rgba8::from_hex("0x000000").unwrap(), Rgba8::opaque(0, 0, 0));
}

#[test]
fn hex_color_with_alpha_and_errors() {
    let c = Rgba8::from_hex("80102030").unwrap();
    assert_eq!(c.to_array(), [0x10, 0x20, 0x30, 0x80]);

    assert!(Rgba8::from_hex("fff").is_err());
    assert!(Rgba8::from_hex("zzzzzz").is_err());
}
