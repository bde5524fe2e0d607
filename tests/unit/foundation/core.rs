use super::*;

#[test]
fn premul_rounds_to_nearest() {
    let c = Rgba8Premul::from_straight_rgba(100, 50, 200, 128);
    assert_eq!(c.r, ((100u16 * 128 + 127) / 255) as u8);
    assert_eq!(c.g, ((50u16 * 128 + 127) / 255) as u8);
    assert_eq!(c.b, ((200u16 * 128 + 127) / 255) as u8);
    assert_eq!(c.a, 128);
}

#[test]
fn hex_is_lowercase_rgb() {
    let c = Rgba8Premul::from_straight_rgba(255, 10, 171, 255);
    assert_eq!(c.to_hex_rgb(), "#ff0aab");
}

#[test]
fn fetch_key_display_joins_account_and_address() {
    let key = FetchKey::new(
        AccountId::new("romeo@montague.lit"),
        Address::new("juliet@capulet.lit"),
    );
    assert_eq!(key.to_string(), "romeo@montague.lit/juliet@capulet.lit");
}
