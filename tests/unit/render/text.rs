use super::*;

const WHITE: GlyphBrush = GlyphBrush {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
};

fn system_font() -> Option<AvatarFont> {
    ["/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"]
        .iter()
        .find_map(|p| std::fs::read(p).ok())
        .map(AvatarFont::from_bytes)
}

#[test]
fn unusable_bytes_are_registered_once() {
    let mut engine = TextLayoutEngine::new();
    let font = AvatarFont::from_bytes(vec![0, 1, 2, 3]);

    assert!(engine.layout_line("J", &font, 24.0, WHITE).is_err());
    assert!(engine.layout_line("R", &font, 24.0, WHITE).is_err());
    assert_eq!(engine.registrations(), 1);
}

#[test]
fn missing_font_and_bad_size_fail_without_registering() {
    let mut engine = TextLayoutEngine::new();
    assert!(engine.layout_line("J", &AvatarFont::none(), 24.0, WHITE).is_err());
    let font = AvatarFont::from_bytes(vec![0, 1, 2, 3]);
    assert!(engine.layout_line("J", &font, 0.0, WHITE).is_err());
    assert!(engine.layout_line("J", &font, f32::NAN, WHITE).is_err());
    assert_eq!(engine.registrations(), 0);
}

#[test]
fn clones_share_one_registration() {
    let Some(font) = system_font() else {
        return;
    };
    let mut engine = TextLayoutEngine::new();
    let clone = font.clone();

    let a = engine.layout_line("J", &font, 32.0, WHITE).unwrap();
    let b = engine.layout_line("Ж", &clone, 32.0, WHITE).unwrap();
    assert!(a.width() > 0.0 && b.width() > 0.0);
    assert_eq!(engine.registrations(), 1);

    let other = AvatarFont::from_bytes(font.bytes().unwrap().to_vec());
    engine.layout_line("J", &other, 32.0, WHITE).unwrap();
    assert_eq!(engine.registrations(), 2);
}
