use super::*;

#[test]
fn hsla_primary_hues() {
    let red = hsla_to_rgba(0.0, 1.0, 0.5, 1.0);
    assert!((red.r - 1.0).abs() < 1e-9);
    assert!(red.g.abs() < 1e-9);
    assert!(red.b.abs() < 1e-9);

    let blue = hsla_to_rgba(240.0, 1.0, 0.5, 1.0).to_rgba8_premul();
    assert_eq!((blue.r, blue.g, blue.b, blue.a), (0, 0, 255, 255));
}

#[test]
fn grey_when_unsaturated() {
    let c = hsla_to_rgba(123.0, 0.0, 0.25, 1.0);
    assert_eq!(c, ColorDef::rgba(0.25, 0.25, 0.25, 1.0));
}

#[test]
fn colour_is_stable_and_case_insensitive() {
    let a = color_for_text("juliet@capulet.lit");
    let b = color_for_text("  Juliet@Capulet.lit ");
    assert_eq!(a, b);
    assert_eq!(a, color_for_text("juliet@capulet.lit"));
    assert_eq!(a.a, 255);
}

#[test]
fn hue_is_in_range_and_differs_between_seeds() {
    let h1 = hue_for_text("romeo");
    let h2 = hue_for_text("juliet");
    assert!((0.0..360.0).contains(&h1));
    assert!((0.0..360.0).contains(&h2));
    assert_ne!(h1, h2);
}
