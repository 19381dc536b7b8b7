#![allow(dead_code)]

use arrowlabel::{Bbox, BboxFormat, CompressedRle, ObjectAnnotation, Pose};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS: f32 = 1e-6;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Coordinates kept in [-1, 1], where f32 arithmetic stays well within EPS.
pub fn arb_coord() -> impl Strategy<Value = f32> {
    (-1000i32..=1000i32).prop_map(|v| v as f32 / 1000.0)
}

pub fn arb_coords() -> impl Strategy<Value = [f32; 4]> {
    [arb_coord(), arb_coord(), arb_coord(), arb_coord()]
}

pub fn arb_format() -> impl Strategy<Value = BboxFormat> {
    prop_oneof![Just(BboxFormat::Xyxy), Just(BboxFormat::Xywh)]
}

pub fn arb_bbox() -> impl Strategy<Value = Bbox> {
    (arb_coords(), arb_format(), any::<bool>())
        .prop_map(|(coords, format, normalized)| Bbox::new(coords, format, normalized))
}

pub fn arb_pose() -> impl Strategy<Value = Pose> {
    (
        proptest::array::uniform9(arb_coord()),
        proptest::array::uniform3(arb_coord()),
    )
        .prop_map(|(rotation, translation)| Pose::new(rotation, translation))
}

pub fn arb_mask() -> impl Strategy<Value = CompressedRle> {
    (1i32..=2000, 1i32..=2000, proptest::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(h, w, counts)| CompressedRle::new([h, w], counts))
}

pub fn arb_annotation() -> impl Strategy<Value = ObjectAnnotation> {
    (
        "[a-z0-9-]{1,12}",
        proptest::option::of("[a-z_]{1,8}"),
        proptest::option::of(arb_bbox()),
        proptest::option::of(arb_mask()),
        proptest::option::of(arb_pose()),
        proptest::option::of(0i32..100),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(
            |(id, view_id, bbox, mask, pose, category_id, is_difficult)| ObjectAnnotation {
                id,
                view_id,
                bbox,
                mask,
                pose,
                category_id,
                is_difficult,
                ..ObjectAnnotation::default()
            },
        )
}

pub fn coords_close(actual: [f32; 4], expected: [f32; 4], eps: f32) -> bool {
    actual
        .iter()
        .zip(expected.iter())
        .all(|(a, e)| (a - e).abs() <= eps)
}
