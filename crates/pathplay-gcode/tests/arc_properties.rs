//! Property tests for arc subdivision

use pathplay_core::Point3;
use pathplay_gcode::segment::SegmentTag;
use pathplay_gcode::{resolve_arc, ArcCenter, ArcDirection, ArcPath};
use proptest::prelude::*;

fn direction() -> impl Strategy<Value = ArcDirection> {
    prop_oneof![
        Just(ArcDirection::Clockwise),
        Just(ArcDirection::CounterClockwise)
    ]
}

proptest! {
    #[test]
    fn arc_chain_is_continuous_and_snapped(
        sx in -100.0f64..100.0,
        sy in -100.0f64..100.0,
        sz in -10.0f64..10.0,
        ez in -10.0f64..10.0,
        radius in 0.5f64..50.0,
        start_angle in 0.0f64..std::f64::consts::TAU,
        delta in 0.05f64..6.2,
        step in 1.0f64..30.0,
        dir in direction(),
    ) {
        let start = Point3::new(sx, sy, sz);
        let center = (sx - radius * start_angle.cos(), sy - radius * start_angle.sin());
        let end_angle = start_angle + delta;
        let end = Point3::new(
            center.0 + radius * end_angle.cos(),
            center.1 + radius * end_angle.sin(),
            ez,
        );
        let offset = ArcCenter::Offset { i: center.0 - sx, j: center.1 - sy };

        let path = resolve_arc(start, end, offset, dir, step);
        let segments = path.segments(start, end, SegmentTag::default());
        prop_assert!(!segments.is_empty());
        prop_assert_eq!(segments[0].start, start);
        prop_assert!(segments.last().unwrap().end.approx_eq(&end, 1e-9));
        for pair in segments.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }

        if let ArcPath::Arc { sweep, points, .. } = &path {
            match dir {
                ArcDirection::CounterClockwise => prop_assert!(*sweep > 0.0),
                ArcDirection::Clockwise => prop_assert!(*sweep < 0.0),
            }
            let per_step = sweep.abs() / points.len() as f64;
            prop_assert!(per_step <= step.to_radians() + 1e-9);
        } else {
            prop_assert!(false, "expected a subdivided arc, got {:?}", path);
        }
    }

    #[test]
    fn arc_resolution_is_deterministic(
        ex in -20.0f64..20.0,
        ey in 0.5f64..20.0,
        i in -10.0f64..10.0,
        j in -10.0f64..10.0,
        dir in direction(),
    ) {
        let start = Point3::ORIGIN;
        let end = Point3::new(ex, ey, -1.0);
        let center = ArcCenter::Offset { i, j };
        let first = resolve_arc(start, end, center, dir, 5.0);
        let second = resolve_arc(start, end, center, dir, 5.0);
        prop_assert_eq!(first, second);
    }
}
