//! End-to-end interpreter tests on small programs

use pathplay_core::{GcodeError, Point3};
use pathplay_gcode::{
    interpret, interpret_with, InterpreterOptions, Positioning, RunOutcome, SegmentKind,
};

fn assert_continuous(run: &pathplay_gcode::Interpretation) {
    for pair in run.log.as_slice().windows(2) {
        assert_eq!(pair[0].end, pair[1].start, "gap between segments");
    }
}

#[test]
fn test_linear_moves_one_segment_per_line() {
    let run = interpret("G0 X0 Y0 Z5\nG1 Z-1 F300\nG1 X10\nG1 Y10\nG0 Z5");
    assert_eq!(run.outcome, RunOutcome::Completed);

    let kinds: Vec<SegmentKind> = run.log.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SegmentKind::Rapid,
            SegmentKind::Feed,
            SegmentKind::Feed,
            SegmentKind::Feed,
            SegmentKind::Rapid,
        ]
    );
    assert_eq!(run.log.get(0).unwrap().start, Point3::ORIGIN);
    assert_continuous(&run);
    assert_eq!(run.log.last().unwrap().end, Point3::new(10.0, 10.0, 5.0));
    assert_eq!(run.modal.feed_rate, Some(300.0));
    let lines: Vec<usize> = run.log.iter().map(|s| s.line).collect();
    assert_eq!(lines, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_quarter_arcs_in_both_directions() {
    let ccw = interpret("G0 X10 Y0\nG3 X0 Y10 I-10 J0");
    let cw = interpret("G0 X10 Y0\nG2 X0 Y10 I-10 J0");

    // 90 and 270 degrees in 5 degree steps, after the positioning rapid
    assert_eq!(ccw.log.len(), 1 + 18);
    assert_eq!(cw.log.len(), 1 + 54);

    for run in [&ccw, &cw] {
        assert_continuous(run);
        let last = run.log.last().unwrap();
        assert!(last.end.approx_eq(&Point3::new(0.0, 10.0, 0.0), 1e-9));
        for segment in run.log.iter().skip(1) {
            assert_eq!(segment.kind, SegmentKind::Feed);
            assert!((segment.end.distance_xy(&Point3::ORIGIN) - 10.0).abs() < 1e-9);
        }
    }

    // The clockwise chain goes through the third quadrant
    assert!(cw.log.iter().any(|s| s.end.x < -9.0 && s.end.y < 0.0));
}

#[test]
fn test_out_of_range_arc_step_falls_back_to_default() {
    for step in [0.0, -5.0, f64::INFINITY] {
        let options = InterpreterOptions {
            arc_step_degrees: step,
            ..InterpreterOptions::default()
        };
        let run = interpret_with("G0 X10 Y0\nG3 X0 Y10 I-10 J0", options);
        assert_eq!(run.outcome, RunOutcome::Completed);
        assert_eq!(run.log.count_of(SegmentKind::Feed), 18, "step {}", step);
    }
}

#[test]
fn test_radius_arc_without_solution_falls_back_to_line() {
    let run = interpret("G2 X10 Y0 R2");
    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(run.log.len(), 1);
    assert_eq!(run.log.get(0).unwrap().end, Point3::new(10.0, 0.0, 0.0));
}

#[test]
fn test_repeat_with_register_count() {
    let run = interpret("R1=3\nLABEL1:\nG91\nG1 X1\nREPEAT LABEL1 P=R1\nG1 X99");
    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(run.log.len(), 4);
    assert_eq!(run.log.count_of(SegmentKind::Feed), 4);

    for (i, segment) in run.log.iter().take(3).enumerate() {
        assert_eq!(segment.start.x, i as f64);
        assert_eq!(segment.end.x - segment.start.x, 1.0);
        assert_eq!(segment.line, 4);
    }
    let last = run.log.last().unwrap();
    assert_eq!(last.line, 6);
    assert_eq!(last.start, Point3::new(3.0, 0.0, 0.0));
    assert_eq!(last.end, Point3::new(99.0, 0.0, 0.0));
    assert_eq!(run.modal.positioning, Positioning::Absolute);
}

#[test]
fn test_single_label_repeat_runs_once_more() {
    let run = interpret("A:\nG91 G1 X1\nREPEAT A\nG1 X1");
    assert_eq!(run.log.len(), 3);
    assert_eq!(run.log.get(1).unwrap().end, Point3::new(2.0, 0.0, 0.0));
    // back in G90 after the block, so X1 is absolute
    assert_eq!(run.modal.position, Point3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_repeat_passes_start_in_label_distance_mode() {
    // G91 set before the label stays in force after the block
    let run = interpret("G91\nA:\nG1 X1\nG90\nREPEAT A P=2\nG1 X1");
    assert_eq!(run.log.len(), 3);
    assert_eq!(run.log.get(1).unwrap().start, Point3::new(1.0, 0.0, 0.0));
    assert_eq!(run.log.get(1).unwrap().end, Point3::new(2.0, 0.0, 0.0));
    assert_eq!(run.modal.position, Point3::new(3.0, 0.0, 0.0));
    assert_eq!(run.modal.positioning, Positioning::Incremental);
}

#[test]
fn test_repeat_count_of_one_or_less_adds_nothing() {
    for count in ["1", "0", "-2", "1.9"] {
        let run = interpret(&format!("A:\nG91 G1 X1\nREPEAT A P={}", count));
        assert_eq!(run.log.len(), 1, "count {}", count);
    }
    let run = interpret("A:\nG91 G1 X1\nREPEAT A P=3.7");
    assert_eq!(run.log.len(), 3);
}

#[test]
fn test_repeat_between_two_labels() {
    let run = interpret("R2=2\nS:\nG91\nG1 X1\nE:\nG1 Y1\nREPEAT S E P=R2\nG1 Z-1");
    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(run.log.len(), 4);
    assert_eq!(run.modal.position, Point3::new(2.0, 1.0, -1.0));
}

#[test]
fn test_nested_repeats() {
    let program = "A:\nG91\nB:\nG1 X1\nREPEAT B P=2\nG1 Y1\nREPEAT A P=3";
    let run = interpret(program);
    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(run.log.len(), 9);
    assert_eq!(run.modal.position, Point3::new(6.0, 3.0, 0.0));
    assert_continuous(&run);
}

#[test]
fn test_repeat_nesting_limit_is_fatal() {
    let program = "A:\nG91\nB:\nG1 X1\nREPEAT B P=2\nG1 Y1\nREPEAT A P=3";
    let options = InterpreterOptions {
        max_repeat_depth: 1,
        ..InterpreterOptions::default()
    };
    let run = interpret_with(program, options);
    let err = run.outcome.error().expect("run should fail");
    assert!(matches!(
        err,
        GcodeError::RepeatNestingTooDeep { line_number: 5, limit: 1, .. }
    ));
    // first outer pass plus the X move of the second pass
    assert_eq!(run.log.len(), 4);
}

#[test]
fn test_undefined_register_keeps_earlier_segments() {
    let run = interpret("G1 X1\nLABEL1:\nG1 X2\nREPEAT LABEL1 P=R9\nG1 X3");
    let err = run.outcome.error().expect("run should fail");
    assert!(matches!(
        err,
        GcodeError::UndefinedVariable { line_number: 4, register: 9, .. }
    ));
    assert_eq!(err.text(), "REPEAT LABEL1 P=R9");
    assert_eq!(run.log.len(), 2);
}

#[test]
fn test_repeat_to_unknown_label_is_fatal() {
    let run = interpret("G1 X1\nREPEAT LATER P=2\nLATER:\nG1 X2");
    assert!(matches!(
        run.outcome,
        RunOutcome::Failed(GcodeError::UnknownLabel { line_number: 2, ref label, .. }) if label == "LATER"
    ));
    assert_eq!(run.log.len(), 1);
}

#[test]
fn test_peck_drill_single_trigger() {
    let run = interpret("G83 X0 Y0 Z-10 R2 Q3");
    assert_eq!(run.log.len(), 8);
    let depths: Vec<f64> = run
        .log
        .iter()
        .filter(|s| s.kind == SegmentKind::Feed)
        .map(|s| s.end.z)
        .collect();
    assert_eq!(depths, vec![-3.0, -6.0, -9.0, -10.0]);
    for pair in run.log.as_slice().chunks(2) {
        assert_eq!(pair[0].kind, SegmentKind::Feed);
        assert_eq!(pair[1].kind, SegmentKind::Rapid);
        assert_eq!(pair[1].end.z, 2.0);
    }
}

#[test]
fn test_peck_depth_too_small_to_advance_is_fatal() {
    let run = interpret("G0 Z2\nG83 X0 Y0 Z-10 R2 Q0.0000000000000001");
    assert!(matches!(
        run.outcome,
        RunOutcome::Failed(GcodeError::InvalidPeckDepth { line_number: 2, .. })
    ));
    assert_eq!(run.log.len(), 1);
}

#[test]
fn test_second_hole_pecks_from_retract_height() {
    let run = interpret("G0 Z2\nG83 X0 Y0 Z-10 R2 Q3\nX5 Y0\nG80");
    assert_eq!(run.outcome, RunOutcome::Completed);
    // rapid to Z2, then two holes of four pecks each
    assert_eq!(run.log.len(), 1 + 8 + 8);

    let second: Vec<_> = run.log.iter().filter(|s| s.line == 3).collect();
    assert_eq!(second.len(), 8);
    assert_eq!(second[0].start, Point3::new(0.0, 0.0, 2.0));
    let depths: Vec<f64> = second
        .iter()
        .filter(|s| s.kind == SegmentKind::Feed)
        .map(|s| s.end.z)
        .collect();
    assert_eq!(depths, vec![-1.0, -4.0, -7.0, -10.0]);
    assert!(second
        .iter()
        .filter(|s| s.kind == SegmentKind::Feed)
        .skip(1)
        .all(|s| s.start.z == 2.0));
    assert_continuous(&run);
}

#[test]
fn test_peck_depth_must_be_positive() {
    let run = interpret("G0 X1\nG83 X5 Y5 Z-10 R2 Q0");
    assert!(matches!(
        run.outcome,
        RunOutcome::Failed(GcodeError::InvalidPeckDepth { line_number: 2, .. })
    ));
    assert_eq!(run.log.len(), 1);
}

#[test]
fn test_drill_cycle_triggers_until_cleared() {
    let run = interpret("G0 X0 Y0 Z2\nG81 Z-5 R2\nX10 Y0\nX20\nG80\nX30 Y5");
    assert_eq!(run.outcome, RunOutcome::Completed);
    // rapid + two holes of feed/rapid
    assert_eq!(run.log.len(), 5);
    assert_eq!(run.log.get(1).unwrap().end, Point3::new(10.0, 0.0, -5.0));
    assert_eq!(run.log.get(2).unwrap().end, Point3::new(10.0, 0.0, 2.0));
    assert_eq!(run.log.get(3).unwrap().end, Point3::new(20.0, 0.0, -5.0));
    // the bare line after G80 only moves the position
    assert_eq!(run.modal.position, Point3::new(30.0, 5.0, 2.0));
}

#[test]
fn test_cycle_words_update_active_cycle() {
    let run = interpret("G81 Z-2 R1\nX1 Y1\nZ-4\nX2 Y2");
    let bottoms: Vec<f64> = run
        .log
        .iter()
        .filter(|s| s.kind == SegmentKind::Feed)
        .map(|s| s.end.z)
        .collect();
    assert_eq!(bottoms, vec![-2.0, -4.0]);
}

#[test]
fn test_m30_halts_before_later_lines() {
    let run = interpret("G1 X1\nM30\nG1 X1.2.3");
    assert_eq!(run.outcome, RunOutcome::Halted { line: 2 });
    assert_eq!(run.log.len(), 1);
}

#[test]
fn test_unrecognized_lines_are_skipped() {
    let run = interpret("%\nG21 G17\nMSG hello\nG1 X1\n(done)");
    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(run.log.len(), 1);
}

#[test]
fn test_bare_coordinates_move_without_segments() {
    let run = interpret("X5 Y5\nG1 X6");
    assert_eq!(run.log.len(), 1);
    assert_eq!(run.log.get(0).unwrap().start, Point3::new(5.0, 5.0, 0.0));
}

#[test]
fn test_register_values_in_words() {
    let run = interpret("R1=5 R2=R1\nG1 XR1 Y=R2");
    assert_eq!(run.modal.position, Point3::new(5.0, 5.0, 0.0));
    assert_eq!(run.variables.get(2), Some(5.0));
}

#[test]
fn test_compensation_is_recorded_only() {
    let with = interpret("G41\nG1 X10 Y0");
    let without = interpret("G40\nG1 X10 Y0");
    assert_eq!(with.log, without.log);
    assert_eq!(with.modal.compensation, pathplay_gcode::Compensation::Left);
}

#[test]
fn test_operation_index_and_start_position() {
    let options = InterpreterOptions {
        operation_index: 3,
        start: Point3::new(0.0, 0.0, 10.0),
        ..InterpreterOptions::default()
    };
    let run = interpret_with("G0 X1\nG1 Z0", options);
    assert!(run.log.iter().all(|s| s.operation_index == 3));
    assert_eq!(run.log.get(0).unwrap().start, Point3::new(0.0, 0.0, 10.0));
}
