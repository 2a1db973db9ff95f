use std::time::{Duration, Instant};

use serde_json::{Value, json};

use fields_spec::{
    EvalError, FieldInput, FormSpec, FormState, LiveForm, RawValue, refresh, resolve_visibility,
};

fn fixture() -> FormSpec {
    serde_json::from_str(include_str!("fixtures/membership_form.json")).expect("deserialize")
}

fn refreshed(answers: Value) -> FormState {
    let mut state = FormState::from_answers(&fixture(), &answers).expect("state");
    refresh(&mut state);
    state
}

#[test]
fn blank_form_shows_only_unconditional_fields() {
    let visibility = resolve_visibility(&fixture(), &json!({})).expect("visibility");
    let visible: Vec<_> = visibility
        .iter()
        .filter(|(_, visible)| **visible)
        .map(|(id, _)| id.as_str())
        .collect();
    assert_eq!(visible, vec!["age", "subscribe"]);
}

#[test]
fn refresh_toggles_display_required_and_indent() {
    let minor = refreshed(json!({ "age": 15 }));
    let guardian = minor.control("guardian").expect("guardian");
    assert!(guardian.active);
    assert!(!guardian.hidden);
    assert!(guardian.required);
    assert_eq!(guardian.indent_level, 1);

    let adult = refreshed(json!({ "age": 30 }));
    let guardian = adult.control("guardian").expect("guardian");
    assert!(!guardian.active);
    assert!(guardian.hidden);
    assert!(!guardian.required);
    assert!(guardian.declared_required);
}

#[test]
fn hidden_prerequisite_hides_dependents() {
    let state = refreshed(json!({ "age": 30, "guardian": "Ann" }));
    let phone = state.control("guardian_phone").expect("phone");
    assert!(!phone.active, "guardian is hidden so its phone must be too");
    assert!(!phone.required);
    assert_eq!(phone.indent_level, 2);

    let state = refreshed(json!({ "age": 15, "guardian": "Ann" }));
    assert!(state.control("guardian_phone").unwrap().active);
}

#[test]
fn indent_follows_the_dependency_chain() {
    let state = refreshed(json!({ "subscribe": true, "topics": ["c1"] }));
    assert_eq!(state.control("subscribe").unwrap().indent_level, 0);
    assert_eq!(state.control("topics").unwrap().indent_level, 1);

    let frequency = state.control("frequency").unwrap();
    assert!(frequency.active);
    assert_eq!(frequency.indent_level, 2);

    let start = state.control("start").unwrap();
    assert!(start.active);
    assert_eq!(start.indent_level, 1);
}

#[test]
fn failing_rule_is_isolated_to_its_field() {
    let mut spec = fixture();
    spec.fields[1].rule = serde_json::from_value(json!({
        "entry": { "target": "age", "opr": "approx", "val": "18" }
    }))
    .expect("rule");
    spec.fields[3].rule = serde_json::from_value(json!({
        "entry": { "target": "topics", "opr": "c" }
    }))
    .expect("rule");

    let mut state = FormState::from_answers(&spec, &json!({ "age": 15 })).expect("state");
    let report = refresh(&mut state);

    let failures: Vec<_> = report
        .failures()
        .map(|(field, err)| (field.id.as_str(), err.clone()))
        .collect();
    assert_eq!(
        failures,
        vec![
            ("guardian", EvalError::UnknownOperator("approx".into())),
            (
                "subscribe",
                EvalError::ForwardReference {
                    field: "subscribe".into(),
                    target: "topics".into()
                }
            ),
        ]
    );

    let guardian = state.control("guardian").unwrap();
    assert!(guardian.active, "failed field keeps its last state");
    assert_eq!(guardian.indent_level, 0);
    assert!(state.control("topics").unwrap().hidden);
}

#[test]
fn self_reference_is_a_data_error() {
    let mut spec = fixture();
    spec.fields[0].rule = serde_json::from_value(json!({
        "entry": { "target": "age", "opr": "lt", "val": 3 }
    }))
    .expect("rule");
    let mut state = FormState::from_spec(&spec).expect("state");
    let report = refresh(&mut state);
    assert!(matches!(
        report.field("age").unwrap().outcome,
        Err(EvalError::ForwardReference { .. })
    ));
}

#[test]
fn checkbox_toggle_flips_dependent_after_quiet_period() {
    let (mut live, initial) = LiveForm::load(&fixture()).expect("load");
    assert_eq!(live.passes(), 1);
    assert!(initial.field("topics").is_some());
    assert!(!live.state().control("topics").unwrap().active);

    let start = Instant::now();
    live.input("subscribe", RawValue::Checked(true), start)
        .expect("input");
    assert!(live.tick(start + Duration::from_millis(299)).is_none());
    assert!(!live.state().control("topics").unwrap().active);

    let report = live
        .tick(start + Duration::from_millis(300))
        .expect("refresh ran");
    assert!(report.field("topics").unwrap().outcome.as_ref().unwrap().is_active);
    assert!(live.state().control("topics").unwrap().active);
    assert_eq!(live.passes(), 2);
}

#[test]
fn burst_of_inputs_runs_one_refresh_with_last_values() {
    let (mut live, _) = LiveForm::load(&fixture()).expect("load");
    let start = Instant::now();

    for (step, age) in ["1", "15", "30"].iter().enumerate() {
        let now = start + Duration::from_millis(step as u64 * 100);
        live.apply(
            &FieldInput {
                field: "age".into(),
                value: json!(age),
            },
            now,
        )
        .expect("input");
        assert!(live.tick(now).is_none());
    }

    let last = start + Duration::from_millis(200);
    assert!(live.tick(last + Duration::from_millis(250)).is_none());
    assert!(live.tick(last + Duration::from_millis(300)).is_some());
    assert!(live.tick(last + Duration::from_millis(900)).is_none());

    assert_eq!(live.passes(), 2);
    assert!(!live.state().control("guardian").unwrap().active);
    assert!(live.state().control("start").unwrap().active);
}

#[test]
fn flush_runs_pending_refresh_once() {
    let (mut live, _) = LiveForm::load(&fixture()).expect("load");
    assert!(live.flush().is_none());

    live.input("age", RawValue::Text("12".into()), Instant::now())
        .expect("input");
    assert!(live.flush().is_some());
    assert!(live.flush().is_none());
    assert!(live.state().control("guardian").unwrap().active);
}

#[test]
fn unknown_input_field_is_rejected() {
    let (mut live, _) = LiveForm::load(&fixture()).expect("load");
    assert!(
        live.input("nope", RawValue::Checked(true), Instant::now())
            .is_err()
    );
    assert!(live.deadline().is_none());
}
