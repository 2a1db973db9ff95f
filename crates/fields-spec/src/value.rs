use std::collections::BTreeSet;
use std::fmt;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::control::{Control, RawValue};
use crate::spec::{ValueKind, Widget, choice_key};

/// Typed value of a control, ready for comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// Unix timestamp in seconds, UTC.
    Timestamp(i64),
    Checked(bool),
    Choice(Option<String>),
    Choices(BTreeSet<String>),
    /// The raw value could not be read as the widget's kind.
    NotComparable,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(number) => write!(f, "{}", number),
            FieldValue::Timestamp(seconds) => write!(f, "{}", seconds),
            FieldValue::Checked(flag) => write!(f, "{}", flag),
            FieldValue::Choice(Some(key)) => f.write_str(key),
            FieldValue::Choice(None) => Ok(()),
            FieldValue::Choices(keys) => {
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                f.write_str(&keys.join(","))
            }
            FieldValue::NotComparable => f.write_str("NaN"),
        }
    }
}

/// Reads the comparable value of a control according to its widget.
pub fn extract(control: &Control) -> FieldValue {
    let value = extract_raw(control.widget, &control.raw);
    if value == FieldValue::NotComparable {
        log::trace!(
            "field '{}' holds a malformed {} value: {:?}",
            control.id,
            control.widget.as_str(),
            control.raw
        );
    }
    value
}

fn extract_raw(widget: Widget, raw: &RawValue) -> FieldValue {
    match (widget.value_kind(), raw) {
        (ValueKind::Text, RawValue::Text(text)) => FieldValue::Text(text.clone()),
        (ValueKind::Numeric, RawValue::Text(text)) => parse_number(text)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::NotComparable),
        (ValueKind::Date, RawValue::Text(text)) => parse_widget_timestamp(widget, text)
            .map(FieldValue::Timestamp)
            .unwrap_or(FieldValue::NotComparable),
        (ValueKind::Boolean, RawValue::Checked(flag)) => FieldValue::Checked(*flag),
        (ValueKind::SingleChoice, RawValue::Options(flags)) => {
            FieldValue::Choice(selected_keys(flags).into_iter().next())
        }
        (ValueKind::MultiChoice, RawValue::Options(flags)) => {
            FieldValue::Choices(selected_keys(flags).into_iter().collect())
        }
        _ => FieldValue::NotComparable,
    }
}

fn selected_keys(flags: &[bool]) -> Vec<String> {
    flags
        .iter()
        .enumerate()
        .filter(|(_, selected)| **selected)
        .map(|(index, _)| choice_key(index))
        .collect()
}

pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|number| !number.is_nan())
}

fn parse_widget_timestamp(widget: Widget, raw: &str) -> Option<i64> {
    let raw = raw.trim();
    match widget {
        Widget::Date => parse_date(raw),
        Widget::Time => parse_time(raw),
        _ => parse_datetime(raw),
    }
}

/// Parses a date, datetime or time-of-day string into timestamp seconds.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    parse_datetime(raw)
        .or_else(|| parse_date(raw))
        .or_else(|| parse_time(raw))
}

fn parse_date(raw: &str) -> Option<i64> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc().unix_timestamp())
}

fn parse_datetime(raw: &str) -> Option<i64> {
    if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(moment.unix_timestamp());
    }
    let normalized = raw.replacen(' ', "T", 1);
    PrimitiveDateTime::parse(
        &normalized,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            &normalized,
            format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        )
    })
    .ok()
    .map(|moment| moment.assume_utc().unix_timestamp())
}

fn parse_time(raw: &str) -> Option<i64> {
    Time::parse(raw, format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]")))
        .ok()
        .map(|time| {
            i64::from(time.hour()) * 3600 + i64::from(time.minute()) * 60 + i64::from(time.second())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(widget: Widget, raw: RawValue) -> Control {
        Control {
            id: "f".into(),
            label: "F".into(),
            widget,
            choices: Vec::new(),
            rule: Default::default(),
            raw,
            declared_required: false,
            required: false,
            active: true,
            hidden: false,
            indent_level: 0,
        }
    }

    #[test]
    fn numbers_parse_or_become_not_comparable() {
        let ok = control(Widget::Number, RawValue::Text(" 15 ".into()));
        assert_eq!(extract(&ok), FieldValue::Number(15.0));

        let bad = control(Widget::Number, RawValue::Text("fifteen".into()));
        assert_eq!(extract(&bad), FieldValue::NotComparable);

        let blank = control(Widget::Number, RawValue::Text(String::new()));
        assert_eq!(extract(&blank), FieldValue::NotComparable);
    }

    #[test]
    fn dates_become_timestamps() {
        let date = control(Widget::Date, RawValue::Text("1970-01-02".into()));
        assert_eq!(extract(&date), FieldValue::Timestamp(86_400));

        let moment = control(Widget::Datetime, RawValue::Text("1970-01-01T01:00".into()));
        assert_eq!(extract(&moment), FieldValue::Timestamp(3_600));

        let time = control(Widget::Time, RawValue::Text("00:01:30".into()));
        assert_eq!(extract(&time), FieldValue::Timestamp(90));

        let bad = control(Widget::Date, RawValue::Text("tomorrow".into()));
        assert_eq!(extract(&bad), FieldValue::NotComparable);
    }

    #[test]
    fn choices_reduce_to_selected_keys() {
        let multi = control(
            Widget::Multiselect,
            RawValue::Options(vec![true, false, true]),
        );
        assert_eq!(
            extract(&multi),
            FieldValue::Choices(["c1".to_string(), "c3".to_string()].into())
        );

        let single = control(Widget::Radio, RawValue::Options(vec![false, true]));
        assert_eq!(extract(&single), FieldValue::Choice(Some("c2".into())));

        let none = control(Widget::Dropdown, RawValue::Options(vec![false, false]));
        assert_eq!(extract(&none), FieldValue::Choice(None));
    }

    #[test]
    fn mismatched_raw_shape_is_not_comparable() {
        let checkbox = control(Widget::Checkbox, RawValue::Text("yes".into()));
        assert_eq!(extract(&checkbox), FieldValue::NotComparable);
    }

    #[test]
    fn timestamp_literals_accept_all_layouts() {
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400));
        assert_eq!(parse_timestamp("1970-01-01 00:00:10"), Some(10));
        assert_eq!(parse_timestamp("1970-01-01T00:00:00+01:00"), Some(-3_600));
        assert_eq!(parse_timestamp("12:00"), Some(43_200));
        assert_eq!(parse_timestamp("soon"), None);
    }
}
