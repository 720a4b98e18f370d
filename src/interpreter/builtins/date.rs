//! Date constructor and Date.prototype
//!
//! Dates hold milliseconds since the Unix epoch; all component accessors
//! work in UTC.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use super::{BuiltinType, Prototypes, arg, register_constructor, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::{ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::value::{AvmValue, CheapClone};

pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    let proto = &prototypes.date;
    register_method(proto, prototypes, "getTime", date_get_time);
    register_method(proto, prototypes, "valueOf", date_get_time);
    register_method(proto, prototypes, "setTime", date_set_time);
    register_method(proto, prototypes, "getFullYear", date_get_full_year);
    register_method(proto, prototypes, "getMonth", date_get_month);
    register_method(proto, prototypes, "getDate", date_get_date);
    register_method(proto, prototypes, "getDay", date_get_day);
    register_method(proto, prototypes, "getHours", date_get_hours);
    register_method(proto, prototypes, "getMinutes", date_get_minutes);
    register_method(proto, prototypes, "getSeconds", date_get_seconds);
    register_method(proto, prototypes, "getMilliseconds", date_get_milliseconds);
    register_method(proto, prototypes, "toString", date_to_string);
    let constructor = register_constructor(
        globals,
        prototypes,
        proto,
        BuiltinType::Date,
        "Date",
        date_constructor,
    );
    register_method(&constructor, prototypes, "UTC", date_utc);
}

/// Build a timestamp from components. Months are 0-based and may overflow
/// into neighbouring years; days overflow into neighbouring months.
fn make_date_from_components(components: [f64; 7]) -> f64 {
    if components.iter().any(|c| !c.is_finite()) {
        return f64::NAN;
    }
    let [year, month, day, hours, minutes, seconds, millis] = components.map(f64::trunc);

    // Two-digit years belong to the 1900s
    let year = if (0.0..100.0).contains(&year) {
        year + 1900.0
    } else {
        year
    };
    let total_months = year as i64 * 12 + month as i64;
    let Ok(norm_year) = i32::try_from(total_months.div_euclid(12)) else {
        return f64::NAN;
    };
    let norm_month = (total_months.rem_euclid(12) + 1) as u32;

    let Some(base) = Utc.with_ymd_and_hms(norm_year, norm_month, 1, 0, 0, 0).single() else {
        return f64::NAN;
    };
    let offset = (day - 1.0) * 86_400_000.0
        + hours * 3_600_000.0
        + minutes * 60_000.0
        + seconds * 1000.0
        + millis;
    base.timestamp_millis() as f64 + offset
}

fn parse_date_string(s: &str) -> f64 {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return dt.and_utc().timestamp_millis() as f64;
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%a %b %e %H:%M:%S GMT%z %Y") {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map_or(f64::NAN, |d| d.and_utc().timestamp_millis() as f64);
    }
    f64::NAN
}

fn new_date(ctx: &ExecutionContext, millis: f64) -> AvmValue {
    AvmValue::Object(ScriptObject::new_date(
        Some(ctx.prototypes().date.cheap_clone()),
        millis,
    ))
}

/// `new Date()`, `new Date(millis | string)` or `new Date(y, m, d, h, mi, s, ms)`
pub fn construct(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let millis = match args {
        [] => interp.now_millis() as f64,
        [AvmValue::String(s)] => parse_date_string(s.as_str()),
        [value] => interp.to_number(ctx, value)?,
        _ => {
            let mut components = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
            for (slot, value) in components.iter_mut().zip(args) {
                *slot = interp.to_number(ctx, value)?;
            }
            make_date_from_components(components)
        }
    };
    Ok(new_date(ctx, millis))
}

/// `Date()` called without `new` gives the current time as a string
pub fn date_constructor(
    interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::from(format_date(interp.now_millis() as f64)))
}

pub fn date_utc(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let mut components = [f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
    for (slot, value) in components.iter_mut().zip(args) {
        *slot = interp.to_number(ctx, value)?;
    }
    Ok(AvmValue::Number(make_date_from_components(components)))
}

fn this_date(this: &AvmValue) -> Result<&ScriptObject, AvmError> {
    this.as_object()
        .and_then(|obj| obj.as_script_object())
        .filter(|obj| obj.date_value().is_some())
        .ok_or_else(|| AvmError::script("Date.prototype method called on a non-date"))
}

fn this_timestamp(this: &AvmValue) -> Result<f64, AvmError> {
    Ok(this_date(this)?.date_value().unwrap_or(f64::NAN))
}

fn to_datetime(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Apply `component` to the date in `this`, NaN for an invalid date
fn date_component(
    this: &AvmValue,
    component: impl FnOnce(&DateTime<Utc>) -> f64,
) -> Result<AvmValue, AvmError> {
    let millis = this_timestamp(this)?;
    Ok(AvmValue::Number(to_datetime(millis).map_or(f64::NAN, |dt| component(&dt))))
}

fn format_date(millis: f64) -> String {
    match to_datetime(millis) {
        Some(dt) => dt.format("%a %b %-d %H:%M:%S GMT+0000 %Y").to_string(),
        None => "Invalid Date".to_string(),
    }
}

pub fn date_get_time(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::Number(this_timestamp(&this)?))
}

pub fn date_set_time(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let millis = interp.to_number(ctx, &arg(args, 0))?;
    let millis = if millis.is_finite() { millis.trunc() } else { f64::NAN };
    this_date(&this)?.set_date_value(millis);
    Ok(AvmValue::Number(millis))
}

pub fn date_get_full_year(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    date_component(&this, |dt| f64::from(dt.year()))
}

pub fn date_get_month(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    date_component(&this, |dt| f64::from(dt.month0()))
}

pub fn date_get_date(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    date_component(&this, |dt| f64::from(dt.day()))
}

pub fn date_get_day(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    date_component(&this, |dt| f64::from(dt.weekday().num_days_from_sunday()))
}

pub fn date_get_hours(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    date_component(&this, |dt| f64::from(dt.hour()))
}

pub fn date_get_minutes(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    date_component(&this, |dt| f64::from(dt.minute()))
}

pub fn date_get_seconds(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    date_component(&this, |dt| f64::from(dt.second()))
}

pub fn date_get_milliseconds(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    date_component(&this, |dt| f64::from(dt.timestamp_subsec_millis()))
}

pub fn date_to_string(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::from(format_date(this_timestamp(&this)?)))
}
