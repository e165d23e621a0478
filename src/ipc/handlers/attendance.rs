use crate::calc::{
    attendance_percentage, attendance_report, is_eligible, AttendanceAggregate, AttendanceBand,
    AttendanceRecord, AttendanceThresholds,
};
use crate::error::CalcError;
use crate::ipc::helpers::{
    get_list, get_optional_u32, get_required_u32, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn thresholds_with_override(
    base: AttendanceThresholds,
    params: &serde_json::Value,
) -> Result<AttendanceThresholds, HandlerErr> {
    let Some(eligibility) = get_optional_u32(params, "threshold")? else {
        return Ok(base);
    };
    if eligibility > 100 {
        return Err(HandlerErr::bad_params("threshold must be in 0..=100"));
    }
    Ok(AttendanceThresholds {
        eligibility,
        warning: base.warning.min(eligibility),
    })
}

fn attendance_percentage_for(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let attended = get_required_u32(params, "attended")?;
    let total = get_required_u32(params, "total")?;
    let thresholds = thresholds_with_override(state.config.thresholds, params)?;

    let (percentage, defined) = match attendance_percentage(attended, total) {
        Ok(p) => (p, true),
        Err(CalcError::DivisionByZero) => (0, false),
        Err(e) => return Err(e.into()),
    };
    Ok(json!({
        "percentage": percentage,
        "percentageDefined": defined,
        "eligible": defined && is_eligible(percentage, thresholds.eligibility),
        "band": AttendanceBand::classify(percentage, &thresholds),
        "threshold": thresholds.eligibility
    }))
}

fn attendance_eligibility(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let percentage = get_required_u32(params, "percentage")?;
    if percentage > 100 {
        return Err(HandlerErr::bad_params("percentage must be in 0..=100"));
    }
    let thresholds = thresholds_with_override(state.config.thresholds, params)?;
    Ok(json!({
        "eligible": is_eligible(percentage, thresholds.eligibility),
        "threshold": thresholds.eligibility
    }))
}

fn attendance_aggregate(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let records: Vec<AttendanceRecord> = get_list(params, "records")?;
    let thresholds = thresholds_with_override(state.config.thresholds, params)?;
    let agg = AttendanceAggregate::or_zero(&records);
    Ok(json!({
        "totalClasses": agg.total_classes,
        "totalAttended": agg.total_attended,
        "overallPercentage": agg.overall_percentage,
        "percentageDefined": agg.percentage_defined,
        "eligible": agg.percentage_defined
            && is_eligible(agg.overall_percentage, thresholds.eligibility),
        "threshold": thresholds.eligibility
    }))
}

fn attendance_report_for(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let records: Vec<AttendanceRecord> = get_list(params, "records")?;
    let thresholds = thresholds_with_override(state.config.thresholds, params)?;
    let report = attendance_report(&records, &thresholds);
    serde_json::to_value(report).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "attendance.percentage" => attendance_percentage_for(state, &req.params),
        "attendance.eligibility" => attendance_eligibility(state, &req.params),
        "attendance.aggregate" => attendance_aggregate(state, &req.params),
        "attendance.report" => attendance_report_for(state, &req.params),
        _ => return None,
    };
    Some(respond(req, out))
}
