use crate::ipc::helpers::{
    get_list, get_optional_str, get_optional_u32, get_required_str, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::roster::{
    at_risk, filter_by_performance, report_file_name, section_report_csv, PerformanceFilter,
    ReportKind, StudentStanding,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn performance_filter(params: &serde_json::Value) -> Result<PerformanceFilter, HandlerErr> {
    match get_optional_str(params, "performance") {
        None => Ok(PerformanceFilter::All),
        Some(raw) => PerformanceFilter::parse(raw).ok_or_else(|| {
            HandlerErr::bad_params("performance must be one of: All, Strong, Average, Weak")
        }),
    }
}

fn roster_filter(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let students: Vec<StudentStanding> = get_list(params, "students")?;
    let filter = performance_filter(params)?;
    let picked = filter_by_performance(&students, filter);
    Ok(json!({ "students": picked }))
}

fn roster_at_risk(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let students: Vec<StudentStanding> = get_list(params, "students")?;
    let min_attendance =
        get_optional_u32(params, "minAttendance")?.unwrap_or(state.config.at_risk_attendance);
    let flagged = at_risk(&students, min_attendance);
    Ok(json!({
        "count": flagged.len(),
        "minAttendance": min_attendance,
        "students": flagged
    }))
}

fn roster_export_csv(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let students: Vec<StudentStanding> = get_list(params, "students")?;
    let filter = performance_filter(params)?;
    let kind_raw = get_required_str(params, "kind")?;
    let Some(kind) = ReportKind::parse(&kind_raw) else {
        return Err(HandlerErr::bad_params("kind must be assigned or course"));
    };
    let out_dir = get_required_str(params, "outDir")?;
    if out_dir.trim().is_empty() {
        return Err(HandlerErr::bad_params("missing outDir"));
    }

    let rows = filter_by_performance(&students, filter);
    let rows_exported = rows.len();
    let csv = section_report_csv(rows);

    let file_name = report_file_name(kind, chrono::Utc::now().date_naive());
    let dir = PathBuf::from(out_dir.trim());
    let out = dir.join(&file_name);
    let io_err = |e: std::io::Error| {
        HandlerErr::new("io_failed", e.to_string())
            .with_details(json!({ "path": out.to_string_lossy() }))
    };
    std::fs::create_dir_all(&dir).map_err(io_err)?;
    std::fs::write(&out, csv).map_err(io_err)?;
    info!(path = %out.display(), rows = rows_exported, "exported section report");

    Ok(json!({
        "path": out.to_string_lossy(),
        "fileName": file_name,
        "rowsExported": rows_exported
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "roster.filter" => roster_filter(&req.params),
        "roster.atRisk" => roster_at_risk(state, &req.params),
        "roster.exportCsv" => roster_export_csv(&req.params),
        _ => return None,
    };
    Some(respond(req, out))
}
