use crate::currency::{
    format_budget, parse_budget, BudgetAmount, Currency, DualCurrencyBudget, ExchangeRate,
};
use crate::ipc::helpers::{
    get_optional_f64, get_required_f64, get_required_str, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::debug;

fn budget_convert(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let amount = get_required_f64(params, "amount")?;
    let from_raw = get_required_str(params, "from")?;
    let Some(from) = Currency::parse(&from_raw) else {
        return Err(HandlerErr::bad_params("from must be USD or INR"));
    };
    let rate = match get_optional_f64(params, "rate")? {
        Some(r) => ExchangeRate::new(r)?,
        None => state.config.exchange_rate,
    };

    let budget = DualCurrencyBudget::new(BudgetAmount::new(from, amount)?, rate);
    let (usd, inr) = budget.both()?;
    Ok(json!({
        "source": from,
        "usd": usd,
        "inr": inr,
        "rate": rate.value()
    }))
}

fn budget_parse(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let text = get_required_str(params, "text")?;
    let (amount, parsed) = match parse_budget(&text) {
        Ok(v) => (v, true),
        Err(e) => {
            debug!(error = %e, "budget.parse using fallback");
            (0.0, false)
        }
    };
    Ok(json!({
        "amount": amount,
        "parsed": parsed,
        "formatted": format_budget(amount)
    }))
}

fn budget_format(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let amount = get_required_f64(params, "amount")?;
    Ok(json!({ "text": format_budget(amount) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "budget.convert" => budget_convert(state, &req.params),
        "budget.parse" => budget_parse(&req.params),
        "budget.format" => budget_format(&req.params),
        _ => return None,
    };
    Some(respond(req, out))
}
