//! Built-in transaction scripts and `{{var}}` templating

use super::types::{HttpMethod, ScriptStep};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Variables available to every run
pub type Variables = BTreeMap<String, String>;

fn login_step() -> ScriptStep {
    ScriptStep::new("submit_credentials", HttpMethod::Post, "/api/auth/login")
        .with_body(json!({ "email": "{{email}}", "password": "{{password}}" }))
        .capture("token", "/token")
}

fn search_step() -> ScriptStep {
    ScriptStep::new(
        "search_clinics",
        HttpMethod::Get,
        "/api/clinics/search?location={{search_location}}",
    )
    .capture("clinic_id", "/clinics/0/id")
}

/// Script of a built-in transaction type
pub fn builtin_script(transaction_type: &str) -> Option<Vec<ScriptStep>> {
    let script = match transaction_type {
        "health" => vec![ScriptStep::new("api_health", HttpMethod::Get, "/api/health")],
        "login" => vec![
            ScriptStep::new("fetch_login_form", HttpMethod::Get, "/login"),
            login_step(),
            ScriptStep::new("fetch_profile", HttpMethod::Get, "/api/auth/me").authenticated(),
        ],
        "search" => vec![
            search_step(),
            ScriptStep::new("view_clinic", HttpMethod::Get, "/api/clinics/{{clinic_id}}"),
        ],
        "booking" => vec![
            login_step(),
            search_step(),
            ScriptStep::new("create_booking", HttpMethod::Post, "/api/bookings")
                .authenticated()
                .with_body(json!({
                    "clinic_id": "{{clinic_id}}",
                    "notes": "synthetic booking {{run_id}}",
                }))
                .expect(&[200, 201])
                .capture("booking_id", "/booking/id"),
            ScriptStep::new("cancel_booking", HttpMethod::Delete, "/api/bookings/{{booking_id}}")
                .authenticated()
                .expect(&[200, 204]),
        ],
        "registration" => vec![
            ScriptStep::new("register", HttpMethod::Post, "/api/auth/register")
                .with_body(json!({
                    "email": "synthetic+{{run_id}}@caregrid.local",
                    "password": "{{password}}",
                    "name": "Synthetic Monitor",
                }))
                .expect(&[200, 201])
                .capture("token", "/token"),
            ScriptStep::new("delete_account", HttpMethod::Delete, "/api/users/me")
                .authenticated()
                .expect(&[200, 204]),
        ],
        "contact" => vec![
            ScriptStep::new("submit_contact_form", HttpMethod::Post, "/api/contact")
                .with_body(json!({
                    "name": "Synthetic Monitor",
                    "email": "{{email}}",
                    "message": "Synthetic contact check {{run_id}}",
                }))
                .expect(&[200, 201]),
        ],
        _ => return None,
    };
    Some(script)
}

/// Substitute `{{name}}` references; an unknown name is an error
pub fn render(template: &str, variables: &Variables) -> Result<String, String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| format!("unterminated variable in '{}'", template))?;
        let name = after[..end].trim();
        let value = variables
            .get(name)
            .ok_or_else(|| format!("unknown variable '{}'", name))?;
        output.push_str(value);
        rest = &after[end + 2..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Render every string inside a JSON body
pub fn render_value(value: &Value, variables: &Variables) -> Result<Value, String> {
    Ok(match value {
        Value::String(s) => Value::String(render(s, variables)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_value(item, variables))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| Ok((key.clone(), render_value(item, variables)?)))
                .collect::<Result<_, String>>()?,
        ),
        other => other.clone(),
    })
}

/// Captured values are stored as plain strings
pub fn capture_value(body: &Value, pointer: &str) -> Option<String> {
    match body.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
