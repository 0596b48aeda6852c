// src/common/i18n.rs

// User-facing messages. Romanian for the field teams, English as fallback.

pub const DEFAULT_LANG: &str = "en";

pub fn message(lang: &str, key: &str) -> String {
    let found = match lang {
        "ro" => ro(key),
        _ => None,
    };

    found
        .or_else(|| en(key))
        .unwrap_or(key)
        .to_string()
}

fn ro(key: &str) -> Option<&'static str> {
    let text = match key {
        "invalid_fields" => "Unul sau mai multe câmpuri sunt invalide.",
        "step_incomplete" => "Pasul curent nu este complet",
        "invalid_transition" => "Tranziție invalidă pentru pasul curent.",
        "invalid_draft" => "Date invalide în formular",
        "workflow_not_found" => "Formularul nu a fost găsit.",
        "customer_not_found" => "Clientul nu a fost găsit.",
        "employee_not_found" => "Angajatul nu a fost găsit.",
        "solution_not_found" => "Soluția nu a fost găsită.",
        "record_not_found" => "Lucrarea nu a fost găsită.",
        "already_exists" => "Înregistrarea există deja.",
        "insufficient_stock" => "Stoc insuficient",
        "invalid_credentials" => "E-mail sau parolă invalidă.",
        "invalid_token" => "Sesiune invalidă sau expirată.",
        "forbidden" => "Este necesar un cont de administrator.",
        "user_not_found" => "Utilizatorul nu a fost găsit.",
        "template_invalid" => "Șablonul PDF este invalid.",
        "render_failed" => "Procesul verbal nu a putut fi generat.",
        "missing_recipient" => "Lipsește adresa destinatarului.",
        "invalid_attachment" => "Atașament invalid",
        "external_call_failed" => "Serviciul extern nu a răspuns corect.",
        "submission_failed" => "Procesul verbal nu a putut fi trimis. Încercați din nou.",
        "internal_error" => "A apărut o eroare neașteptată.",
        "employee" => "angajatul",
        "customer" => "clientul",
        "operations" => "operațiunile",
        "representative_name" => "numele reprezentantului",
        "client_signature" => "semnătura clientului",
        "employee_signature" => "semnătura angajatului",
        _ => return None,
    };
    Some(text)
}

fn en(key: &str) -> Option<&'static str> {
    let text = match key {
        "invalid_fields" => "One or more fields are invalid.",
        "step_incomplete" => "The current step is incomplete",
        "invalid_transition" => "Invalid transition for the current step.",
        "invalid_draft" => "Invalid form data",
        "workflow_not_found" => "Workflow not found.",
        "customer_not_found" => "Customer not found.",
        "employee_not_found" => "Employee not found.",
        "solution_not_found" => "Solution not found.",
        "record_not_found" => "Service record not found.",
        "already_exists" => "The record already exists.",
        "insufficient_stock" => "Insufficient stock",
        "invalid_credentials" => "Invalid e-mail or password.",
        "invalid_token" => "Invalid or expired session.",
        "forbidden" => "An administrator session is required.",
        "user_not_found" => "User not found.",
        "template_invalid" => "The PDF template is invalid.",
        "render_failed" => "The certificate could not be generated.",
        "missing_recipient" => "The recipient address is missing.",
        "invalid_attachment" => "Invalid attachment",
        "external_call_failed" => "An external service failed.",
        "submission_failed" => "The certificate could not be submitted. Please try again.",
        "internal_error" => "An unexpected error occurred.",
        "employee" => "employee",
        "customer" => "customer",
        "operations" => "operations",
        "representative_name" => "representative name",
        "client_signature" => "client signature",
        "employee_signature" => "employee signature",
        _ => return None,
    };
    Some(text)
}
