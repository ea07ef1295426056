use std::fmt::Write;

use crate::models::employee::Employee;

const HEADERS: [&str; 5] = ["S.No.", "Name", "Employee ID", "Department", "Phone Number"];

/// What the detail view could resolve for the profile image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageStatus {
    None,
    Available { url: String, content_type: String, size: usize },
    Failed,
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// The list view as a fixed-width table.
pub fn render_table(employees: &[&Employee]) -> String {
    let rows: Vec<[String; 5]> = employees
        .iter()
        .enumerate()
        .map(|(idx, employee)| {
            [
                (idx + 1).to_string(),
                or_na(&employee.name).to_string(),
                or_na(&employee.employee_id).to_string(),
                or_na(&employee.department).to_string(),
                or_na(&employee.phone).to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: &[&str]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        let _ = writeln!(out, "{}", line.join(" | ").trim_end());
    };

    push_row(&HEADERS);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&rule.iter().map(String::as_str).collect::<Vec<_>>());
    for row in &rows {
        push_row(&row.iter().map(String::as_str).collect::<Vec<_>>());
    }
    if rows.is_empty() {
        let _ = writeln!(out, "No employees found");
    }
    out
}

fn marital_status(marital: Option<&str>) -> &'static str {
    if marital == Some("True") {
        "Married"
    } else {
        "Unmarried"
    }
}

/// The detail view, one labelled field per line.
pub fn render_detail(employee: &Employee, image: &ImageStatus) -> String {
    let address = [&employee.address.city, &employee.address.district, &employee.address.state]
        .iter()
        .map(|part| part.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(", ");
    let image = match image {
        ImageStatus::Available { url, content_type, size } => format!("{} ({}, {} bytes)", url, content_type, size),
        ImageStatus::None | ImageStatus::Failed => "No Image Available".to_string(),
    };

    let fields = [
        ("Employee Id", employee.employee_id.clone()),
        ("Name", employee.name.clone()),
        ("Contact", employee.phone.clone()),
        ("Date of Birth", employee.date_of_birth.format("%Y-%m-%d").to_string()),
        ("Date of Joining", employee.date_of_joining.format("%Y-%m-%d").to_string()),
        ("Employee Department", employee.department.clone()),
        ("Employment Status", employee.employment_status.clone()),
        ("Marital Status", marital_status(employee.marital.as_deref()).to_string()),
        ("Gender", employee.gender.clone()),
        ("Address", address),
        ("Profile Image", image),
    ];

    let mut out = String::from("Employee's Complete Details\n\n");
    for (label, value) in fields {
        let _ = writeln!(out, "{:<20} : {}", label, value);
    }
    out
}
