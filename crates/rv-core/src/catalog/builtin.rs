//! Reports shipped with the application

use once_cell::sync::Lazy;

use crate::model::{Field, FieldType, ReportDescriptor};

use super::Category;

static BUILTIN_CATEGORIES: Lazy<Vec<Category>> = Lazy::new(|| {
    vec![
        Category {
            id: "general".to_string(),
            title: "General".to_string(),
            reports: general_reports(),
        },
        Category {
            id: "anniversary".to_string(),
            title: "Anniversary/Review".to_string(),
            reports: anniversary_reports(),
        },
    ]
});

/// Category titles for user-created reports
pub const CUSTOM_CATEGORIES: &[(&str, &str)] = &[
    ("general", "General"),
    ("anniversary", "Anniversary/Review"),
    ("financial", "Financial"),
    ("hr", "Human Resources"),
    ("operations", "Operations"),
];

pub fn categories() -> &'static [Category] {
    &BUILTIN_CATEGORIES
}

pub fn category_title(id: &str) -> String {
    CUSTOM_CATEGORIES
        .iter()
        .find(|(cat_id, _)| *cat_id == id)
        .map(|(_, title)| title.to_string())
        .unwrap_or_else(|| id.to_string())
}

fn report(id: &str, title: &str, category: &str, schema: Vec<Field>) -> ReportDescriptor {
    ReportDescriptor {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        category: category.to_string(),
        schema,
    }
}

fn general_reports() -> Vec<ReportDescriptor> {
    vec![
        report(
            "401k-setup",
            "401k Setup",
            "general",
            vec![
                Field::new("employeeId", "Employee ID", FieldType::String).required(),
                Field::new("enrollmentDate", "Enrollment Date", FieldType::Date)
                    .with_format("YYYY-MM-DD")
                    .required(),
                Field::new("contribution", "Contribution %", FieldType::Number)
                    .with_format("0-100")
                    .with_calculation("sum"),
            ],
        ),
        report(
            "dependent-birthday",
            "Dependent Birthday",
            "general",
            vec![
                Field::new("employee", "Employee", FieldType::String).required(),
                Field::new("dependentName", "Dependent", FieldType::String).required(),
                Field::new("birthday", "Birthday", FieldType::Date)
                    .with_format("MMM DD, YYYY")
                    .required(),
            ],
        ),
        report(
            "direct-deposit-setup",
            "Direct Deposit Setup",
            "general",
            vec![
                Field::new("employee", "Employee", FieldType::String).required(),
                Field::new("bankName", "Bank", FieldType::String).required(),
                Field::new("account", "Account #", FieldType::Masked)
                    .with_format("****1234")
                    .required(),
            ],
        ),
        report(
            "personal-information",
            "Personal Information",
            "general",
            vec![
                Field::new("name", "Name", FieldType::String).required(),
                Field::new("address", "Address", FieldType::String),
                Field::new("phone", "Phone", FieldType::String).with_format("+91-xxxxx-xxxxx"),
            ],
        ),
    ]
}

fn anniversary_reports() -> Vec<ReportDescriptor> {
    vec![
        report(
            "employee-anniversary",
            "Employee Anniversary Report",
            "anniversary",
            vec![
                Field::new("employee", "Employee", FieldType::String).required(),
                Field::new("hireDate", "Hire Date", FieldType::Date)
                    .with_format("YYYY-MM-DD")
                    .required(),
                Field::new("years", "Years", FieldType::Number)
                    .with_calculation("datediff(hireDate, today)"),
            ],
        ),
        report(
            "employee-review-date",
            "Employee Review Date",
            "anniversary",
            vec![
                Field::new("employee", "Employee", FieldType::String).required(),
                Field::new("reviewDate", "Review Date", FieldType::Date)
                    .with_format("YYYY-MM-DD")
                    .required(),
            ],
        ),
    ]
}
