//! Demo HR database for trying out table-mapped reports

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};
use tracing::info;

const FIRST_NAMES: &[&str] = &[
    "Asha", "Bala", "Chitra", "Deepak", "Esha", "Farhan", "Gita", "Hari", "Isha", "Jai",
];
const LAST_NAMES: &[&str] = &["Rao", "Iyer", "Menon", "Shah", "Das", "Nair"];
const DEPARTMENTS: &[(&str, &str)] = &[
    ("HR", "Mumbai"),
    ("Finance", "Pune"),
    ("Operations", "Chennai"),
    ("Engineering", "Bengaluru"),
];

/// Create `employees` and `departments` and fill them with `count` employees
pub fn create_demo_database(path: &Path, count: usize, seed: u64) -> Result<()> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    conn.execute_batch(
        "
        DROP TABLE IF EXISTS employees;
        DROP TABLE IF EXISTS departments;

        CREATE TABLE departments (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT
        );

        CREATE TABLE employees (
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT,
            department_id INTEGER,
            salary REAL,
            hire_date TEXT,
            review_date TEXT
        );
        ",
    )?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare("INSERT INTO departments (id, name, location) VALUES (?1, ?2, ?3)")?;
        for (i, (name, location)) in DEPARTMENTS.iter().enumerate() {
            stmt.execute(params![i as i64 + 1, name, location])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO employees (id, first_name, last_name, department_id, salary, hire_date, review_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut rng = StdRng::seed_from_u64(seed);
        let base = NaiveDate::from_ymd_opt(2015, 1, 1).context("invalid base date")?;

        for i in 0..count {
            let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
            let department = rng.gen_range(1..=DEPARTMENTS.len()) as i64;
            let salary = (rng.gen_range(2500.0..9000.0_f64) * 100.0).round() / 100.0;
            let hired = base + Duration::days(rng.gen_range(0..3000));
            let review = hired + Duration::days(365);

            stmt.execute(params![
                i as i64 + 1,
                first,
                last,
                department,
                salary,
                hired.format("%Y-%m-%d").to_string(),
                review.format("%Y-%m-%d").to_string(),
            ])?;
        }
    }
    tx.commit()?;

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_employees_department ON employees(department_id);
        CREATE INDEX IF NOT EXISTS idx_employees_hire_date ON employees(hire_date);
        ",
    )?;

    info!(path = %path.display(), employees = count, "demo database created");
    Ok(())
}
