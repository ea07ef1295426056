use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::models::employee::{Address, Employee, EmployeeUpdate, NewEmployee};

#[derive(sqlx::FromRow, Debug)]
struct EmployeeRow {
    id: Uuid,
    employee_id: String,
    name: String,
    phone: String,
    date_of_birth: NaiveDate,
    date_of_joining: NaiveDate,
    department: String,
    employment_status: String,
    marital: Option<String>,
    gender: String,
    address_city: Option<String>,
    address_district: Option<String>,
    address_state: Option<String>,
    profile_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            employee_id: row.employee_id,
            name: row.name,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            date_of_joining: row.date_of_joining,
            department: row.department,
            employment_status: row.employment_status,
            marital: row.marital,
            gender: row.gender,
            address: Address {
                city: row.address_city,
                district: row.address_district,
                state: row.address_state,
            },
            profile_image: row.profile_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// Duplicate employee ids resolve to the oldest record.
const OLDEST_MATCH: &str = "SELECT id FROM employees WHERE employee_id = $1 ORDER BY created_at, id LIMIT 1";

/// Employee records in the `employees` table.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        PgRecordStore { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_all(&self) -> Result<Vec<Employee>, StoreError> {
        let rows = sqlx::query_as::<_, EmployeeRow>("SELECT * FROM employees ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn find_by_employee_id(&self, employee_id: &str) -> Result<Option<Employee>, StoreError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT * FROM employees WHERE employee_id = $1 ORDER BY created_at, id LIMIT 1",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Employee::from))
    }

    async fn insert(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            INSERT INTO employees (
                id, employee_id, name, phone, date_of_birth, date_of_joining, department,
                employment_status, marital, gender, address_city, address_district,
                address_state, profile_image, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&employee.employee_id)
        .bind(&employee.name)
        .bind(&employee.phone)
        .bind(employee.date_of_birth)
        .bind(employee.date_of_joining)
        .bind(&employee.department)
        .bind(&employee.employment_status)
        .bind(&employee.marital)
        .bind(&employee.gender)
        .bind(&employee.address.city)
        .bind(&employee.address.district)
        .bind(&employee.address.state)
        .bind(&employee.profile_image)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_by_employee_id(
        &self,
        employee_id: &str,
        update: &EmployeeUpdate,
    ) -> Result<Option<Employee>, StoreError> {
        let address = update.address.clone().unwrap_or_default();
        let sql = format!(
            r#"
            UPDATE employees SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                department = COALESCE($4, department),
                employment_status = COALESCE($5, employment_status),
                marital = COALESCE($6, marital),
                address_city = COALESCE($7, address_city),
                address_district = COALESCE($8, address_district),
                address_state = COALESCE($9, address_state),
                updated_at = $10
            WHERE id = ({})
            RETURNING *
            "#,
            OLDEST_MATCH
        );

        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(employee_id)
            .bind(&update.name)
            .bind(&update.phone)
            .bind(&update.department)
            .bind(&update.employment_status)
            .bind(&update.marital)
            .bind(&address.city)
            .bind(&address.district)
            .bind(&address.state)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn delete_by_employee_id(&self, employee_id: &str) -> Result<Option<Employee>, StoreError> {
        let sql = format!("DELETE FROM employees WHERE id = ({}) RETURNING *", OLDEST_MATCH);
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }
}
