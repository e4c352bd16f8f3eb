use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::{Error, Session, Store};
use crate::models::department::Department;
use crate::models::employee::Employee;
use crate::models::page::PageRequest;

const DEPARTMENT_COLUMNS: &str = "id, name, created_at, updated_at";
const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, department_id, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgSession;

    async fn begin(&self) -> Result<PgSession, Error> {
        Ok(PgSession {
            tx: self.pool.begin().await?,
        })
    }
}

pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, request: &PageRequest) {
    builder.push(" ORDER BY ");
    for sort in &request.sort {
        builder.push(sort.column);
        builder.push(" ");
        builder.push(sort.direction.as_sql());
        builder.push(", ");
    }
    builder.push("id ASC LIMIT ");
    builder.push_bind(request.limit());
    builder.push(" OFFSET ");
    builder.push_bind(request.offset());
}

#[async_trait]
impl Session for PgSession {
    async fn department_find_all(&mut self) -> Result<Vec<Department>, Error> {
        let sql = format!("SELECT {} FROM department", DEPARTMENT_COLUMNS);
        let departments = sqlx::query_as::<_, Department>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(departments)
    }

    async fn department_find_page(
        &mut self,
        request: &PageRequest,
    ) -> Result<(Vec<Department>, i64), Error> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM department", DEPARTMENT_COLUMNS));
        push_page(&mut builder, request);
        debug!("department page query: {}", builder.sql());

        let departments = builder
            .build_query_as::<Department>()
            .fetch_all(&mut *self.tx)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM department")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok((departments, total))
    }

    async fn department_find_by_id(&mut self, id: i64) -> Result<Option<Department>, Error> {
        let sql = format!("SELECT {} FROM department WHERE id = $1", DEPARTMENT_COLUMNS);
        let department = sqlx::query_as::<_, Department>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(department)
    }

    async fn department_exists(&mut self, id: i64) -> Result<bool, Error> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM department WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn department_save(&mut self, department: &Department) -> Result<Department, Error> {
        if !department.is_persisted() {
            let sql = format!(
                "INSERT INTO department (name, created_at, updated_at) VALUES ($1, $2, $3) RETURNING {}",
                DEPARTMENT_COLUMNS
            );
            let saved = sqlx::query_as::<_, Department>(&sql)
                .bind(&department.name)
                .bind(department.audit.created_at)
                .bind(department.audit.updated_at)
                .fetch_one(&mut *self.tx)
                .await?;
            return Ok(saved);
        }

        let sql = format!(
            "UPDATE department SET name = $1, updated_at = $2 WHERE id = $3 RETURNING {}",
            DEPARTMENT_COLUMNS
        );
        let mut audit = department.audit.clone();
        audit.touch();
        let saved = sqlx::query_as::<_, Department>(&sql)
            .bind(&department.name)
            .bind(audit.updated_at)
            .bind(department.id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(saved)
    }

    async fn department_delete(&mut self, id: i64) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM department WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        Ok(())
    }

    async fn employee_find_all(&mut self) -> Result<Vec<Employee>, Error> {
        let sql = format!("SELECT {} FROM employee", EMPLOYEE_COLUMNS);
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(employees)
    }

    async fn employee_find_page(
        &mut self,
        request: &PageRequest,
    ) -> Result<(Vec<Employee>, i64), Error> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM employee", EMPLOYEE_COLUMNS));
        push_page(&mut builder, request);
        debug!("employee page query: {}", builder.sql());

        let employees = builder
            .build_query_as::<Employee>()
            .fetch_all(&mut *self.tx)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employee")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok((employees, total))
    }

    async fn employee_find_by_id(&mut self, id: i64) -> Result<Option<Employee>, Error> {
        let sql = format!("SELECT {} FROM employee WHERE id = $1", EMPLOYEE_COLUMNS);
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(employee)
    }

    async fn employee_find_by_departments(
        &mut self,
        department_ids: &[i64],
    ) -> Result<Vec<Employee>, Error> {
        if department_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM employee WHERE department_id = ANY($1) ORDER BY id",
            EMPLOYEE_COLUMNS
        );
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(department_ids.to_vec())
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(employees)
    }

    async fn employee_save(&mut self, employee: &Employee) -> Result<Employee, Error> {
        if !employee.is_persisted() {
            let sql = format!(
                "INSERT INTO employee (first_name, last_name, department_id, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {}",
                EMPLOYEE_COLUMNS
            );
            let saved = sqlx::query_as::<_, Employee>(&sql)
                .bind(&employee.first_name)
                .bind(&employee.last_name)
                .bind(employee.department_id)
                .bind(employee.audit.created_at)
                .bind(employee.audit.updated_at)
                .fetch_one(&mut *self.tx)
                .await?;
            return Ok(saved);
        }

        let sql = format!(
            "UPDATE employee SET first_name = $1, last_name = $2, department_id = $3, updated_at = $4 \
             WHERE id = $5 RETURNING {}",
            EMPLOYEE_COLUMNS
        );
        let mut audit = employee.audit.clone();
        audit.touch();
        let saved = sqlx::query_as::<_, Employee>(&sql)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(employee.department_id)
            .bind(audit.updated_at)
            .bind(employee.id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(saved)
    }

    async fn employee_delete(&mut self, id: i64) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM employee WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        Ok(())
    }

    async fn employee_detach_all_by_department(
        &mut self,
        department_id: i64,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE employee SET department_id = NULL, updated_at = $2 WHERE department_id = $1",
        )
        .bind(department_id)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), Error> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::Direction;

    async fn seed(store: &PgStore) -> (Department, Employee) {
        let mut tx = store.begin().await.unwrap();
        let department = tx.department_save(&Department::new("Engineering")).await.unwrap();
        let mut employee = Employee::new("Ada", "Lovelace");
        employee.attach(&department);
        let employee = tx.employee_save(&employee).await.unwrap();
        tx.commit().await.unwrap();
        (department, employee)
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn insert_assigns_ids(pool: PgPool) -> sqlx::Result<()> {
        let store = PgStore::new(pool);
        let (department, employee) = seed(&store).await;

        assert!(department.is_persisted());
        assert!(employee.belongs_to(department.id));
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn duplicate_name_is_unique_violation(pool: PgPool) -> sqlx::Result<()> {
        let store = PgStore::new(pool);
        seed(&store).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx.department_save(&Department::new("Engineering")).await;
        assert!(matches!(result, Err(Error::UniqueViolation(_))));
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn delete_without_detach_violates_foreign_key(pool: PgPool) -> sqlx::Result<()> {
        let store = PgStore::new(pool);
        let (department, _) = seed(&store).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx.department_delete(department.id).await;
        assert!(matches!(result, Err(Error::ForeignKeyViolation(_))));
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn detach_then_delete_commits_together(pool: PgPool) -> sqlx::Result<()> {
        let store = PgStore::new(pool);
        let (department, employee) = seed(&store).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.employee_detach_all_by_department(department.id).await.unwrap(), 1);
        tx.department_delete(department.id).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.department_exists(department.id).await.unwrap());
        let reloaded = tx.employee_find_by_id(employee.id).await.unwrap().unwrap();
        assert_eq!(reloaded.department_id, None);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn rollback_discards_detach(pool: PgPool) -> sqlx::Result<()> {
        let store = PgStore::new(pool);
        let (department, employee) = seed(&store).await;

        let mut tx = store.begin().await.unwrap();
        tx.employee_detach_all_by_department(department.id).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let reloaded = tx.employee_find_by_id(employee.id).await.unwrap().unwrap();
        assert!(reloaded.belongs_to(department.id));
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn page_is_sorted_and_counted(pool: PgPool) -> sqlx::Result<()> {
        let store = PgStore::new(pool);
        let mut tx = store.begin().await.unwrap();
        for name in ["Ops", "Finance", "Legal"] {
            tx.department_save(&Department::new(name)).await.unwrap();
        }

        let request = PageRequest::new(0, 2).sorted_by("name", Direction::Asc);
        let (rows, total) = tx.department_find_page(&request).await.unwrap();
        let names: Vec<_> = rows.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Finance", "Legal"]);
        assert_eq!(total, 3);
        Ok(())
    }
}
