use sqlx::MySqlPool;
use tracing::info;

pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Creates the attendance table. The `employees` table belongs to the
/// personnel application and is only read here.
pub async fn run_migrations(pool: &MySqlPool) -> anyhow::Result<()> {
    info!("Running attendance migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            employee_id BIGINT UNSIGNED NOT NULL,
            date DATE NOT NULL,
            check_in_time DATETIME(6) NULL,
            check_out_time DATETIME(6) NULL,
            on_leave BOOLEAN NOT NULL DEFAULT FALSE,
            work_hours DOUBLE NULL,
            status VARCHAR(16) NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
            UNIQUE KEY uq_attendance_employee_date (employee_id, date),
            KEY idx_attendance_date (date),
            KEY idx_attendance_employee (employee_id),
            CONSTRAINT chk_attendance_status CHECK (status IN ('PRESENT', 'ABSENT', 'ON_LEAVE')),
            CONSTRAINT chk_attendance_check_out CHECK (
                check_out_time IS NULL
                OR (check_in_time IS NOT NULL AND check_out_time >= check_in_time)
            )
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Attendance migrations completed");
    Ok(())
}
