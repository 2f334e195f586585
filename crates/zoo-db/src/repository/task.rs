//! # Task Repository
//!
//! Keeper tasks and the completion workflows that consume stock.
//!
//! ## Completion Workflows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  complete_feeding / complete_treatment                                  │
//! │                                                                         │
//! │  BEGIN IMMEDIATE                                                       │
//! │       │                                                                 │
//! │       ├── task exists?              else ReferenceNotFound             │
//! │       ├── task kind matches?        else WrongTaskKind                 │
//! │       ├── not yet completed?        else TaskAlreadyCompleted          │
//! │       ├── destination (animal, else habitat)                           │
//! │       │                                                                 │
//! │       ├── process_exit_lines(feeding | treatment exit type)            │
//! │       ├── feeding only: every log line's product active?             │
//! │       │                 INSERT feeding_logs + feeding_log_lines      │
//! │       ├── UPDATE tasks SET is_completed = 1                            │
//! │       ▼                                                                 │
//! │  COMMIT   ── exit, log and completion land together or not at all      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;
use zoo_core::request::{FeedingCompletion, NewTask, TreatmentCompletion};
use zoo_core::validation::{feeding_exit_lines, treatment_exit_lines, validate_new_task};
use zoo_core::{
    CoreError, Destination, ExitOutcome, FeedingLog, FeedingLogLine, FeedingRecord, Task, TaskKind,
    ValidationError, FEEDING_EXIT_TYPE_ID, TREATMENT_EXIT_TYPE_ID,
};

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::exit::process_exit_lines;
use crate::repository::lot;

const TASK_COLUMNS: &str = "id, title, description, kind, animal_id, habitat_id, assigned_user_id, \
     scheduled_for, is_completed, completed_at, completion_notes, created_at, updated_at";

/// Repository for keeper tasks.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    /// Creates a new TaskRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaskRepository { pool }
    }

    /// Schedules a task.
    ///
    /// ## Returns
    /// * `Err(Core(Validation))` - Blank title, malformed ids, or a feeding or
    ///   treatment task without a destination
    /// * `Err(Core(ReferenceNotFound))` - Animal or habitat unknown or inactive
    pub async fn create(&self, request: &NewTask) -> DbResult<Task> {
        validate_new_task(request)?;

        let mut tx = begin_write(&self.pool).await?;

        if let Some(animal_id) = &request.animal_id {
            lot::ensure_destination_active(&mut tx, &Destination::Animal(animal_id.clone())).await?;
        }
        if let Some(habitat_id) = &request.habitat_id {
            lot::ensure_destination_active(&mut tx, &Destination::Habitat(habitat_id.clone()))
                .await?;
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            description: request.description.clone(),
            kind: request.kind,
            animal_id: request.animal_id.clone(),
            habitat_id: request.habitat_id.clone(),
            assigned_user_id: request.assigned_user_id.clone(),
            scheduled_for: request.scheduled_for,
            is_completed: false,
            completed_at: None,
            completion_notes: None,
            created_at: now,
            updated_at: now,
        };

        debug!(task_id = %task.id, kind = %task.kind, "Creating task");

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, title, description, kind, animal_id, habitat_id, assigned_user_id,
                scheduled_for, is_completed, completed_at, completion_notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, NULL, ?9, ?10)
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.kind)
        .bind(&task.animal_id)
        .bind(&task.habitat_id)
        .bind(&task.assigned_user_id)
        .bind(task.scheduled_for)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(task)
    }

    /// Gets a task by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);

        let task = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    /// Open tasks scheduled on or before `date`, oldest first.
    pub async fn list_pending(&self, date: NaiveDate) -> DbResult<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE is_completed = 0 AND scheduled_for <= ?1 \
             ORDER BY scheduled_for, created_at",
            TASK_COLUMNS
        );

        let tasks = sqlx::query_as(&sql).bind(date).fetch_all(&self.pool).await?;

        Ok(tasks)
    }

    /// The feeding log written when a feeding task was completed.
    pub async fn feeding_log(&self, task_id: &str) -> DbResult<Option<(FeedingLog, Vec<FeedingLogLine>)>> {
        let log: Option<FeedingLog> = sqlx::query_as(
            "SELECT id, task_id, user_id, animal_id, habitat_id, notes, fed_at FROM feeding_logs WHERE task_id = ?1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(log) = log else {
            return Ok(None);
        };

        let lines = sqlx::query_as(
            r#"
            SELECT id, feeding_log_id, product_id, quantity_delivered, quantity_consumed
            FROM feeding_log_lines
            WHERE feeding_log_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(&log.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((log, lines)))
    }

    // =========================================================================
    // Completion Workflows
    // =========================================================================

    /// Completes a feeding task.
    ///
    /// Delivered quantities leave the warehouse (feeding exit type) toward
    /// the task's animal, or its habitat when no animal is set. Every line,
    /// including zero deliveries, is kept in the feeding log.
    ///
    /// ## Returns
    /// * `Ok(FeedingRecord)` - Log, lines and the exit it caused
    /// * `Err(Core(InsufficientStock))` - Nothing written, task stays open
    pub async fn complete_feeding(
        &self,
        task_id: &str,
        user_id: &str,
        completion: &FeedingCompletion,
    ) -> DbResult<FeedingRecord> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let task = load_open_task(&mut tx, task_id, TaskKind::Feeding).await?;
        let destination = task_destination(&task)?;
        let exit_lines = feeding_exit_lines(completion, &destination)?;

        let exit = process_exit_lines(&mut tx, FEEDING_EXIT_TYPE_ID, user_id, &exit_lines).await?;

        let log = FeedingLog {
            id: Uuid::new_v4().to_string(),
            task_id: task.id.clone(),
            user_id: user_id.to_string(),
            animal_id: destination.animal_id().map(str::to_string),
            habitat_id: destination.habitat_id().map(str::to_string),
            notes: completion.notes.clone(),
            fed_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO feeding_logs (id, task_id, user_id, animal_id, habitat_id, notes, fed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&log.id)
        .bind(&log.task_id)
        .bind(&log.user_id)
        .bind(&log.animal_id)
        .bind(&log.habitat_id)
        .bind(&log.notes)
        .bind(log.fed_at)
        .execute(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(completion.lines.len());
        for (line_no, line) in completion.lines.iter().enumerate() {
            // Zero deliveries never reach the exit, so their product is checked here
            lot::lock_product(&mut tx, &line.product_id).await?;

            let log_line = FeedingLogLine {
                id: Uuid::new_v4().to_string(),
                feeding_log_id: log.id.clone(),
                product_id: line.product_id.clone(),
                quantity_delivered: line.quantity_delivered,
                quantity_consumed: line.quantity_consumed,
            };

            sqlx::query(
                r#"
                INSERT INTO feeding_log_lines (
                    id, feeding_log_id, product_id, quantity_delivered, quantity_consumed, line_no
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&log_line.id)
            .bind(&log_line.feeding_log_id)
            .bind(&log_line.product_id)
            .bind(log_line.quantity_delivered)
            .bind(log_line.quantity_consumed)
            .bind(line_no as i64)
            .execute(&mut *tx)
            .await?;

            lines.push(log_line);
        }

        mark_completed(&mut tx, &task.id, completion.notes.as_deref(), now).await?;
        tx.commit().await?;

        info!(
            task_id = %task.id,
            exit_id = %exit.exit.id,
            destination = %destination,
            "Feeding task completed"
        );

        Ok(FeedingRecord { log, lines, exit })
    }

    /// Completes a treatment task.
    ///
    /// Consumed quantities leave the warehouse (treatment exit type). No
    /// separate log is kept; the exit and the task completion are the record.
    pub async fn complete_treatment(
        &self,
        task_id: &str,
        user_id: &str,
        completion: &TreatmentCompletion,
    ) -> DbResult<ExitOutcome> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let task = load_open_task(&mut tx, task_id, TaskKind::Treatment).await?;
        let destination = task_destination(&task)?;
        let exit_lines = treatment_exit_lines(completion, &destination)?;

        let exit =
            process_exit_lines(&mut tx, TREATMENT_EXIT_TYPE_ID, user_id, &exit_lines).await?;

        mark_completed(&mut tx, &task.id, completion.notes.as_deref(), now).await?;
        tx.commit().await?;

        info!(
            task_id = %task.id,
            exit_id = %exit.exit.id,
            destination = %destination,
            "Treatment task completed"
        );

        Ok(exit)
    }

    /// Completes a general task. No stock moves.
    ///
    /// Feeding and treatment tasks must go through their own workflow and
    /// are rejected with `WrongTaskKind`.
    pub async fn complete_simple(&self, task_id: &str, notes: Option<&str>) -> DbResult<Task> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let task = load_open_task(&mut tx, task_id, TaskKind::General).await?;
        mark_completed(&mut tx, &task.id, notes, now).await?;
        tx.commit().await?;

        info!(task_id = %task.id, "Task completed");

        Ok(Task {
            is_completed: true,
            completed_at: Some(now),
            completion_notes: notes.map(str::to_string),
            updated_at: now,
            ..task
        })
    }
}

/// Loads a task and checks it can be completed by the `expected` workflow.
async fn load_open_task(
    conn: &mut SqliteConnection,
    task_id: &str,
    expected: TaskKind,
) -> DbResult<Task> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);

    let task: Task = sqlx::query_as(&sql)
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Task", task_id))?;

    if task.kind != expected {
        return Err(CoreError::WrongTaskKind {
            task_id: task.id,
            expected,
            actual: task.kind,
        }
        .into());
    }

    if task.is_completed {
        return Err(CoreError::TaskAlreadyCompleted(task.id).into());
    }

    Ok(task)
}

fn task_destination(task: &Task) -> DbResult<Destination> {
    let destination = task.destination().ok_or_else(|| ValidationError::MissingDestination {
        field: "task".to_string(),
    })?;
    Ok(destination)
}

async fn mark_completed(
    conn: &mut SqliteConnection,
    task_id: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE tasks SET
            is_completed = 1,
            completed_at = ?2,
            completion_notes = ?3,
            updated_at = ?2
        WHERE id = ?1 AND is_completed = 0
        "#,
    )
    .bind(task_id)
    .bind(now)
    .bind(notes)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::TaskAlreadyCompleted(task_id.to_string()).into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
