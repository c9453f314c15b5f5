//! A line in a workout: which exercise, in which position, and how much of it.

use super::{expect_updated, Entity, Model};
use crate::db::Database;
use crate::{LiftlogError, Result};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub id: Option<i64>,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub sets: Option<i64>,
    pub reps_min: Option<i64>,
    pub reps_max: Option<i64>,
    /// Exercise performed back-to-back with this one.
    pub superset: Option<i64>,
    /// Position within the workout.
    pub exercise_num: Option<i64>,
    pub warmup: bool,
    /// Rest after the exercise, in seconds.
    pub rest: Option<i64>,
}

impl WorkoutExercise {
    pub fn new(workout_id: i64, exercise_id: i64) -> Self {
        Self {
            id: None,
            workout_id,
            exercise_id,
            sets: None,
            reps_min: None,
            reps_max: None,
            superset: None,
            exercise_num: None,
            warmup: false,
            rest: None,
        }
    }

    pub fn with_sets(mut self, sets: i64) -> Self {
        self.sets = Some(sets);
        self
    }

    pub fn with_reps(mut self, reps_min: i64, reps_max: i64) -> Self {
        self.reps_min = Some(reps_min);
        self.reps_max = Some(reps_max);
        self
    }

    pub fn with_superset(mut self, exercise_id: i64) -> Self {
        self.superset = Some(exercise_id);
        self
    }

    pub fn at_position(mut self, exercise_num: i64) -> Self {
        self.exercise_num = Some(exercise_num);
        self
    }

    pub fn as_warmup(mut self) -> Self {
        self.warmup = true;
        self
    }

    pub fn with_rest(mut self, seconds: i64) -> Self {
        self.rest = Some(seconds);
        self
    }

    /// Lines of a workout in exercise order.
    pub fn for_workout(db: &Database, workout_id: i64) -> Result<Vec<Self>> {
        Self::select_where(
            db,
            "workout_id = ?1 ORDER BY exercise_num IS NULL, exercise_num, id",
            [workout_id],
        )
    }
}

impl Entity for WorkoutExercise {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("sets", self.sets),
            ("reps_min", self.reps_min),
            ("reps_max", self.reps_max),
            ("rest", self.rest),
        ] {
            if matches!(value, Some(v) if v < 0) {
                return Err(LiftlogError::validation(field, "must not be negative"));
            }
        }
        if let (Some(min), Some(max)) = (self.reps_min, self.reps_max) {
            if min > max {
                return Err(LiftlogError::validation(
                    "reps_min",
                    format!("{} exceeds reps_max {}", min, max),
                ));
            }
        }
        Ok(())
    }

    fn insert(&self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO workout_exercises (workout_id, exercise_id, sets, reps_min, reps_max,
                                            superset, exercise_num, warmup, rest)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.workout_id,
                self.exercise_id,
                self.sets,
                self.reps_min,
                self.reps_max,
                self.superset,
                self.exercise_num,
                self.warmup,
                self.rest,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> Result<()> {
        let id = self.persisted_id()?;
        let rows = conn.execute(
            "UPDATE workout_exercises SET
                 workout_id=?1, exercise_id=?2, sets=?3, reps_min=?4, reps_max=?5,
                 superset=?6, exercise_num=?7, warmup=?8, rest=?9
             WHERE id = ?10",
            params![
                self.workout_id,
                self.exercise_id,
                self.sets,
                self.reps_min,
                self.reps_max,
                self.superset,
                self.exercise_num,
                self.warmup,
                self.rest,
                id,
            ],
        )?;
        expect_updated(rows, Self::TABLE, id)
    }
}

impl Model for WorkoutExercise {
    const TABLE: &'static str = "workout_exercises";
    const COLUMNS: &'static str =
        "id, workout_id, exercise_id, sets, reps_min, reps_max, superset, exercise_num, warmup, rest";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workout_id: row.get(1)?,
            exercise_id: row.get(2)?,
            sets: row.get(3)?,
            reps_min: row.get(4)?,
            reps_max: row.get(5)?,
            superset: row.get(6)?,
            exercise_num: row.get(7)?,
            warmup: row.get::<_, Option<bool>>(8)?.unwrap_or(false),
            rest: row.get(9)?,
        })
    }
}
