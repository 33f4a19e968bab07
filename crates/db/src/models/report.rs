//! Teacher-authored progress reports.

use serde::Serialize;
use sqlx::FromRow;
use cortexa_core::types::{DbId, Timestamp};

/// A row from the `reports` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: DbId,
    pub teacher_id: DbId,
    pub patient_id: DbId,
    pub title: String,
    pub author: Option<String>,
    pub report_date: Timestamp,
    pub period: Option<String>,
    pub summary: Option<String>,
    pub strengths: Option<String>,
    pub recommendations: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateReport {
    pub teacher_id: DbId,
    pub patient_id: DbId,
    pub title: String,
    pub author: Option<String>,
    pub period: Option<String>,
    pub summary: Option<String>,
    pub strengths: Option<String>,
    pub recommendations: Option<String>,
    pub status: String,
}
