//! Wire types for the portal's assignment JSON endpoint.
//!
//! Every field is optional on the wire; absent values default rather than
//! fail, since the server omits fields freely.
use serde::Deserialize;

use crate::model::{Assignment, Course};

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentResponse {
    #[serde(default, rename = "assignment_collection")]
    pub assignments: Vec<AssignmentItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "dueTime")]
    pub due_time: Option<DueTime>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DueTime {
    #[serde(default, rename = "epochSecond")]
    pub epoch_second: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Submission {
    #[serde(default, rename = "userSubmission")]
    pub user_submission: bool,
}

impl AssignmentItem {
    /// Merge course context into one wire item. Any true user-submission
    /// flag marks the assignment submitted.
    pub fn into_assignment(self, course: &Course) -> Assignment {
        let is_submitted = self.submissions.iter().any(|s| s.user_submission);
        Assignment {
            id: self.id,
            title: self.title,
            due_time_seconds: self.due_time.and_then(|t| t.epoch_second),
            status: self.status,
            course_name: course.title.clone(),
            course_id: course.site_id.clone(),
            is_submitted,
        }
    }
}
