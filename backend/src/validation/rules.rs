//! Validation rules for submissions and edits.

use chrono::NaiveDate;
use validator::{Validate, ValidationError};

use crate::{
    error::AppError,
    models::{
        request::{EditRequestPayload, SubmitRequestPayload},
        LeaveDetails, LeaveType, NewAbsenceRequest, Placement, RequestKind, RequestKindTag,
    },
};

/// Validates a leave duration against the configured continuous-days cap.
pub fn validate_leave_duration(duration: i32, max_days: i32) -> Result<(), ValidationError> {
    if duration < 1 {
        return Err(ValidationError::new("duration_must_be_positive"));
    }
    if duration > max_days {
        return Err(ValidationError::new("leave_duration_exceeds_limit"));
    }
    Ok(())
}

/// Inclusive day count of a leave window; the cap applies to this, not to
/// the client's `duration`.
fn leave_span_days(from_date: NaiveDate, to_date: NaiveDate) -> i32 {
    let days = (to_date - from_date).num_days() + 1;
    i32::try_from(days).unwrap_or(i32::MAX)
}

fn required(value: &Option<String>, field: &str, missing: &mut Vec<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(format!("{field} is required"));
            String::new()
        }
    }
}

/// Checks a submission and produces the record input. Nothing is persisted
/// and no notification is sent when this returns an error.
pub fn validate_submission(
    payload: &SubmitRequestPayload,
    leave_max_days: i32,
) -> Result<NewAbsenceRequest, AppError> {
    let mut errors = Vec::new();

    let Some(kind_tag) = payload.kind else {
        return Err(AppError::validation("kind is required (leave or od)"));
    };

    let student_name = required(&payload.student_name, "student_name", &mut errors);
    let student_email = required(&payload.student_email, "student_email", &mut errors);
    let from = required(&payload.from, "from", &mut errors);
    let to = required(&payload.to, "to", &mut errors);
    let subject = required(&payload.subject, "subject", &mut errors);
    let content = required(&payload.content, "content", &mut errors);
    let department = required(&payload.department, "department", &mut errors);
    let year = required(&payload.year, "year", &mut errors);
    let section = required(&payload.section, "section", &mut errors);

    let mut duration = payload.duration.unwrap_or(1);

    let kind = match kind_tag {
        RequestKindTag::Od => {
            if duration < 1 {
                errors.push("duration must be at least 1".to_string());
            }
            Some(RequestKind::Od)
        }
        RequestKindTag::Leave => {
            let leave_type = required(&payload.leave_type, "leave_type", &mut errors);
            let leave_type = if leave_type.is_empty() {
                None
            } else {
                match leave_type.parse::<LeaveType>() {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        errors.push(err);
                        None
                    }
                }
            };
            if payload.from_date.is_none() {
                errors.push("from_date is required".to_string());
            }
            if payload.to_date.is_none() {
                errors.push("to_date is required".to_string());
            }
            if let (Some(start), Some(end)) = (payload.from_date, payload.to_date) {
                if start > end {
                    errors.push("from_date must be <= to_date".to_string());
                } else {
                    let span = leave_span_days(start, end);
                    if payload.duration.is_some_and(|claimed| claimed != span) {
                        errors.push(format!(
                            "duration must equal the {span} day(s) from from_date to to_date"
                        ));
                    }
                    duration = span;
                }
            }
            if let Err(err) = validate_leave_duration(duration, leave_max_days) {
                errors.push(if err.code == "leave_duration_exceeds_limit" {
                    format!(
                        "Leave application is limited to maximum {} continuous days",
                        leave_max_days
                    )
                } else {
                    "duration must be at least 1".to_string()
                });
            }
            let reason = payload
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| content.clone());
            match (leave_type, payload.from_date, payload.to_date) {
                (Some(leave_type), Some(from_date), Some(to_date)) => {
                    Some(RequestKind::Leave(LeaveDetails {
                        leave_type,
                        reason,
                        from_date,
                        to_date,
                    }))
                }
                _ => None,
            }
        }
    };

    if let Err(format_errors) = payload.validate() {
        if let AppError::Validation(messages) = AppError::from(format_errors) {
            errors.extend(messages);
        }
    }

    match kind {
        Some(kind) if errors.is_empty() => Ok(NewAbsenceRequest {
            student_name,
            student_email: student_email.to_ascii_lowercase(),
            from,
            to,
            subject,
            content,
            kind,
            duration,
            placement: Placement {
                department,
                year,
                section,
            },
            attachment: payload
                .attachment
                .as_ref()
                .filter(|a| !a.is_empty())
                .cloned(),
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

/// Checks an edit payload against the request kind it will be applied to.
pub fn validate_edit(payload: &EditRequestPayload, kind: RequestKindTag) -> Result<(), AppError> {
    payload.validate()?;
    if kind == RequestKindTag::Od && (payload.reason.is_some() || payload.leave_type.is_some()) {
        return Err(AppError::validation(
            "reason and leave_type can only be edited on leave requests",
        ));
    }
    if let Some(raw) = payload.leave_type.as_deref() {
        raw.parse::<LeaveType>().map_err(AppError::validation)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn od_payload() -> SubmitRequestPayload {
        SubmitRequestPayload {
            kind: Some(RequestKindTag::Od),
            student_name: Some("A".into()),
            student_email: Some("A@College.edu".into()),
            from: Some("2025-03-01 09:00".into()),
            to: Some("2025-03-01 17:00".into()),
            subject: Some("Hackathon".into()),
            content: Some("Participating in the state hackathon".into()),
            department: Some("CSE".into()),
            year: Some("2".into()),
            section: Some("A".into()),
            ..Default::default()
        }
    }

    fn leave_payload(duration: i32) -> SubmitRequestPayload {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        SubmitRequestPayload {
            kind: Some(RequestKindTag::Leave),
            leave_type: Some("Sick Leave".into()),
            from_date: Some(date),
            to_date: Some(date + chrono::Duration::days(i64::from(duration) - 1)),
            duration: Some(duration),
            ..od_payload()
        }
    }

    #[test]
    fn leave_duration_rule_enforces_cap() {
        assert!(validate_leave_duration(1, 2).is_ok());
        assert!(validate_leave_duration(2, 2).is_ok());
        assert!(validate_leave_duration(3, 2).is_err());
        assert!(validate_leave_duration(0, 2).is_err());
    }

    #[test]
    fn od_submission_is_accepted_and_email_lowercased() {
        let input = validate_submission(&od_payload(), 2).expect("valid od");
        assert_eq!(input.kind, RequestKind::Od);
        assert_eq!(input.student_email, "a@college.edu");
        assert_eq!(input.duration, 1);
    }

    #[test]
    fn leave_reason_defaults_to_content() {
        let input = validate_submission(&leave_payload(2), 2).expect("valid leave");
        let details = input.kind.leave().expect("leave details");
        assert_eq!(details.reason, "Participating in the state hackathon");
        assert_eq!(details.leave_type, LeaveType::Sick);
    }

    #[test]
    fn leave_over_cap_is_rejected() {
        let err = validate_submission(&leave_payload(3), 2).expect_err("over cap");
        match err {
            AppError::Validation(messages) => assert!(messages
                .iter()
                .any(|m| m.contains("maximum 2 continuous days"))),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn leave_cap_counts_the_date_window_not_the_claimed_duration() {
        let wide = SubmitRequestPayload {
            from_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            to_date: NaiveDate::from_ymd_opt(2025, 3, 20),
            duration: None,
            ..leave_payload(1)
        };
        match validate_submission(&wide, 2).expect_err("twenty days") {
            AppError::Validation(messages) => assert!(messages
                .iter()
                .any(|m| m.contains("maximum 2 continuous days"))),
            other => panic!("unexpected error: {other:?}"),
        }

        let understated = SubmitRequestPayload {
            duration: Some(1),
            ..leave_payload(2)
        };
        match validate_submission(&understated, 5).expect_err("mismatch") {
            AppError::Validation(messages) => {
                assert!(messages.iter().any(|m| m.starts_with("duration must equal the 2")))
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let implied = SubmitRequestPayload {
            duration: None,
            ..leave_payload(2)
        };
        assert_eq!(validate_submission(&implied, 2).expect("two days").duration, 2);
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let payload = SubmitRequestPayload {
            subject: None,
            department: Some("   ".into()),
            ..od_payload()
        };
        match validate_submission(&payload, 2).expect_err("missing") {
            AppError::Validation(messages) => {
                assert!(messages.contains(&"subject is required".to_string()));
                assert!(messages.contains(&"department is required".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_kind_and_bad_email_are_rejected() {
        let payload = SubmitRequestPayload {
            kind: None,
            ..od_payload()
        };
        assert!(matches!(
            validate_submission(&payload, 2),
            Err(AppError::Validation(_))
        ));

        let payload = SubmitRequestPayload {
            student_email: Some("not-an-email".into()),
            ..od_payload()
        };
        assert!(matches!(
            validate_submission(&payload, 2),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn leave_requires_type_and_ordered_dates() {
        let mut payload = leave_payload(1);
        payload.leave_type = Some("Vacation".into());
        assert!(validate_submission(&payload, 2).is_err());

        let mut payload = leave_payload(1);
        payload.to_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert!(validate_submission(&payload, 2).is_err());
    }

    #[test]
    fn edit_rejects_leave_fields_on_od() {
        let payload = EditRequestPayload {
            reason: Some("changed".into()),
            ..Default::default()
        };
        assert!(validate_edit(&payload, RequestKindTag::Od).is_err());
        assert!(validate_edit(&payload, RequestKindTag::Leave).is_ok());

        let payload = EditRequestPayload {
            subject: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_edit(&payload, RequestKindTag::Leave).is_err());
    }
}
