// Unit tests for domain models

use super::*;

fn trimmed(start: f64, end: f64) -> ProcessingParams {
    ProcessingParams::new("/videos/a.mp4", "/videos/b.mp4").with_trim(start, end)
}

#[test]
fn test_time_spec_parse_seconds() {
    let time = TimeSpec::parse("123.456").unwrap();
    assert_eq!(time.seconds, 123.456);
}

#[test]
fn test_time_spec_parse_mm_ss() {
    let time = TimeSpec::parse("01:30.5").unwrap();
    assert_eq!(time.seconds, 90.5);
}

#[test]
fn test_time_spec_parse_hh_mm_ss() {
    let time = TimeSpec::parse("01:02:03.5").unwrap();
    assert_eq!(time.seconds, 3723.5);
}

#[test]
fn test_time_spec_parse_invalid() {
    assert!(TimeSpec::parse("invalid").is_err());
    assert!(TimeSpec::parse("00:60").is_err()); // Invalid seconds
    assert!(TimeSpec::parse("01:61:00").is_err()); // Invalid minutes
    assert!(TimeSpec::parse("-10").is_err()); // Negative time
    assert!(TimeSpec::parse("1:2:3:4").is_err());
}

#[test]
fn test_time_spec_display() {
    assert_eq!(TimeSpec::from_seconds(3723.456).to_string(), "1:02:03.456");
    assert_eq!(TimeSpec::from_seconds(123.456).to_string(), "2:03.456");
}

#[test]
fn test_job_ids_are_unique_and_round_trip_through_strings() {
    let a = JobId::new();
    let b = JobId::new();
    assert_ne!(a, b);

    let parsed: JobId = a.to_string().parse().unwrap();
    assert_eq!(parsed, a);
    assert!("not-a-job".parse::<JobId>().is_err());
}

#[test]
fn test_job_state_terminality() {
    assert!(!JobState::Pending.is_terminal());
    assert!(!JobState::Running.is_terminal());
    assert!(JobState::Completed.is_terminal());
    assert!(JobState::Failed.is_terminal());
    assert!(JobState::Cancelled.is_terminal());
}

#[test]
fn test_params_validation_accepts_ordered_trim() {
    assert!(trimmed(10.0, 20.0).validate(HalfOpenTrimPolicy::Reject).is_ok());
    assert!(ProcessingParams::new("a.mp4", "b.mkv")
        .validate(HalfOpenTrimPolicy::Reject)
        .is_ok());
}

#[test]
fn test_params_validation_rejects_bad_ranges() {
    let err = trimmed(20.0, 10.0)
        .validate(HalfOpenTrimPolicy::Reject)
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTimeRange(_)));

    assert!(trimmed(10.0, 10.0)
        .validate(HalfOpenTrimPolicy::Reject)
        .is_err());
    assert!(trimmed(-1.0, 10.0)
        .validate(HalfOpenTrimPolicy::Reject)
        .is_err());
    assert!(trimmed(0.0, f64::NAN)
        .validate(HalfOpenTrimPolicy::Reject)
        .is_err());
}

#[test]
fn test_params_half_open_range_follows_policy() {
    let mut params = ProcessingParams::new("a.mp4", "b.mp4");
    params.start_time = Some(5.0);

    assert!(matches!(
        params.validate(HalfOpenTrimPolicy::Reject),
        Err(DomainError::InvalidTimeRange(_))
    ));
    assert!(params.validate(HalfOpenTrimPolicy::Allow).is_ok());

    params.start_time = None;
    params.end_time = Some(0.0);
    assert!(params.validate(HalfOpenTrimPolicy::Allow).is_err());
}

#[test]
fn test_params_output_container_is_checked() {
    let err = ProcessingParams::new("a.mp4", "b.gif")
        .validate(HalfOpenTrimPolicy::Reject)
        .unwrap_err();
    assert!(matches!(err, DomainError::UnsupportedContainer(_)));

    assert!(ProcessingParams::new("a.mp4", "B.MOV")
        .validate(HalfOpenTrimPolicy::Reject)
        .is_ok());
    assert!(ProcessingParams::new("a.mp4", "noext")
        .validate(HalfOpenTrimPolicy::Reject)
        .is_err());
}

#[test]
fn test_progress_span() {
    assert_eq!(trimmed(10.0, 20.0).progress_span(), Some(10.0));
    assert_eq!(
        ProcessingParams::new("a.mp4", "b.mp4").progress_span(),
        None
    );
    assert_eq!(
        ProcessingParams::new("a.mp4", "b.mp4")
            .with_source_duration(90.0)
            .progress_span(),
        Some(90.0)
    );

    let mut start_only = ProcessingParams::new("a.mp4", "b.mp4").with_source_duration(90.0);
    start_only.start_time = Some(30.0);
    assert_eq!(start_only.progress_span(), Some(60.0));

    let mut end_only = ProcessingParams::new("a.mp4", "b.mp4");
    end_only.end_time = Some(45.0);
    assert_eq!(end_only.progress_span(), Some(45.0));
}

#[test]
fn test_trim_window_percentages() {
    let window = TrimWindow::new(5.0, 125.0).unwrap();
    assert_eq!(window.duration(), 120.0);

    let percent = window.percent_at_source(65.5);
    assert!((percent - 50.416666).abs() < 1e-4, "got {}", percent);
    assert_eq!(window.percent_at_source(400.0), 100.0);
    assert_eq!(window.percent_at_source(1.0), 0.0);

    let short = TrimWindow::new(10.0, 20.0).unwrap();
    assert!((short.percent_at(2.0) - 20.0).abs() < 1e-9);
}

#[test]
fn test_params_deserialize_from_front_end_payload() {
    let params: ProcessingParams = serde_json::from_str(
        r#"{"inputFile":"a.mp4","outputFile":"b.mp4","startTime":10,"endTime":20}"#,
    )
    .unwrap();
    assert_eq!(params, trimmed_rel(10.0, 20.0));
    assert_eq!(params.subtitle_file, None);
}

fn trimmed_rel(start: f64, end: f64) -> ProcessingParams {
    ProcessingParams::new("a.mp4", "b.mp4").with_trim(start, end)
}

#[test]
fn test_events_carry_job_id_and_serialize_tagged() {
    let job_id = JobId::new();
    let progress = JobEvent::Progress(ProgressSample {
        job_id,
        elapsed_seconds: 2.0,
        percent: 20.0,
    });
    assert_eq!(progress.job_id(), job_id);
    assert!(!progress.is_terminal());
    assert_eq!(progress.channel(), "ffmpeg-progress");

    let json = serde_json::to_value(&progress).unwrap();
    assert_eq!(json["event"], "progress");
    assert_eq!(json["jobId"], job_id.to_string());
    assert_eq!(json["seconds"], 2.0);

    let failed = JobEvent::Failed {
        job_id,
        error: "boom".to_string(),
    };
    assert!(failed.is_terminal());
    let json = serde_json::to_value(&failed).unwrap();
    assert_eq!(json["event"], "failed");
    assert_eq!(json["error"], "boom");
    assert_eq!(json["jobId"], job_id.to_string());
}
