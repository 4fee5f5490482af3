use super::*;
use crate::job::MediaKind;
use crate::runner::{MockTestRunner, RunnerError};
use serde_json::json;
use tempfile::TempDir;

fn service_with(runner: MockTestRunner, results: &Path) -> GenerationService {
    GenerationService::new(
        Arc::new(runner),
        results,
        "gemini-2.5-flash",
        "gemini",
        1,
    )
}

#[test]
fn test_sanitize_test_id() {
    assert_eq!(sanitize_test_id("Q1_baseline").as_deref(), Some("Q1_baseline"));
    assert_eq!(
        sanitize_test_id("../../etc/passwd").as_deref(),
        Some(".._.._etc_passwd")
    );
    assert_eq!(sanitize_test_id("a b?c").as_deref(), Some("a_b_c"));
    assert_eq!(sanitize_test_id("  "), None);
    assert_eq!(sanitize_test_id("../"), None);
}

#[tokio::test]
async fn test_text_prompt_round_trip() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    let runner = MockTestRunner::new(&results);
    let service = service_with(runner.clone(), &results);

    let output = service
        .process(GenerationRequest::new("Wie soll bei einem Gasleck vorgegangen werden?"))
        .await
        .unwrap();

    assert!(output.test_id.starts_with("api_"));
    assert_eq!(output.result["test_id"], output.test_id);
    assert_eq!(
        output.result["response"],
        "Mock response for: Wie soll bei einem Gasleck vorgegangen werden?"
    );

    let jobs = runner.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].client, "gemini");
    assert_eq!(jobs[0].model, "gemini-2.5-flash");
    assert_eq!(jobs[0].input.kind, MediaKind::Text);
    assert!(jobs[0].input.context.is_empty());
}

#[tokio::test]
async fn test_caller_overrides_are_written_to_job() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    let runner = MockTestRunner::new(&results);
    let service = service_with(runner.clone(), &results);

    let mut context = Map::new();
    context.insert("station".to_string(), json!("PS-100"));

    let request = GenerationRequest {
        prompt: "Checkliste?".to_string(),
        context,
        test_id: Some("Q2_baseline".to_string()),
        model: Some("gemini-2.5-pro".to_string()),
        client: Some("vertex".to_string()),
        ..Default::default()
    };
    let output = service.process(request).await.unwrap();

    assert_eq!(output.test_id, "Q2_baseline");
    let job = &runner.jobs()[0];
    assert_eq!(job.model, "gemini-2.5-pro");
    assert_eq!(job.client, "vertex");
    assert_eq!(job.input.context["station"], "PS-100");
}

#[tokio::test]
async fn test_attachments_are_stored_and_classified() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    let runner = MockTestRunner::new(&results);
    let service = service_with(runner.clone(), &results);

    let request = GenerationRequest {
        prompt: "Was ist auf dem Bild?".to_string(),
        attachments: vec![
            Attachment::new("../leak.png", b"png-bytes".to_vec()),
            Attachment::new("manual.pdf", b"pdf-bytes".to_vec()),
            Attachment::new("alarm.WAV", b"wav-bytes".to_vec()),
        ],
        ..Default::default()
    };
    let output = service.process(request).await.unwrap();
    assert_eq!(output.result["input_type"], "audio");

    let job = &runner.jobs()[0];
    assert_eq!(job.input.kind, MediaKind::Audio);

    let image = job.input.image_path.as_ref().unwrap();
    assert_eq!(image.file_name().unwrap(), "leak.png");
    assert!(image.parent().unwrap().starts_with(std::env::temp_dir()));

    let audio = job.input.audio_path.as_ref().unwrap();
    assert_eq!(audio.file_name().unwrap(), "alarm.WAV");
    assert_eq!(job.input.attachments.len(), 1);
    assert_eq!(job.input.attachments[0].file_name().unwrap(), "manual.pdf");

    // The private job directory is gone once the request is done.
    assert!(!image.exists());
}

#[tokio::test]
async fn test_duplicate_attachment_names_do_not_clobber() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    let attachments = vec![
        Attachment::new("a.png", b"first".to_vec()),
        Attachment::new("sub/a.png", b"second".to_vec()),
        Attachment::new("", b"anon".to_vec()),
        Attachment::new("job.json", b"sneaky".to_vec()),
    ];
    let written = write_attachments(dir, &attachments, "job.json").await.unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.png", "1_a.png", "attachment_2", "3_job.json"]);
    assert_eq!(std::fs::read(dir.join("a.png")).unwrap(), b"first");
    assert_eq!(std::fs::read(dir.join("1_a.png")).unwrap(), b"second");
    assert!(!dir.join("job.json").exists());
}

#[tokio::test]
async fn test_empty_prompt_rejected() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    let runner = MockTestRunner::new(&results);
    let service = service_with(runner.clone(), &results);

    let err = service.process(GenerationRequest::new("   ")).await.unwrap_err();

    assert!(matches!(err, GenerationError::EmptyPrompt));
    assert!(runner.jobs().is_empty());
}

#[tokio::test]
async fn test_no_result_is_reported() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    let service = service_with(MockTestRunner::silent(&results), &results);

    let err = service
        .process(GenerationRequest::new("Hallo"))
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::NoResult { .. }));
}

#[tokio::test]
async fn test_runner_failure_is_propagated() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    let service = service_with(MockTestRunner::failing(&results), &results);

    let err = service
        .process(GenerationRequest::new("Hallo"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::Runner(RunnerError::Failed { .. })
    ));
}

#[tokio::test]
async fn test_concurrent_jobs_get_their_own_results() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    let service = Arc::new(GenerationService::new(
        Arc::new(MockTestRunner::new(&results)),
        &results,
        "gemini-2.5-flash",
        "gemini",
        2,
    ));

    let mut handles = Vec::new();
    for i in 0..6 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .process(GenerationRequest::new(format!("prompt {}", i)))
                .await
                .unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let output = handle.await.unwrap();
        assert_eq!(
            output.result["response"],
            format!("Mock response for: prompt {}", i)
        );
    }
}

#[tokio::test]
async fn test_silent_run_does_not_reuse_previous_result() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");

    let first = service_with(MockTestRunner::new(&results), &results);
    let request = GenerationRequest {
        test_id: Some("Q1_baseline".to_string()),
        ..GenerationRequest::new("first question")
    };
    first.process(request).await.unwrap();

    let second = service_with(MockTestRunner::silent(&results), &results);
    let request = GenerationRequest {
        test_id: Some("Q2_baseline".to_string()),
        ..GenerationRequest::new("second question")
    };
    let err = second.process(request).await.unwrap_err();

    match err {
        GenerationError::NoResult { test_id } => assert_eq!(test_id, "Q2_baseline"),
        other => panic!("expected NoResult, got {:?}", other),
    }
}

#[tokio::test]
async fn test_evaluation_comparison_is_never_a_result() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("results");
    std::fs::create_dir_all(&results).unwrap();
    std::fs::write(
        results.join("Q1_comparison.json"),
        r#"{"id": "Q1", "baseline_response": "x"}"#,
    )
    .unwrap();

    let service = service_with(MockTestRunner::silent(&results), &results);
    let request = GenerationRequest {
        test_id: Some("Q2_baseline".to_string()),
        ..GenerationRequest::new("Hallo")
    };
    let err = service.process(request).await.unwrap_err();

    assert!(matches!(err, GenerationError::NoResult { .. }));
}
