//! # Journal Replay
//!
//! The durable journal written by the engine (directly and behind the HTTP
//! surface) must read back identical to the in-memory log and pass the CLI's
//! verification.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use custody_api::state::{AppConfig, AppState, BootstrapAdmin};
use custody_cli::journal::{run_journal_to, summarize, verify_entries, JournalArgs, JournalCommand};
use custody_core::{ComplaintNo, Email, ErrorKind, Role};
use custody_engine::{
    read_journal, AuditEntry, ComplaintDraft, Credential, CustodyService, FileJournal, NewUser,
    DEFAULT_SESSION_TTL_SECS,
};
use custody_state::ComplaintState;

fn email(s: &str) -> Email {
    Email::new(s).unwrap()
}

fn draft(no: &str) -> ComplaintDraft {
    ComplaintDraft {
        complaint_no: no.into(),
        title: "Missing parcel".into(),
        date: "2024-05-20".into(),
        place: "Sorting office".into(),
        category: "Theft".into(),
        severity: Some("Low".into()),
        complaint_details: "Parcel signed for but never delivered.".into(),
        evidence_details: None,
        evidence_refs: vec!["scan-17.pdf".into()],
    }
}

/// Tokens for officer, examiner, head investigator.
fn staff(svc: &CustodyService) -> (String, String, String) {
    svc.bootstrap_admin(email("admin@example.org"), Credential::new("root").unwrap())
        .unwrap();
    let admin = svc
        .login(&email("admin@example.org"), "root", Role::Admin)
        .unwrap()
        .token()
        .to_string();
    let mut tokens = Vec::new();
    for (addr, role) in [
        ("officer@example.org", Role::Officer),
        ("examiner@example.org", Role::Examiner),
        ("head@example.org", Role::HeadInvestigator),
    ] {
        svc.create_user(
            &admin,
            NewUser {
                email: email(addr),
                role,
                credential: Credential::new("pw").unwrap(),
                active: true,
            },
        )
        .unwrap();
        tokens.push(svc.login(&email(addr), "pw", role).unwrap().token().to_string());
    }
    let head = tokens.pop().unwrap();
    let examiner = tokens.pop().unwrap();
    let officer = tokens.pop().unwrap();
    (officer, examiner, head)
}

#[test]
fn file_journal_matches_memory_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let svc = CustodyService::new(
        Arc::new(FileJournal::open(&path).unwrap()),
        DEFAULT_SESSION_TTL_SECS,
    );
    let (officer, examiner, head) = staff(&svc);

    let a = ComplaintNo::new("CMP-101").unwrap();
    let b = ComplaintNo::new("CMP-102").unwrap();
    svc.submit(&officer, draft("CMP-101")).unwrap();
    svc.submit(&officer, draft("CMP-102")).unwrap();
    svc.add_inference(&examiner, &a, "Courier scan missing.", None)
        .unwrap();
    svc.generate_report(&head, &a, None).unwrap();
    // Rejected calls must not reach the journal.
    svc.generate_report(&head, &b, None).unwrap_err();
    svc.submit(&officer, draft("CMP-101")).unwrap_err();

    let memory: Vec<AuditEntry> = svc.query_audit(&officer, None).unwrap().collect();
    let disk = read_journal(&path).unwrap();
    assert_eq!(disk, memory);
    assert_eq!(disk.len(), 4);
    assert!(verify_entries(&disk).is_empty());

    let summary = summarize(&disk);
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].complaint_no, a);
    assert_eq!(summary[0].state, ComplaintState::Reported);
    assert_eq!(summary[0].entries, 3);
    assert_eq!(summary[1].complaint_no, b);
    assert_eq!(summary[1].state, ComplaintState::Submitted);
}

#[test]
fn concurrent_inferences_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let svc = CustodyService::new(
        Arc::new(FileJournal::open(&path).unwrap()),
        DEFAULT_SESSION_TTL_SECS,
    );
    let (officer, examiner, _) = staff(&svc);
    let no = ComplaintNo::new("CMP-200").unwrap();
    svc.submit(&officer, draft("CMP-200")).unwrap();

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let (svc, examiner, no) = (&svc, &examiner, &no);
                s.spawn(move || svc.add_inference(examiner, no, &format!("Finding {i}"), None))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let (won, lost): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    assert_eq!(won.len(), 1);
    for err in lost.into_iter().map(Result::unwrap_err) {
        assert_eq!(err.kind(), ErrorKind::State);
    }

    let disk = read_journal(&path).unwrap();
    assert_eq!(disk.len(), 2);
    assert!(verify_entries(&disk).is_empty());
    let complaint = svc.get(&officer, &no).unwrap();
    assert_eq!(complaint.transitions().len(), 1);
}

#[test]
fn concurrent_submissions_get_gap_free_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let svc = CustodyService::new(
        Arc::new(FileJournal::open(&path).unwrap()),
        DEFAULT_SESSION_TTL_SECS,
    );
    let (officer, _, _) = staff(&svc);

    std::thread::scope(|s| {
        for t in 0..4 {
            let (svc, officer) = (&svc, &officer);
            s.spawn(move || {
                for i in 0..10 {
                    svc.submit(officer, draft(&format!("CMP-T{t}-{i}"))).unwrap();
                }
            });
        }
    });

    let disk = read_journal(&path).unwrap();
    assert_eq!(disk.len(), 40);
    let sequences: Vec<u64> = disk.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=40).collect::<Vec<_>>());
    assert!(verify_entries(&disk).is_empty());
}

#[test]
fn restart_resumes_sequence_and_retires_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let no = ComplaintNo::new("CMP-001").unwrap();
    {
        let svc = CustodyService::new(
            Arc::new(FileJournal::open(&path).unwrap()),
            DEFAULT_SESSION_TTL_SECS,
        );
        let (officer, examiner, _) = staff(&svc);
        svc.submit(&officer, draft("CMP-001")).unwrap();
        svc.add_inference(&examiner, &no, "Courier scan missing.", None)
            .unwrap();
    }

    let history = read_journal(&path).unwrap();
    let svc = CustodyService::from_history(
        Arc::new(FileJournal::open(&path).unwrap()),
        history,
        DEFAULT_SESSION_TTL_SECS,
    )
    .unwrap();
    let (officer, _, _) = staff(&svc);

    let err = svc.submit(&officer, draft("CMP-001")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    svc.submit(&officer, draft("CMP-002")).unwrap();

    // The old trail is still queryable after the restart.
    assert_eq!(svc.query_audit(&officer, Some(&no)).unwrap().count(), 2);

    let disk = read_journal(&path).unwrap();
    let sequences: Vec<u64> = disk.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, [1, 2, 3]);
    assert!(verify_entries(&disk).is_empty());
    assert_eq!(disk, svc.query_audit(&officer, None).unwrap().collect::<Vec<_>>());
}

// ── HTTP surface ─────────────────────────────────────────────────────

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(app: &Router, addr: &str, credential: &str, role: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/v1/sessions",
        None,
        json!({ "email": addr, "credential": credential, "role": role }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn http_walkthrough_leaves_a_verifiable_journal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let config = AppConfig {
        audit_journal_path: Some(path.clone()),
        bootstrap_admin: Some(BootstrapAdmin {
            email: email("admin@example.org"),
            credential: "root".into(),
        }),
        ..AppConfig::default()
    };
    let app = custody_api::app(AppState::from_config(config).unwrap());

    let admin = login(&app, "admin@example.org", "root", "admin").await;
    for (addr, role) in [
        ("officer@example.org", "officer"),
        ("examiner@example.org", "examiner"),
    ] {
        let (status, _) = send(
            &app,
            "POST",
            "/v1/users",
            Some(&admin),
            json!({ "email": addr, "role": role, "credential": "pw" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let officer = login(&app, "officer@example.org", "pw", "officer").await;
    let examiner = login(&app, "examiner@example.org", "pw", "examiner").await;

    let (status, _) = send(
        &app,
        "POST",
        "/v1/complaints",
        Some(&officer),
        json!({
            "complaint_no": "CMP-300",
            "title": "Forged cheque",
            "date": "2024-07-01",
            "place": "High Street branch",
            "category": "Fraud",
            "complaint_details": "Cheque cashed with a copied signature."
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/complaints/CMP-300/inference",
        Some(&examiner),
        json!({ "inference": "Signature does not match the specimen." }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/complaints/CMP-300/report",
        Some(&examiner),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["body"].as_str().unwrap().contains("Signature does not match"));

    let args = JournalArgs {
        command: JournalCommand::Verify { path: path.clone() },
    };
    let mut out = Vec::new();
    assert_eq!(run_journal_to(&args, &mut out).unwrap(), 0);
    assert!(String::from_utf8(out).unwrap().starts_with("ok: 3 entries"));

    let actions: Vec<String> = read_journal(&path)
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, ["created", "inference added", "report generated"]);
}

#[tokio::test]
async fn http_restart_keeps_complaint_numbers_taken() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let config = AppConfig {
        audit_journal_path: Some(path.clone()),
        bootstrap_admin: Some(BootstrapAdmin {
            email: email("admin@example.org"),
            credential: "root".into(),
        }),
        ..AppConfig::default()
    };
    let filing = json!({
        "complaint_no": "CMP-400",
        "title": "Stolen van",
        "date": "2024-08-09",
        "place": "Yard 4",
        "category": "Theft",
        "complaint_details": "Van taken from the yard overnight."
    });

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        // Each pass is a fresh process over the same journal.
        let app = custody_api::app(AppState::from_config(config.clone()).unwrap());
        let admin = login(&app, "admin@example.org", "root", "admin").await;
        let (status, _) = send(
            &app,
            "POST",
            "/v1/users",
            Some(&admin),
            json!({ "email": "officer@example.org", "role": "officer", "credential": "pw" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let officer = login(&app, "officer@example.org", "pw", "officer").await;

        let (status, body) = send(&app, "POST", "/v1/complaints", Some(&officer), filing.clone()).await;
        assert_eq!(status, expected, "{body}");
    }

    let entries = read_journal(&path).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(verify_entries(&entries).is_empty());
}
