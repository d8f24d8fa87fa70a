//! # Role Matrix
//!
//! Every action against every role. A role outside an action's allowed set
//! must get an authorization error; a role inside it must never get one.

use custody_core::{Action, ComplaintNo, CustodyError, Email, ErrorKind, Role};
use custody_engine::{ComplaintDraft, ComplaintFilter, Credential, CustodyService, NewUser};

const ADMIN: &str = "admin@example.org";

struct Fixture {
    svc: CustodyService,
    admin: String,
    officer: String,
    examiner: String,
    counter: std::cell::Cell<u32>,
}

fn email(s: &str) -> Email {
    Email::new(s).unwrap()
}

fn draft(no: &str) -> ComplaintDraft {
    ComplaintDraft {
        complaint_no: no.into(),
        title: "Broken window".into(),
        date: "2024-03-02".into(),
        place: "Mill Lane".into(),
        category: "Vandalism".into(),
        complaint_details: "Shop window smashed overnight.".into(),
        ..ComplaintDraft::default()
    }
}

impl Fixture {
    fn new() -> Self {
        let svc = CustodyService::in_memory();
        svc.bootstrap_admin(email(ADMIN), Credential::new("root").unwrap())
            .unwrap();
        let admin = svc.login(&email(ADMIN), "root", Role::Admin).unwrap();
        let admin = admin.token().to_string();
        let mut fixture = Self {
            svc,
            admin,
            officer: String::new(),
            examiner: String::new(),
            counter: std::cell::Cell::new(0),
        };
        fixture.officer = fixture.staff(Role::Officer);
        fixture.examiner = fixture.staff(Role::Examiner);
        fixture
    }

    fn next(&self) -> u32 {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        n
    }

    /// Create an account in `role` and return a live token for it.
    fn staff(&self, role: Role) -> String {
        if role == Role::Admin {
            return self.admin.clone();
        }
        let addr = format!("{}-{}@example.org", role.as_str(), self.next());
        self.svc
            .create_user(
                &self.admin,
                NewUser {
                    email: email(&addr),
                    role,
                    credential: Credential::new("pw").unwrap(),
                    active: true,
                },
            )
            .unwrap();
        self.svc
            .login(&email(&addr), "pw", role)
            .unwrap()
            .token()
            .to_string()
    }

    fn submitted(&self) -> ComplaintNo {
        let no = format!("CMP-M{:03}", self.next());
        self.svc.submit(&self.officer, draft(&no)).unwrap();
        ComplaintNo::new(no).unwrap()
    }

    fn examined(&self) -> ComplaintNo {
        let no = self.submitted();
        self.svc
            .add_inference(&self.examiner, &no, "Consistent with statement.", None)
            .unwrap();
        no
    }

    /// Attempt `action` as the holder of `token`, with every precondition
    /// other than the role satisfied.
    fn attempt(&self, token: &str, action: Action) -> Result<(), CustodyError> {
        match action {
            Action::CreateUser => {
                let addr = format!("fresh-{}@example.org", self.next());
                self.svc
                    .create_user(
                        token,
                        NewUser {
                            email: email(&addr),
                            role: Role::Officer,
                            credential: Credential::new("pw").unwrap(),
                            active: true,
                        },
                    )
                    .map(|_| ())
            }
            Action::SetUserStatus => {
                // Reactivating an active account is a no-op for the target.
                let target = self.svc.gate().session(&self.officer).unwrap();
                self.svc
                    .set_user_status(token, target.email(), true)
                    .map(|_| ())
            }
            Action::CreateComplaint => {
                let no = format!("CMP-N{:03}", self.next());
                self.svc.submit(token, draft(&no)).map(|_| ())
            }
            Action::ListComplaints => self.svc.list(token, &ComplaintFilter::default()).map(|_| ()),
            Action::ViewComplaint => {
                let no = self.submitted();
                self.svc.get(token, &no).map(|_| ())
            }
            Action::AddInference => {
                let no = self.submitted();
                self.svc
                    .add_inference(token, &no, "Finding.", None)
                    .map(|_| ())
            }
            Action::GenerateReport => {
                let no = self.examined();
                self.svc.generate_report(token, &no, None).map(|_| ())
            }
            Action::ViewAuditLog => self.svc.query_audit(token, None).map(|_| ()),
        }
    }
}

#[test]
fn every_action_against_every_role() {
    let fx = Fixture::new();
    for role in Role::ALL {
        let token = fx.staff(role);
        for action in Action::ALL {
            let result = fx.attempt(&token, action);
            if action.permits(role) {
                assert!(
                    result.is_ok(),
                    "{role} should be able to {action}: {:?}",
                    result.err()
                );
            } else {
                let err = result.expect_err("denied role succeeded");
                assert_eq!(err.kind(), ErrorKind::Authorization, "{role} / {action}: {err}");
            }
        }
    }
}

#[test]
fn denied_attempts_leave_no_audit_trace() {
    let fx = Fixture::new();
    let before = fx.svc.audit_log().len();
    let head = fx.staff(Role::HeadInvestigator);

    let no = ComplaintNo::new("CMP-DENY").unwrap();
    let err = fx.svc.submit(&head, draft("CMP-DENY")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(fx.svc.get(&fx.officer, &no).is_err());
    assert_eq!(fx.svc.audit_log().len(), before);
}

#[test]
fn unknown_token_is_unauthenticated_for_every_action() {
    let fx = Fixture::new();
    for action in Action::ALL {
        let err = fx.attempt("not-a-token", action).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication, "{action}");
    }
}

#[test]
fn deactivation_applies_to_live_sessions() {
    let fx = Fixture::new();
    let second = fx.staff(Role::Officer);
    let officer = fx.svc.gate().session(&second).unwrap();
    fx.svc
        .set_user_status(&fx.admin, officer.email(), false)
        .unwrap();

    for action in Action::ALL.into_iter().filter(|a| a.permits(Role::Officer)) {
        let err = fx.attempt(&second, action).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication, "{action}");
    }
}
