//! Integration tests for the p4m CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn p4m() -> Command {
    let mut cmd = cargo_bin_cmd!("p4m");
    for var in [
        "P4M_API_HOST",
        "P4M_API_VERSION",
        "P4M_CLIENT_ID",
        "P4M_CLIENT_SECRET",
        "P4M_TOKEN_REFRESH_OFFSET_MS",
        "P4M_PASSWORD",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod cli_basics {
    use super::*;

    #[test]
    fn help_lists_subcommands() {
        p4m()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("validate"))
            .stdout(predicate::str::contains("signin"))
            .stdout(predicate::str::contains("forms"));
    }

    #[test]
    fn version_flag() {
        p4m().arg("--version").assert().success();
    }

    #[test]
    fn unknown_command_fails() {
        p4m().arg("deploy").assert().failure();
    }
}

mod validate {
    use super::*;

    #[test]
    fn valid_reset_password_data_passes() {
        let dir = create_temp_project();
        let data = write(
            &dir,
            "reset.json",
            r#"{"password": "s3cret", "passwordConfirmation": "s3cret"}"#,
        );
        p4m()
            .current_dir(dir.path())
            .args(["validate", "--form", "reset-password"])
            .arg(&data)
            .assert()
            .success()
            .stdout(predicate::str::contains("resetPassword is valid"));
    }

    #[test]
    fn mismatched_confirmation_fails_with_message() {
        let dir = create_temp_project();
        let data = write(
            &dir,
            "reset.json",
            r#"{"password": "s3cret", "passwordConfirmation": "other"}"#,
        );
        p4m()
            .current_dir(dir.path())
            .args(["validate", "--form", "reset-password"])
            .arg(&data)
            .assert()
            .failure()
            .stdout(predicate::str::contains("passwordConfirmation"))
            .stdout(predicate::str::contains("Must match password"))
            .stderr(predicate::str::contains("1 rule(s) failed"));
    }

    #[test]
    fn issue_end_date_before_start_date_fails() {
        let dir = create_temp_project();
        let data = write(
            &dir,
            "issue.toml",
            r#"
subject = "Broken build"
typeId = "1"
assignee = "7"
owner = "7"
statusId = "2"
priority = "high"
startDate = "2024-05-10"
endDate = "2024-05-01"
"#,
        );
        p4m()
            .current_dir(dir.path())
            .args(["validate", "--form", "issue"])
            .arg(&data)
            .assert()
            .failure()
            .stdout(predicate::str::contains("End date must be later than the start date"));
    }

    #[test]
    fn custom_metadata_file_is_compiled() {
        let dir = create_temp_project();
        let metadata = write(
            &dir,
            "signup.json",
            r#"{"sections": [{"name": "signup", "fields": [
                {"name": "email", "validations": {"default": {"rules": [
                    {"name": "required"}, {"name": "email"}
                ]}}}
            ]}]}"#,
        );
        let data = write(&dir, "user.json", r#"{"email": "not-an-address"}"#);
        p4m()
            .current_dir(dir.path())
            .arg("validate")
            .arg(&data)
            .arg("--metadata")
            .arg(&metadata)
            .assert()
            .failure()
            .stdout(predicate::str::contains("valid email address"));
    }

    #[test]
    fn unknown_predicate_is_a_compile_error() {
        let dir = create_temp_project();
        let metadata = write(
            &dir,
            "bad.json",
            r#"{"sections": [{"name": "s", "fields": [
                {"name": "due", "validations": {"default": {"rules": [
                    {"name": "test", "value": ["t", "msg", "noSuchPredicate"]}
                ]}}}
            ]}]}"#,
        );
        let data = write(&dir, "data.json", r#"{"due": "2024-01-01"}"#);
        p4m()
            .current_dir(dir.path())
            .arg("validate")
            .arg(&data)
            .arg("--metadata")
            .arg(&metadata)
            .assert()
            .failure()
            .stderr(predicate::str::contains("does not compile"));
    }

    #[test]
    fn data_must_be_an_object() {
        let dir = create_temp_project();
        let data = write(&dir, "data.json", "[1, 2]");
        p4m()
            .current_dir(dir.path())
            .args(["validate", "--form", "wiki"])
            .arg(&data)
            .assert()
            .failure()
            .stderr(predicate::str::contains("must hold an object"));
    }
}

mod forms {
    use super::*;

    #[test]
    fn list_shows_every_form() {
        p4m()
            .args(["forms", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("projectCreate"))
            .stdout(predicate::str::contains("issueCreate"))
            .stdout(predicate::str::contains("wikiCreate"))
            .stdout(predicate::str::contains("resetPassword"));
    }

    #[test]
    fn show_prints_metadata_json() {
        p4m()
            .args(["forms", "show", "issue"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dateAfter:startDate"));
    }

    #[test]
    fn dry_run_submit_derives_short_code_and_navigates() {
        let dir = create_temp_project();
        let data = write(&dir, "project.json", r#"{"name": "Apollo 11", "type": "kanban"}"#);
        p4m()
            .current_dir(dir.path())
            .args(["forms", "submit", "project"])
            .arg(&data)
            .args(["--dry-run", "--issue-type", "Bug"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""shortCode": "APOLL""#))
            .stdout(predicate::str::contains("app.project (project_id=APOLL)"));
    }

    #[test]
    fn dry_run_submit_of_invalid_project_fails() {
        let dir = create_temp_project();
        let data = write(&dir, "project.json", r#"{"name": "Apollo"}"#);
        p4m()
            .current_dir(dir.path())
            .args(["forms", "submit", "project"])
            .arg(&data)
            .arg("--dry-run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("rule(s) failed"));
    }

    #[test]
    fn submit_without_session_asks_to_sign_in() {
        let dir = create_temp_project();
        let data = write(&dir, "wiki.json", r#"{"name": "Home", "markUp": "x"}"#);
        p4m()
            .current_dir(dir.path())
            .args(["forms", "submit", "wiki"])
            .arg(&data)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not signed in"));
    }
}

mod milestone {
    use super::*;

    #[test]
    fn overdue_milestone_uses_overdue_layout() {
        p4m()
            .args([
                "milestone",
                "--status",
                "in_progress",
                "--end-date",
                "2024-01-01",
                "--issue",
                "done",
                "--issue",
                "new",
                "--today",
                "2024-02-01",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("overdue"))
            .stdout(predicate::str::contains("50%"))
            .stdout(predicate::str::contains("components/milestone-blocks/overdue"));
    }

    #[test]
    fn unknown_status_uses_index_layout() {
        p4m()
            .args(["milestone", "--status", "archived", "--today", "2024-02-01"])
            .assert()
            .success()
            .stdout(predicate::str::contains("components/milestone-blocks/index"));
    }
}

mod config {
    use super::*;

    #[test]
    fn init_creates_client_toml() {
        let dir = create_temp_project();
        p4m()
            .current_dir(dir.path())
            .args(["--project-dir", "."])
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));
        assert!(dir.path().join(".p4m/client.toml").exists());

        p4m()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn show_reports_project_file_values() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".p4m")).unwrap();
        fs::write(
            dir.path().join(".p4m/client.toml"),
            "[api]\nhost = \"https://tracker.example.com\"\nclient_id = \"web\"\n",
        )
        .unwrap();
        p4m()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://tracker.example.com"))
            .stdout(predicate::str::contains("client_secret = (unset)"));
    }

    #[test]
    fn validate_reports_warnings() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".p4m")).unwrap();
        fs::write(
            dir.path().join(".p4m/client.toml"),
            "[api]\nhost = \"tracker.example.com\"\n",
        )
        .unwrap();
        p4m()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("api.host"));
    }

    #[test]
    fn env_override_is_shown() {
        let dir = create_temp_project();
        p4m()
            .current_dir(dir.path())
            .env("P4M_API_HOST", "https://env.example.com")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://env.example.com"));
    }
}
