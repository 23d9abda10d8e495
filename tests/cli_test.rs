//! CLI integration tests for the apidoc-compose binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("apidoc-compose"))
}

fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// a.yaml referencing b.yaml, plus a versioned c.yaml.
fn fixtures() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_temp_file(
        &dir,
        "a.yaml",
        r#"swagger: "2.0"
definitions:
  Widget:
    properties:
      gadget:
        $ref: b.yaml#/definitions/Gadget
"#,
    );
    write_temp_file(
        &dir,
        "b.yaml",
        "definitions:\n  Gadget:\n    type: object\n",
    );
    write_temp_file(
        &dir,
        "c.yaml",
        r##"swagger: "2.0"
info:
  title: C
  version: "2.0"
paths:
  /c:
    get:
      parameters:
        - $ref: "#/parameters/ApiVersion"
parameters:
  ApiVersion:
    name: api-version
    in: query
    type: string
"##,
    );
    dir
}

mod resolve_command {
    use super::*;

    #[test]
    fn inlines_external_entity() {
        let dir = fixtures();
        cmd()
            .args(["resolve", dir.path().join("a.yaml").to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r##""$ref":"#/definitions/Gadget""##))
            .stdout(predicate::str::contains(r#""Gadget":{"type":"object"}"#));
    }

    #[test]
    fn yaml_output() {
        let dir = fixtures();
        cmd()
            .args([
                "resolve",
                dir.path().join("a.yaml").to_str().unwrap(),
                "--format",
                "yaml",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Gadget:\n"));
    }

    #[test]
    fn pretty_output() {
        let dir = fixtures();
        cmd()
            .args([
                "resolve",
                dir.path().join("a.yaml").to_str().unwrap(),
                "--pretty",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn output_file() {
        let dir = fixtures();
        let output = dir.path().join("resolved.json");
        cmd()
            .args([
                "resolve",
                dir.path().join("a.yaml").to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["definitions"]["Gadget"]["type"], "object");
    }

    #[test]
    fn single_verbose_flag_logs_debug_events() {
        let dir = fixtures();
        cmd()
            .env_remove("RUST_LOG")
            .args(["resolve", dir.path().join("a.yaml").to_str().unwrap(), "-v"])
            .assert()
            .success()
            .stderr(predicate::str::contains("inlining entity"));
    }

    #[test]
    fn quiet_by_default() {
        let dir = fixtures();
        cmd()
            .env_remove("RUST_LOG")
            .args(["resolve", dir.path().join("a.yaml").to_str().unwrap()])
            .assert()
            .success()
            .stderr(predicate::str::contains("inlining entity").not());
    }

    #[test]
    fn missing_file_exits_3() {
        let dir = TempDir::new().unwrap();
        cmd()
            .args(["resolve", dir.path().join("nope.yaml").to_str().unwrap()])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn unresolved_reference_exits_2() {
        let dir = TempDir::new().unwrap();
        let input = write_temp_file(
            &dir,
            "a.yaml",
            "definitions:\n  Widget:\n    $ref: '#/definitions/Missing'\n",
        );
        cmd()
            .args(["resolve", input.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unresolved reference"));
    }
}

mod compose_command {
    use super::*;

    #[test]
    fn pins_api_version() {
        let dir = fixtures();
        cmd()
            .args(["compose", dir.path().join("c.yaml").to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""enum":["2.0"]"#));
    }

    #[test]
    fn no_azure_keeps_references() {
        let dir = fixtures();
        cmd()
            .args([
                "compose",
                dir.path().join("c.yaml").to_str().unwrap(),
                "--no-azure",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r##""$ref":"#/parameters/ApiVersion""##));
    }

    #[test]
    fn title_overrides_info() {
        let dir = fixtures();
        cmd()
            .args([
                "compose",
                dir.path().join("a.yaml").to_str().unwrap(),
                dir.path().join("c.yaml").to_str().unwrap(),
                "--title",
                "Everything",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""info":{"title":"Everything"}"#));
    }

    #[test]
    fn merge_conflict_exits_2() {
        let dir = TempDir::new().unwrap();
        let a = write_temp_file(&dir, "a.yaml", "definitions:\n  W:\n    type: object\n");
        let b = write_temp_file(&dir, "b.yaml", "definitions:\n  W:\n    type: string\n");
        cmd()
            .args(["compose", a.to_str().unwrap(), b.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("incompatible values"));
    }

    #[test]
    fn requires_inputs() {
        cmd().args(["compose"]).assert().failure();
    }
}

mod trace_command {
    use super::*;

    #[test]
    fn prints_original_location() {
        let dir = fixtures();
        cmd()
            .args([
                "trace",
                dir.path().join("a.yaml").to_str().unwrap(),
                "--pointer",
                "/definitions/Gadget/type",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("b.yaml:3:"));
    }

    #[test]
    fn json_locations() {
        let dir = fixtures();
        cmd()
            .args([
                "trace",
                dir.path().join("c.yaml").to_str().unwrap(),
                "--pointer",
                "/paths/~1c/get/parameters/0/enum/0",
                "--json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""version""#))
            .stdout(predicate::str::contains(r#""line": 4"#));
    }

    #[test]
    fn unknown_pointer_exits_2() {
        let dir = fixtures();
        cmd()
            .args([
                "trace",
                dir.path().join("a.yaml").to_str().unwrap(),
                "--pointer",
                "/definitions/Nothing",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("not found in composed document"));
    }
}

mod run_command {
    use super::*;

    #[test]
    fn runs_markdown_configuration() {
        let dir = fixtures();
        let config = write_temp_file(
            &dir,
            "readme.md",
            "# Service\n\n```yaml\ninput-file:\n  - a.yaml\n  - c.yaml\noverride-info:\n  title: Service\n```\n",
        );
        cmd()
            .args(["run", config.to_str().unwrap(), "--format", "yaml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("title: Service"))
            .stdout(predicate::str::contains("Gadget:"));
    }

    #[test]
    fn configuration_without_inputs_exits_2() {
        let dir = TempDir::new().unwrap();
        let config = write_temp_file(&dir, "config.yaml", "azure-arm: true\n");
        cmd()
            .args(["run", config.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("names no input files"));
    }
}
