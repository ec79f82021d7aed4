//! Integration tests for the flatconv command line

#[cfg(test)]
mod cli_tests {
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use std::process::{Command, Stdio};
    use tempfile::{tempdir, TempDir};

    const SCHEMA: &str = r#"{
      "records": [
        {
          "name": "EMP",
          "identity": [{ "type": "literal", "start": 0, "values": ["E"] }],
          "fields": [
            { "name": "type", "extract": { "start": 0, "length": 1 }, "binding": { "literal": "E" } },
            { "name": "name", "extract": { "start": 1, "length": 10 } },
            {
              "name": "salary",
              "extract": { "start": 11, "length": 8 },
              "converter": "decimal",
              "options": { "decimal-places": "2", "justify": "right", "pad-character": "0" }
            }
          ],
          "segments": [
            {
              "property": "skills",
              "record": {
                "name": "SKILL",
                "identity": [{ "type": "literal", "start": 0, "values": ["S"] }],
                "fields": [
                  { "name": "type", "extract": { "start": 0, "length": 1 }, "binding": { "literal": "S" } },
                  { "name": "skill", "extract": { "start": 1, "length": 8 } }
                ]
              }
            }
          ]
        }
      ]
    }"#;

    const INPUT: &str = "EJane Doe  01234.50\nSrust    \nSsql     \nEBo        00100.00\n";

    struct Output {
        stdout: String,
        stderr: String,
        success: bool,
    }

    fn run_flatconv(args: &[&str], stdin: Option<&str>) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_flatconv"))
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to run flatconv");

        {
            let mut pipe = child.stdin.take().unwrap();
            if let Some(text) = stdin {
                pipe.write_all(text.as_bytes()).unwrap();
            }
        }

        let output = child.wait_with_output().unwrap();
        Output {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        }
    }

    fn workspace(input: &str) -> (TempDir, String, String) {
        let dir = tempdir().unwrap();
        let schema = dir.path().join("schema.json");
        fs::write(&schema, SCHEMA).unwrap();
        let data = dir.path().join("input.txt");
        fs::write(&data, input).unwrap();
        let schema = path_str(&schema);
        let data = path_str(&data);
        (dir, schema, data)
    }

    fn path_str(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_parse_prints_one_json_object_per_record() {
        let (_dir, schema, input) = workspace(INPUT);
        let out = run_flatconv(&["parse", "--schema", &schema, &input], None);

        assert!(out.success, "parse failed: {}", out.stderr);
        let lines: Vec<serde_json::Value> = out
            .stdout
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["record"], "EMP");
        assert_eq!(lines[0]["fields"]["name"], "Jane Doe");
        assert_eq!(lines[0]["fields"]["salary"], 1234.5);
        assert_eq!(lines[0]["children"]["skills"][1]["fields"]["skill"], "sql");
        assert_eq!(lines[1]["fields"]["name"], "Bo");
        assert!(lines[1].get("children").is_none());
    }

    #[test]
    fn test_parse_stdin_to_output_file() {
        let (dir, schema, _) = workspace(INPUT);
        let output = dir.path().join("out").join("records.jsonl");
        let out = run_flatconv(
            &["parse", "--schema", &schema, "--stdin", "-o", &path_str(&output), "--stats"],
            Some(INPUT),
        );

        assert!(out.success, "parse failed: {}", out.stderr);
        assert!(out.stdout.is_empty());
        assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 2);
        assert!(out.stderr.contains("Records parsed: 2"));
        assert!(out.stderr.contains("Lines read: 4"));
    }

    #[test]
    fn test_unmatched_line_fails_unless_lenient() {
        let (_dir, schema, input) = workspace("EJane Doe  01234.50\nXunknown\nEBo        00100.00\n");

        let strict = run_flatconv(&["parse", "--schema", &schema, &input], None);
        assert!(!strict.success);
        assert!(strict.stderr.contains("Line 2 does not match any record definition"));
        assert!(strict.stderr.contains("--lenient"));

        let lenient = run_flatconv(&["parse", "--schema", &schema, &input, "--lenient"], None);
        assert!(lenient.success, "lenient parse failed: {}", lenient.stderr);
        assert_eq!(lenient.stdout.lines().count(), 2);
        assert!(lenient.stderr.contains("Skipped unmatched line 2"));
    }

    #[test]
    fn test_continue_on_error_reports_failures() {
        let (_dir, schema, input) = workspace("EJane\nEBo        00100.00\n");

        let stopped = run_flatconv(&["parse", "--schema", &schema, &input], None);
        assert!(!stopped.success);
        assert!(stopped.stdout.is_empty());

        let resumed = run_flatconv(&["parse", "--schema", &schema, &input, "--continue-on-error"], None);
        assert!(!resumed.success);
        assert_eq!(resumed.stdout.lines().count(), 1);
        assert!(resumed.stderr.contains("Line too short"));
        assert!(resumed.stderr.contains("1 records failed to parse"));
    }

    #[test]
    fn test_field_errors_are_warnings() {
        let (_dir, schema, input) = workspace("EJane Doe  0abc4.50\n");
        let out = run_flatconv(&["parse", "--schema", &schema, &input], None);

        assert!(out.success, "parse failed: {}", out.stderr);
        assert!(out.stderr.contains("⚠"));
        assert!(out.stderr.contains("salary"));
        let record: serde_json::Value = serde_json::from_str(out.stdout.trim()).unwrap();
        assert!(record["fields"].get("salary").is_none());
    }

    #[test]
    fn test_format_json_records_to_lines() {
        let (dir, schema, _) = workspace(INPUT);
        let json = dir.path().join("records.jsonl");
        fs::write(
            &json,
            concat!(
                r#"{"record":"EMP","fields":{"name":"Jane Doe","salary":1234.5},"children":{"skills":[{"record":"SKILL","fields":{"skill":"rust"}}]}}"#,
                "\n",
                r#"{"record":"EMP","fields":{"name":"Bo","salary":100}}"#,
                "\n"
            ),
        )
        .unwrap();

        let out = run_flatconv(&["format", "--schema", &schema, &path_str(&json)], None);
        assert!(out.success, "format failed: {}", out.stderr);
        assert_eq!(out.stdout, "EJane Doe  01234.50\nSrust    \nEBo        00100.00\n");
    }

    #[test]
    fn test_parse_then_format_reproduces_input() {
        let (_dir, schema, input) = workspace(INPUT);
        let parsed = run_flatconv(&["parse", "--schema", &schema, &input], None);
        assert!(parsed.success, "parse failed: {}", parsed.stderr);

        let formatted = run_flatconv(
            &["format", "--schema", &schema, "--stdin", "--crlf"],
            Some(parsed.stdout.as_str()),
        );
        assert!(formatted.success, "format failed: {}", formatted.stderr);
        assert_eq!(formatted.stdout, INPUT.replace('\n', "\r\n"));
    }

    #[test]
    fn test_latin1_input_and_output() {
        let (dir, schema, _) = workspace(INPUT);
        let latin1: &[u8] = b"EZ\xfcrich    00100.00\n";
        let data = dir.path().join("latin1.txt");
        fs::write(&data, latin1).unwrap();

        let parsed = run_flatconv(
            &["parse", "--schema", &schema, &path_str(&data), "--encoding", "ISO-8859-1"],
            None,
        );
        assert!(parsed.success, "parse failed: {}", parsed.stderr);
        let record: serde_json::Value = serde_json::from_str(parsed.stdout.trim()).unwrap();
        assert_eq!(record["fields"]["name"], "Zürich");

        let output = dir.path().join("latin1.out");
        let formatted = run_flatconv(
            &[
                "format",
                "--schema",
                &schema,
                "--stdin",
                "--encoding",
                "ISO-8859-1",
                "-o",
                &path_str(&output),
            ],
            Some(parsed.stdout.as_str()),
        );
        assert!(formatted.success, "format failed: {}", formatted.stderr);
        assert_eq!(fs::read(&output).unwrap(), latin1.to_vec());
    }

    #[test]
    fn test_unknown_encoding_fails() {
        let (_dir, schema, input) = workspace(INPUT);
        let out = run_flatconv(&["parse", "--schema", &schema, &input, "--encoding", "klingon"], None);
        assert!(!out.success);
        assert!(out.stderr.contains("Unknown character encoding 'klingon'"));
    }

    #[test]
    fn test_format_unknown_record_fails() {
        let (_dir, schema, _) = workspace(INPUT);
        let out = run_flatconv(
            &["format", "--schema", &schema, "--stdin"],
            Some("{\"record\":\"NOPE\",\"fields\":{}}\n"),
        );
        assert!(!out.success);
        assert!(out.stderr.contains("Unknown record definition 'NOPE'"));
    }

    #[test]
    fn test_validate_schema() {
        let (dir, schema, _) = workspace(INPUT);
        let out = run_flatconv(&["validate", "--schema", &schema], None);
        assert!(out.success, "validate failed: {}", out.stderr);
        assert!(out.stderr.contains("✓ Schema is valid: 1 top-level record definitions"));

        let bad = dir.path().join("bad.json");
        fs::write(
            &bad,
            r#"{"records": [{"name": "A", "fields": [{"name": "x", "extract": {"start": 0, "length": 2}, "converter": "packed"}]}]}"#,
        )
        .unwrap();
        let out = run_flatconv(&["validate", "--schema", &path_str(&bad)], None);
        assert!(!out.success);
        assert!(out.stderr.contains("unknown converter 'packed'"));
        assert!(out.stderr.contains("Try 'flatconv --help'"));
    }

    #[test]
    fn test_missing_input() {
        let (_dir, schema, _) = workspace(INPUT);
        let out = run_flatconv(&["parse", "--schema", &schema], None);
        assert!(!out.success);
        assert!(out.stderr.contains("No input provided"));
    }
}
