use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_portald");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn portald");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn faculty_roster() -> serde_json::Value {
    json!([
        { "id": "1", "name": "Alex Student", "section": "A", "course": "Computer Science",
          "attendance": 92, "avgScore": 88, "performance": "Strong" },
        { "id": "2", "name": "John Doe", "section": "A", "course": "Computer Science",
          "attendance": 75, "avgScore": 62, "performance": "Average" },
        { "id": "3", "name": "Jane Smith", "section": "A", "course": "Computer Science",
          "attendance": 45, "avgScore": 35, "performance": "Weak" },
        { "id": "4", "name": "Mike Johnson", "section": "B", "course": "Information Tech",
          "attendance": 88, "avgScore": 79, "performance": "Average" },
        { "id": "5", "name": "Sarah Connor", "section": "A", "course": "Computer Science",
          "attendance": 98, "avgScore": 95, "performance": "Strong" }
    ])
}

#[test]
fn filter_and_at_risk() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let strong = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "roster.filter",
        json!({ "students": faculty_roster(), "performance": "Strong" }),
    );
    let ids: Vec<&str> = strong["students"]
        .as_array()
        .expect("students")
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["1", "5"]);

    let risk = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.atRisk",
        json!({ "students": faculty_roster() }),
    );
    assert_eq!(risk["count"], json!(1));
    assert_eq!(risk["minAttendance"], json!(50));
    assert_eq!(risk["students"][0]["name"], json!("Jane Smith"));

    let stricter = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "roster.atRisk",
        json!({ "students": faculty_roster(), "minAttendance": 90 }),
    );
    assert_eq!(stricter["count"], json!(3));

    let bad = request(
        &mut stdin,
        &mut reader,
        "4",
        "roster.filter",
        json!({ "students": faculty_roster(), "performance": "Excellent" }),
    );
    assert_eq!(bad["error"]["code"], json!("bad_params"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn export_writes_dated_csv() {
    let out_dir = temp_dir("portald-roster-export");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let day_before = chrono::Utc::now().date_naive();

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "roster.exportCsv",
        json!({
            "students": faculty_roster(),
            "kind": "assigned",
            "performance": "Average",
            "outDir": out_dir.to_string_lossy()
        }),
    );
    assert_eq!(r["rowsExported"], json!(2));
    let file_name = r["fileName"].as_str().expect("fileName");
    // Dated by the UTC calendar day, whatever the local timezone.
    let day_after = chrono::Utc::now().date_naive();
    let expected: Vec<String> = [day_before, day_after]
        .iter()
        .map(|d| format!("assigned_students_report_{}.csv", d.format("%Y-%m-%d")))
        .collect();
    assert!(
        expected.iter().any(|e| e == file_name),
        "{} not in {:?}",
        file_name,
        expected
    );

    let path = PathBuf::from(r["path"].as_str().expect("path"));
    let content = std::fs::read_to_string(&path).expect("read export");
    assert_eq!(
        content,
        "Student ID,Name,Course,Status,Attendance\n\
         2,John Doe,Computer Science,Average,75%\n\
         4,Mike Johnson,Information Tech,Average,88%\n"
    );

    let bad_kind = request(
        &mut stdin,
        &mut reader,
        "2",
        "roster.exportCsv",
        json!({ "students": [], "kind": "pdf", "outDir": out_dir.to_string_lossy() }),
    );
    assert_eq!(bad_kind["error"]["code"], json!("bad_params"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(out_dir);
}
