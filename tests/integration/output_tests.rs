use dupehunter::duplicates::{scan, ScanConfig};
use dupehunter::output::{emit_report, write_report, CsvOutput, JsonOutput, OutputFormat};
use std::fs;
use tempfile::tempdir;

fn sample_tree() -> (tempfile::TempDir, dupehunter::duplicates::ScanResult) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"same content").unwrap();
    fs::write(dir.path().join("b.txt"), b"same content").unwrap();
    fs::write(dir.path().join("c.txt"), b"different content").unwrap();
    let result = scan(dir.path(), ScanConfig::default().with_min_size(1)).unwrap();
    (dir, result)
}

#[test]
fn test_json_report_matches_result() {
    let (_dir, result) = sample_tree();

    let json: serde_json::Value =
        serde_json::from_str(&JsonOutput::new(&result).to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["status"], "completed");
    assert_eq!(json["algorithm"], "md5");
    assert_eq!(json["summary"]["total_files"], 3);
    assert_eq!(json["summary"]["duplicate_groups"], 1);
    let group = &json["duplicates"][0];
    // md5("same content")
    assert_eq!(group["hash"], "793953ee398d864ec40252df9554c3e6");
    assert_eq!(group["size"], 12);
    assert_eq!(group["files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_csv_report_has_row_per_duplicate() {
    let (_dir, result) = sample_tree();

    let csv = CsvOutput::new(&result).to_string().unwrap();
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();

    assert_eq!(reader.headers().unwrap().len(), 5);
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(&row[0], "1");
        assert_eq!(&row[2], "12");
    }
}

#[test]
fn test_text_report_via_write_report() {
    let (_dir, result) = sample_tree();
    let mut buf = Vec::new();

    write_report(&result, OutputFormat::Text, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    assert!(text.contains("Duplicate groups:   1"));
    assert!(text.contains("a.txt"));
    assert!(!text.contains("c.txt"));
}

#[test]
fn test_emit_report_to_file() {
    let (dir, result) = sample_tree();
    let out = dir.path().join("report.json");

    emit_report(&result, OutputFormat::Json, Some(&out)).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["summary"]["reclaimable_space"], 12);
}

#[test]
fn test_emit_report_bad_path_is_error() {
    let (dir, result) = sample_tree();
    let out = dir.path().join("missing-dir").join("report.csv");

    let err = emit_report(&result, OutputFormat::Csv, Some(&out)).unwrap_err();

    assert!(err.to_string().contains("Failed to create output file"));
}

/// Collected pieces of a rendered HTML report.
#[derive(Default)]
struct ParsedReport {
    group_cards: usize,
    group_count: String,
    paths: Vec<String>,
}

fn parse_html_report(html: &str) -> ParsedReport {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(html);
    reader.config_mut().trim_text(true);

    let mut parsed = ParsedReport::default();
    let mut in_group_count = false;
    let mut in_path = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) => {
                let class = e
                    .try_get_attribute("class")
                    .unwrap()
                    .map(|a| a.unescape_value().unwrap().into_owned());
                let id = e
                    .try_get_attribute("id")
                    .unwrap()
                    .map(|a| a.unescape_value().unwrap().into_owned());
                match e.name().as_ref() {
                    b"details" if class.as_deref() == Some("group-card") => {
                        parsed.group_cards += 1;
                    }
                    b"div" if id.as_deref() == Some("group-count") => in_group_count = true,
                    b"td" if class.as_deref() == Some("path") => in_path = true,
                    _ => {}
                }
            }
            Event::Text(t) => {
                let text = t.unescape().unwrap().into_owned();
                if in_group_count {
                    parsed.group_count.push_str(&text);
                } else if in_path {
                    parsed.paths.push(text);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"div" => in_group_count = false,
                b"td" => in_path = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    parsed
}

#[test]
fn test_html_report_written_and_parsed() {
    let dir = tempdir().unwrap();
    let odd_name = "odd <&'\"> name.txt";
    fs::write(dir.path().join("plain.txt"), b"small dup").unwrap();
    fs::write(dir.path().join(odd_name), b"small dup").unwrap();
    let big = vec![7u8; 4096];
    fs::write(dir.path().join("big1.bin"), &big).unwrap();
    fs::write(dir.path().join("big2.bin"), &big).unwrap();
    fs::write(dir.path().join("big3.bin"), &big).unwrap();
    let result = scan(dir.path(), ScanConfig::default().with_min_size(1)).unwrap();

    let out_dir = tempdir().unwrap();
    let out = out_dir.path().join("report.html");
    emit_report(&result, OutputFormat::Html, Some(&out)).unwrap();

    let html = fs::read_to_string(&out).unwrap();
    assert!(!html.contains(odd_name));
    let parsed = parse_html_report(&html);

    assert_eq!(parsed.group_cards, 2);
    assert_eq!(parsed.group_count, "2");
    assert_eq!(parsed.paths.len(), 5);
    // Largest wasted space first: three 4 KiB copies before two small ones.
    assert!(parsed.paths[..3].iter().all(|p| p.ends_with(".bin")));
    let odd_path = dir.path().join(odd_name);
    assert!(parsed.paths.contains(&odd_path.to_string_lossy().into_owned()));
}
