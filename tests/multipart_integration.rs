use cofftool::digest::new_boundary;
use cofftool::multipart::MultipartWriter;
use tempfile::tempdir;

struct Part {
    headers: Vec<(String, String)>,
    body: String,
}

/// Splits a multipart/form-data body the way RFC 7578 receivers do: on `\r\n--boundary`,
/// with the final delimiter marked by a trailing `--`.
fn parse_multipart(body: &str, boundary: &str) -> Vec<Part> {
    let first = format!("--{boundary}\r\n");
    let delimiter = format!("\r\n--{boundary}");
    let rest = body.strip_prefix(&first).expect("body starts with first delimiter");
    let mut parts = Vec::new();
    let mut remaining = rest;
    loop {
        let end = remaining.find(&delimiter).expect("part is delimited");
        let (part, after) = remaining.split_at(end);
        let (head, content) = part.split_once("\r\n\r\n").expect("headers end");
        let headers = head
            .split("\r\n")
            .map(|line| {
                let (name, value) = line.split_once(": ").expect("header line");
                (name.to_ascii_lowercase(), value.to_string())
            })
            .collect();
        parts.push(Part {
            headers,
            body: content.to_string(),
        });
        let after = &after[delimiter.len()..];
        if after == "--" {
            break;
        }
        remaining = after.strip_prefix("\r\n").expect("CRLF after delimiter");
    }
    parts
}

fn header<'p>(part: &'p Part, name: &str) -> &'p str {
    part.headers
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
        .expect("header present")
}

#[test]
fn attached_file_round_trips_through_parser() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("coveralls.json");
    let content =
        "{\"source_files\":[{\"name\":\"a/B.java\",\"coverage\":[null,1]}],\n\"note\":\"ünïcode\"}";
    std::fs::write(&path, content).unwrap();

    let boundary = new_boundary();
    let body = MultipartWriter::scoped(Vec::new(), boundary.clone(), |w| {
        w.attach_file("json_file", &path)
    })
    .unwrap();
    let body = String::from_utf8(body).unwrap();

    assert!(body.starts_with(&format!("--{boundary}\r\n")));
    assert!(body.ends_with(&format!("--{boundary}--")));
    assert!(!body.ends_with("\r\n"));

    let parts = parse_multipart(&body, &boundary);
    assert_eq!(parts.len(), 1);
    assert_eq!(
        header(&parts[0], "content-disposition"),
        "form-data; name=\"json_file\"; filename=\"coveralls.json\""
    );
    assert_eq!(
        header(&parts[0], "content-type"),
        "application/json; charset=UTF-8"
    );
    assert_eq!(header(&parts[0], "content-transfer-encoding"), "binary");
    assert_eq!(parts[0].body, content);
}

#[test]
fn multiple_fields_share_one_terminator() {
    let boundary = "b0und4ry";
    let body = MultipartWriter::scoped(Vec::new(), boundary, |w| {
        w.attach_bytes("first", "one.json", b"{\"n\":1}")?;
        w.attach_bytes("second", "two.json", b"{\"n\":2}")
    })
    .unwrap();
    let body = String::from_utf8(body).unwrap();

    assert_eq!(body.matches("--b0und4ry--").count(), 1);
    let parts = parse_multipart(&body, boundary);
    assert_eq!(parts.len(), 2);
    assert!(header(&parts[1], "content-disposition").contains("name=\"second\""));
    assert_eq!(parts[0].body, "{\"n\":1}");
    assert_eq!(parts[1].body, "{\"n\":2}");
}

#[test]
fn invalid_utf8_is_replaced_not_rejected() {
    let body = MultipartWriter::scoped(Vec::new(), "b", |w| {
        w.attach_bytes("json_file", "x.json", &[b'{', 0xff, b'}'])
    })
    .unwrap();
    let body = String::from_utf8(body).expect("output is valid UTF-8");
    assert!(body.contains("{\u{fffd}}"));
}
