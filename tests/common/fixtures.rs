//! Static log corpora used across harnesses.
//!
//! Each corpus is a `&'static [&'static str]` of representative lines in one
//! format. Every line in a corpus parses in that corpus's format.

pub const CORPUS_JSON: &[&str] = &[
    r#"{"level":"INFO","message":"Server started","port":8080}"#,
    r#"{"severity":"ERROR","msg":"Connection refused","db":{"host":"db.internal","port":5432}}"#,
    r#"{"level":"warn","message":"Slow query","duration_ms":4200,"query":{"sql":"SELECT 1"}}"#,
    r#"{"log.level":"info","message":"Cache miss","key":"user:42","ttl":300}"#,
    r#"{"lvl":"err","msg":"Out of memory","rss_mb":16384}"#,
];

pub const CORPUS_APACHE: &[&str] = &[
    r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#,
    r#"10.0.0.7 - - [01/Feb/2024:08:00:00 +0000] "POST /login HTTP/1.1" 302 -"#,
];

pub const CORPUS_NGINX: &[&str] = &[
    r#"192.168.1.20 - - [15/Jan/2024:10:00:00 +0100] "GET /index.html HTTP/1.1" 200 512"#,
    r#"192.168.1.21 - alice [15/Jan/2024:10:00:01 +0100] "GET /api HTTP/2.0" 404 0 "https://example.org/" "curl/8.4.0""#,
];

pub const CORPUS_SYSLOG: &[&str] = &[
    "Mar 30 15:04:05 web01 sshd[4242]: Accepted publickey for deploy",
    "Jan  5 00:00:01 db02 cron: job finished",
];

pub const CORPUS_XML: &[&str] = &[
    r#"<log level="ERROR"><message> disk full </message><host>web01</host></log>"#,
    "<event>started</event>",
];

pub const CORPUS_CSV: &[&str] = &["2024-01-15, INFO ,api, started", "a,b"];

/// Lines that are not valid JSON.
pub const MALFORMED_JSON: &[&str] = &["{oops", r#"{"unterminated": "#, "plain text", ""];
