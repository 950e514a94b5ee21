use criterion::{criterion_group, criterion_main, Criterion};

use mailnorm::model::envelope::{InputFormat, MessageEnvelope};
use mailnorm::parser::base64url::encode_url_safe_base64;

fn raw_message() -> String {
    let body = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\r\n".repeat(200);
    format!(
        "Subject: =?UTF-8?Q?Informe_trimestral_=E2=80=94_Q3?=\r\n\
From: =?ISO-8859-1?Q?Jos=E9?= <jose@example.com>\r\n\
To: a@example.com, \"B, Person\" <b@example.com>\r\n\
Date: Tue, 3 Sep 2024 09:15:00 +0200\r\n\
Content-Type: multipart/mixed; boundary=\"MIX\"\r\n\
\r\n\
--MIX\r\n\
Content-Type: multipart/alternative; boundary=\"ALT\"\r\n\
\r\n\
--ALT\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
{body}\r\n\
--ALT\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<html><body><p>{body}</p></body></html>\r\n\
--ALT--\r\n\
--MIX\r\n\
Content-Type: application/pdf; name=\"report.pdf\"\r\n\
Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQKJcfsj6IKNSAwIG9iago8PC9MZW5ndGggNiAwIFI+PgpzdHJlYW0K\r\n\
--MIX--\r\n"
    )
}

fn structured_envelope(body: &str) -> String {
    let data = encode_url_safe_base64(body.as_bytes());
    serde_json::json!({
        "id": "bench",
        "threadId": "bench",
        "payload": {
            "mimeType": "multipart/alternative",
            "headers": [
                { "name": "Subject", "value": "=?UTF-8?B?SW5mb3JtZSB0cmltZXN0cmFs?=" },
                { "name": "From", "value": "Jos\u{e9} <jose@example.com>" },
                { "name": "To", "value": "a@example.com, \"B, Person\" <b@example.com>" },
                { "name": "Date", "value": "Tue, 3 Sep 2024 09:15:00 +0200" }
            ],
            "parts": [
                { "mimeType": "text/plain", "body": { "data": data } },
                { "mimeType": "text/html", "body": { "data": data } }
            ]
        }
    })
    .to_string()
}

fn bench_normalize_raw(c: &mut Criterion) {
    let raw = raw_message();
    let envelope = MessageEnvelope::from_raw_bytes("bench", "bench", raw.as_bytes());

    c.bench_function("normalize_raw", |b| {
        b.iter(|| mailnorm::normalize(&envelope, InputFormat::Raw).unwrap())
    });
}

fn bench_normalize_structured(c: &mut Criterion) {
    let json = structured_envelope(&"Lorem ipsum dolor sit amet.\n".repeat(200));

    c.bench_function("normalize_structured_json", |b| {
        b.iter(|| mailnorm::normalize_json(&json, InputFormat::Full).unwrap())
    });
}

criterion_group!(benches, bench_normalize_raw, bench_normalize_structured);
criterion_main!(benches);
