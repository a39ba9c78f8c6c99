//! Report mail assembly and delivery
//!
//! Builds the multipart MIME message by hand: a `multipart/related`
//! container holding a `multipart/alternative` (plain-text rendering first,
//! HTML view second) followed by the chart images, each anchored by a
//! `Content-ID` the HTML references via `cid:`. Delivery pipes the finished
//! message to the mail transfer agent with an explicit envelope.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use crate::process::{ToolError, ToolRunner};

const RELATED_BOUNDARY: &str = "=_sysstat_report_related";
const ALTERNATIVE_BOUNDARY: &str = "=_sysstat_report_alternative";

/// RFC 2045 body line limit for base64 parts
const BASE64_LINE_WIDTH: usize = 76;

#[derive(Debug, Error)]
pub enum MailError {
    /// Reading a chart artifact failed
    #[error("failed to read artifact {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mail transfer agent rejected the message
    #[error("mail transfer failed: {0}")]
    Transfer(ToolError),
}

/// Format the complete report message.
///
/// `images` and `texts` are parallel per-family artifact lists: each image
/// becomes an inline part with `Content-ID: <imgN>`, each text rendering is
/// concatenated into the plain-text alternative.
pub fn format_message(
    from: &str,
    to: &str,
    subject: &str,
    images: &[PathBuf],
    texts: &[PathBuf],
) -> Result<String, MailError> {
    let mut html = String::from("<html><head></head><body>");
    for i in 0..images.len() {
        if i > 0 {
            html.push_str("<br>");
        }
        html.push_str(&format!("<img src=\"cid:img{}\">", i));
    }
    html.push_str("</body></html>");

    let mut plain = Vec::with_capacity(texts.len());
    for path in texts {
        plain.push(read_artifact(path)?);
    }
    let plain = plain
        .iter()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let mut message = String::new();
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str(&format!("Subject: {}\r\n", subject));
    message.push_str(&format!("From: {}\r\n", from));
    message.push_str(&format!("To: {}\r\n", to));
    message.push_str(&format!(
        "Content-Type: multipart/related; boundary=\"{}\"\r\n\r\n",
        RELATED_BOUNDARY
    ));

    message.push_str(&format!("--{}\r\n", RELATED_BOUNDARY));
    message.push_str(&format!(
        "Content-Type: multipart/alternative; boundary=\"{}\"\r\n\r\n",
        ALTERNATIVE_BOUNDARY
    ));

    message.push_str(&format!("--{}\r\n", ALTERNATIVE_BOUNDARY));
    message.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n\r\n");
    message.push_str(&plain);
    message.push_str("\r\n");

    message.push_str(&format!("--{}\r\n", ALTERNATIVE_BOUNDARY));
    message.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n\r\n");
    message.push_str(&html);
    message.push_str("\r\n");
    message.push_str(&format!("--{}--\r\n", ALTERNATIVE_BOUNDARY));

    for (i, path) in images.iter().enumerate() {
        let bytes = read_artifact(path)?;
        message.push_str(&format!("--{}\r\n", RELATED_BOUNDARY));
        message.push_str("Content-Type: image/png\r\n");
        message.push_str("Content-Transfer-Encoding: base64\r\n");
        message.push_str(&format!("Content-ID: <img{}>\r\n\r\n", i));
        for chunk in wrap_base64(&BASE64.encode(&bytes)) {
            message.push_str(&chunk);
            message.push_str("\r\n");
        }
    }
    message.push_str(&format!("--{}--\r\n", RELATED_BOUNDARY));

    Ok(message)
}

/// Hand the formatted message to the mail transfer agent with an explicit
/// envelope sender and recipient
pub fn send(
    runner: &dyn ToolRunner,
    envelope_from: &str,
    envelope_to: &str,
    message: &str,
) -> Result<(), MailError> {
    runner
        .run(
            "sendmail",
            &["-f", envelope_from, envelope_to],
            Some(message.as_bytes()),
        )
        .map_err(MailError::Transfer)?;
    Ok(())
}

/// Bare address for the envelope: `"Name <a@b>"` yields `a@b`
pub fn envelope_address(header: &str) -> &str {
    match (header.rfind('<'), header.rfind('>')) {
        (Some(open), Some(close)) if open < close => &header[open + 1..close],
        _ => header.trim(),
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, MailError> {
    std::fs::read(path).map_err(|source| MailError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

fn wrap_base64(encoded: &str) -> Vec<String> {
    encoded
        .as_bytes()
        .chunks(BASE64_LINE_WIDTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::FakeRunner;

    #[test]
    fn test_envelope_address_extraction() {
        assert_eq!(envelope_address("root@example.com"), "root@example.com");
        assert_eq!(
            envelope_address("Admin <admin@example.com>"),
            "admin@example.com"
        );
        assert_eq!(envelope_address("  spaced@example.com  "), "spaced@example.com");
    }

    #[test]
    fn test_message_structure() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("cpu.png");
        std::fs::write(&png, b"PNGDATA").unwrap();
        let txt = dir.path().join("cpu.txt");
        std::fs::write(&txt, "ascii chart\n").unwrap();

        let message = format_message(
            "Admin <admin@example.com>",
            "ops@example.com",
            "Sysstat daily report",
            &[png],
            &[txt],
        )
        .unwrap();

        assert!(message.contains("Subject: Sysstat daily report\r\n"));
        assert!(message.contains("Content-Type: multipart/related"));
        assert!(message.contains("Content-Type: multipart/alternative"));
        assert!(message.contains("<img src=\"cid:img0\">"));
        assert!(message.contains("Content-ID: <img0>"));
        assert!(message.contains("ascii chart"));
        assert!(message.contains(&BASE64.encode(b"PNGDATA")));
        // HTML comes after the plain-text alternative
        let text_at = message.find("text/plain").unwrap();
        let html_at = message.find("text/html").unwrap();
        assert!(text_at < html_at);
    }

    #[test]
    fn test_text_alternatives_concatenated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("cpu.txt");
        std::fs::write(&first, "first chart").unwrap();
        let second = dir.path().join("memory.txt");
        std::fs::write(&second, "second chart").unwrap();

        let message = format_message(
            "a@example.com",
            "b@example.com",
            "Sysstat weekly report",
            &[],
            &[first, second],
        )
        .unwrap();

        assert!(message.contains("first chart\nsecond chart"));
    }

    #[test]
    fn test_base64_lines_are_wrapped() {
        let encoded = BASE64.encode(vec![0u8; 300]);
        let wrapped = wrap_base64(&encoded);
        assert!(wrapped.len() > 1);
        assert!(wrapped.iter().all(|line| line.len() <= BASE64_LINE_WIDTH));
        assert_eq!(wrapped.concat(), encoded);
    }

    #[test]
    fn test_missing_artifact_is_an_error() {
        let err = format_message(
            "a@example.com",
            "b@example.com",
            "Sysstat daily report",
            &[PathBuf::from("/nonexistent/cpu.png")],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, MailError::Artifact { .. }));
    }

    #[test]
    fn test_send_pipes_message_with_envelope() {
        let runner = FakeRunner::new();
        send(&runner, "admin@example.com", "ops@example.com", "the message").unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].program, "sendmail");
        assert_eq!(calls[0].args, vec!["-f", "admin@example.com", "ops@example.com"]);
        assert_eq!(calls[0].stdin.as_deref(), Some(b"the message".as_slice()));
    }

    #[test]
    fn test_transfer_failure_is_fatal() {
        let runner = FakeRunner::new();
        runner.fail("sendmail", "deferred");
        let err = send(&runner, "a@example.com", "b@example.com", "msg").unwrap_err();
        assert!(matches!(err, MailError::Transfer(_)));
    }
}
