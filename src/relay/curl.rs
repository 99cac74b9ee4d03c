//! Debug command reconstruction.
//!
//! Renders the outbound request as a `curl` invocation and exposes it,
//! percent-encoded, in the `x-curl-command` response header. The command is
//! for humans only; nothing parses or runs it.

use axum::http::{HeaderName, HeaderValue};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::relay::compose::OutboundRequest;

pub const CURL_COMMAND_HEADER: HeaderName = HeaderName::from_static("x-curl-command");

/// Encoded commands at or above this length are not attached. Keeps the
/// header well under common server and proxy header-size limits.
pub const MAX_CURL_HEADER_LEN: usize = 40_960;

/// Characters left as-is by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn curl_command(request: &OutboundRequest) -> String {
    let mut command = format!(
        "curl -X {} {}",
        request.method,
        shell_quote(&request.url)
    );

    for (name, value) in &request.headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        command.push_str(" -H ");
        command.push_str(&shell_quote(&format!("{}: {}", name, value)));
    }

    command.push_str(" --data-raw ");
    command.push_str(&shell_quote(&String::from_utf8_lossy(&request.body)));
    command
}

/// Header value for the request, or `None` when the encoded command is too
/// long to ship.
pub fn curl_header(request: &OutboundRequest) -> Option<HeaderValue> {
    let encoded = utf8_percent_encode(&curl_command(request), URI_COMPONENT).to_string();
    if encoded.len() >= MAX_CURL_HEADER_LEN {
        tracing::debug!(
            url = %request.url,
            encoded_len = encoded.len(),
            "Debug command too long, header omitted"
        );
        return None;
    }
    HeaderValue::from_str(&encoded).ok()
}

fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}
