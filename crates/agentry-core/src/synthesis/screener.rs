//! Code Safety Screener — denylist scan over generated source text.
//!
//! This is advisory pattern matching, not sandboxing. It catches the obvious
//! forms of process execution, dynamic evaluation and raw file or network
//! access, and does nothing against obfuscated spellings (string
//! concatenation, encoded payloads, aliases). The real containment is that
//! generated definitions are data interpreted by a fixed executor.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

/// Literal symbols that must not appear anywhere in generated text.
const DANGEROUS_SYMBOLS: &[&str] = &[
    "os.system",
    "subprocess",
    "__import__",
    "std::process",
    "Command::new",
    "libc::",
    "std::fs",
    "File::open",
    "File::create",
    "std::net",
    "TcpStream",
    "UdpSocket",
    "include_str!",
    "include_bytes!",
    "ftplib",
    "urllib",
];

/// Call-site forms, matched case-insensitively.
const DANGEROUS_CALLS: &[&str] = &[
    r"os\.system\s*\(",
    r"subprocess\s*\.",
    r"\beval\s*\(",
    r"\bexec\s*\(",
    r"__import__\s*\(",
    r"\bcompile\s*\(",
    r"\bopen\s*\(",
    r"\braw_input\s*\(",
    r"Command::new\s*\(",
    r"File::(open|create)\s*\(",
    r"\bsocket\s*\.\s*\w+\s*\(",
    r"urllib\s*\.",
    r"\brequests\s*\.\s*(get|post|put|patch|delete|head|request|session)\s*\(",
    r"ftplib\s*\.",
];

const PATH_TRAVERSAL: &str = r#"(open|read_to_string|File::open|File::create)\s*\([^)]*["']\.\./"#;

/// Networking libraries, matched as whole words anywhere in the text.
///
/// `requests` is a common English word, so it only counts in an import
/// (`import requests`, `from requests import ...`) or attribute form
/// (`requests.get`).
const NETWORK_USAGE: &str = concat!(
    r"\b(socket|urllib\d?|http\.client|http\.server|https?lib\d?|aiohttp|httpx|ftplib",
    r"|reqwest|hyper|tcpstream|udpsocket|std::net)\b",
    r"|\b(import|from)\s+requests\b",
    r"|\brequests\.\w+",
);

struct Patterns {
    calls: Vec<(&'static str, Regex)>,
    traversal: Regex,
    network: Regex,
}

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("screener pattern is valid")
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        calls: DANGEROUS_CALLS
            .iter()
            .map(|p| (*p, case_insensitive(p)))
            .collect(),
        traversal: case_insensitive(PATH_TRAVERSAL),
        network: case_insensitive(NETWORK_USAGE),
    })
}

/// Scan `source` and return every matched issue. Empty means pass.
pub fn screen(source: &str) -> Vec<String> {
    let mut issues = Vec::new();
    let patterns = patterns();

    for symbol in DANGEROUS_SYMBOLS {
        if source.contains(symbol) {
            issues.push(format!("Dangerous import detected: {}", symbol));
        }
    }

    for (pattern, re) in &patterns.calls {
        if re.is_match(source) {
            issues.push(format!("Dangerous operation detected: {}", pattern));
        }
    }

    if patterns.traversal.is_match(source) {
        issues.push("Attempt to access files outside generated directory".to_string());
    }

    if patterns.network.is_match(source) {
        issues.push("Network operations detected - not allowed in generated agents".to_string());
    }

    issues
}

const TERMINATION_TOKENS: &[&str] = &["TERMINATE", "END", "END OF CODE"];

/// Strip known response markers from a backend reply.
///
/// Fence lines (```` ``` ```` with or without a language tag) are removed
/// wherever they occur; termination tokens are removed only when they stand
/// alone on the trailing lines, so ordinary text containing "END" survives.
pub fn strip_markers(reply: &str) -> String {
    let mut lines: Vec<&str> = reply
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect();

    while let Some(last) = lines.last() {
        let trimmed = last.trim();
        if trimmed.is_empty() || TERMINATION_TOKENS.contains(&trimmed) {
            lines.pop();
        } else {
            break;
        }
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"template_version: "1.0.0"
kind: worker
constructor: [name, behavior_prompt, spec]
handler: on_message
persona: "Summarizes long articles into three bullet points"
behavior_prompt: null
reflect_on_tool_use: false
"#;

    #[test]
    fn test_clean_definition_passes() {
        assert!(screen(CLEAN).is_empty(), "{:?}", screen(CLEAN));
    }

    #[test]
    fn test_process_execution_flagged() {
        let issues = screen("persona: \"x\"\nhook: os.system('rm -rf /')\n");
        assert!(issues.contains(&"Dangerous import detected: os.system".to_string()));
        assert!(issues.iter().any(|i| i.contains(r"os\.system")));
    }

    #[test]
    fn test_call_sites_are_case_insensitive() {
        let issues = screen("x = EVAL (payload)");
        assert!(issues.iter().any(|i| i.contains(r"\beval\s*\(")));
    }

    #[test]
    fn test_path_traversal_flagged() {
        let issues = screen("data = open(\"../secrets.txt\")");
        assert!(issues.contains(&"Attempt to access files outside generated directory".to_string()));
    }

    #[test]
    fn test_networking_flagged_anywhere() {
        let issues = screen("let c = reqwest::Client::new();");
        assert!(issues
            .contains(&"Network operations detected - not allowed in generated agents".to_string()));

        let issues = screen("use std::net::TcpStream;");
        assert!(issues.contains(&"Dangerous import detected: TcpStream".to_string()));
        assert!(issues.contains(&"Dangerous import detected: std::net".to_string()));
    }

    fn flags_network(source: &str) -> bool {
        screen(source)
            .contains(&"Network operations detected - not allowed in generated agents".to_string())
    }

    #[test]
    fn test_python_network_libraries_flagged() {
        assert!(flags_network("from requests import get"));
        assert!(flags_network("import requests"));
        assert!(flags_network("r = requests.Session()"));
        assert!(flags_network("import http.client"));
        assert!(flags_network("conn = http.client.HTTPSConnection('evil.example')"));
        assert!(flags_network("import aiohttp"));
        assert!(flags_network("import httpx"));
        assert!(flags_network("import urllib3"));
        assert!(flags_network("import httplib2"));
        assert!(flags_network("s = socket.create_connection(('h', 80))"));
    }

    #[test]
    fn test_rust_network_crates_flagged() {
        assert!(flags_network("use hyper::Client;"));
        assert!(flags_network("let s = TcpStream::connect(addr);"));
    }

    #[test]
    fn test_prose_mentions_are_not_calls() {
        assert!(screen("persona: \"Handles user requests and opens tickets\"").is_empty());
        assert!(screen("persona: \"Summarizes websocket logs and hyperlinks\"").is_empty());
    }

    #[test]
    fn test_strip_markers() {
        let reply = "```yaml\nkind: worker\npersona: \"THE END of the line\"\n```\nTERMINATE\n";
        assert_eq!(
            strip_markers(reply),
            "kind: worker\npersona: \"THE END of the line\""
        );
        assert_eq!(strip_markers("kind: worker\nEND OF CODE\nEND"), "kind: worker");
        assert_eq!(strip_markers("  plain  "), "plain");
    }
}
