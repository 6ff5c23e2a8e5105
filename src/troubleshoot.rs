//! Remediation text shown when the speech service cannot be reached.

/// Proxy variables that commonly break outbound HTTPS from a shell.
pub const PROXY_VARS: [&str; 8] = [
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "NO_PROXY",
    "http_proxy",
    "https_proxy",
    "all_proxy",
    "no_proxy",
];

/// Troubleshooting hints for a failed connection to `host`.
///
/// `lookup` reads an environment variable; only non-blank values count as set.
pub fn network_hints<F>(host: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let found: Vec<&str> = PROXY_VARS
        .iter()
        .copied()
        .filter(|name| lookup(name).is_some_and(|v| !v.trim().is_empty()))
        .collect();

    let mut lines = vec!["Troubleshooting:".to_string()];
    if found.is_empty() {
        lines.push("- No proxy env vars detected.".to_string());
    } else {
        lines.push(format!("- Proxy env vars detected: {}", found.join(", ")));
        lines.push("  If you are not intentionally using a proxy, clear them for this shell:".to_string());
        lines.push(format!("    unset {}", found.join(" ")));
    }
    lines.push("- Verify DNS/network:".to_string());
    lines.push(format!("    nslookup {host}"));
    lines.push(format!("    curl -I https://{host}"));
    lines.push("- If you are on a restricted network, try a different network (hotspot) or disable VPN.".to_string());
    lines.join("\n")
}

/// Host part of a base URL, for the manual checks.
pub fn host_of(base_url: &str) -> &str {
    let rest = base_url
        .split_once("://")
        .map_or(base_url, |(_, rest)| rest);
    rest.split(['/', ':', '?']).next().unwrap_or(rest)
}
