//! Fixed checklist of phishing signals evaluated over a redirect chain.

use url::{Host, Url};

use crate::models::{AnalysisResult, HopRecord};

/// Chains longer than this are flagged.
const MAX_QUIET_CHAIN_LEN: usize = 5;

/// Registrations younger than this many days are flagged.
const YOUNG_DOMAIN_DAYS: i64 = 30;

/// `true` for `http`/`https` URLs with a non-empty host.
///
/// The scheme must be followed by `//`: WHATWG parsing would otherwise supply
/// a host for inputs such as `http:example.com`.
pub fn is_valid_url(url: &str) -> bool {
    let has_authority = url
        .split_once(':')
        .is_some_and(|(_, rest)| rest.starts_with("//"));
    has_authority
        && Url::parse(url)
        .map(|u| {
            matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty())
        })
        .unwrap_or(false)
}

/// Run the checklist over `chain` and produce the verdict.
///
/// Checks look at the first hop, except the chain-length check. Issue order
/// is fixed since explanations are looked up by each issue's leading word.
pub fn evaluate(chain: Vec<HopRecord>, original_url: &str) -> AnalysisResult {
    let issues = collect_issues(&chain, original_url);
    AnalysisResult {
        safe: issues.is_empty(),
        issues,
        redirect_details: chain,
    }
}

fn collect_issues(chain: &[HopRecord], original_url: &str) -> Vec<String> {
    let mut issues = Vec::new();

    let first = chain.first();
    let first_url = first.map(HopRecord::url).unwrap_or(original_url);
    let parsed = Url::parse(first_url).ok();
    let scheme = parsed.as_ref().map(Url::scheme).unwrap_or_default();
    let host = parsed
        .as_ref()
        .and_then(Url::host)
        .map(display_host)
        .unwrap_or_default()
        .to_lowercase();

    if !is_valid_url(original_url) {
        issues.push("Invalid URL format".to_owned());
    }

    if scheme != "https" {
        issues.push("Not using HTTPS".to_owned());
    }

    if first.and_then(HopRecord::tls_valid) == Some(false) {
        issues.push("TLS certificate invalid or expired".to_owned());
    }

    if let Some(age) = first
        .map(HopRecord::domain_age_days)
        .filter(|age| (0..YOUNG_DOMAIN_DAYS).contains(age))
    {
        issues.push(format!("Domain age is only {age} days"));
    }

    let title = first.map(HopRecord::title).unwrap_or_default();
    let lowered_title = title.to_lowercase();
    if lowered_title.contains("login") && !lowered_title.contains(&host) {
        issues.push(format!("Generic 'login' page title: '{title}'"));
    }

    for action in first.map(HopRecord::form_actions).unwrap_or_default() {
        if !action.is_empty() && !action.contains(&host) {
            issues.push(format!("Form posts externally to '{action}'"));
        }
    }

    if chain.len() > MAX_QUIET_CHAIN_LEN {
        issues.push(format!(
            "Redirect chain length is {} (>{})",
            chain.len(),
            MAX_QUIET_CHAIN_LEN
        ));
    }

    issues
}

/// Host as a reader sees it: IDNs in Unicode, IPv6 without brackets.
fn display_host(host: Host<&str>) -> String {
    match host {
        Host::Domain(domain) => url::quirks::domain_to_unicode(domain),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailedHop, FetchedHop, UNKNOWN_DOMAIN_AGE};

    fn hop(url: &str) -> FetchedHop {
        FetchedHop {
            url: url.into(),
            status_code: 200,
            ip: Some("198.51.100.4".into()),
            tls_valid: Some(true),
            cert_issuer: Some("R11".into()),
            domain_age_days: 4000,
            title: "Example".into(),
            form_actions: vec![],
        }
    }

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://a.b"));
        assert!(is_valid_url("http://example.com/path?q=1"));
        assert!(!is_valid_url("ftp://x.com"));
        assert!(!is_valid_url("mailto:someone@example.com"));
        assert!(!is_valid_url("http://"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("http:example.com"));
        assert!(!is_valid_url("http:/example.com"));
        assert!(!is_valid_url(r"https:\\example.com"));
    }

    #[test]
    fn authority_less_url_is_reported_invalid() {
        let result = evaluate(vec![], "http:example.com");
        assert_eq!(result.issues, vec!["Invalid URL format", "Not using HTTPS"]);
    }

    #[test]
    fn clean_https_page_is_safe() {
        let result = evaluate(
            vec![HopRecord::Fetched(hop("https://example.com/"))],
            "https://example.com/",
        );
        assert!(result.safe);
        assert!(result.issues.is_empty());
        assert_eq!(result.redirect_details.len(), 1);
    }

    #[test]
    fn phishing_page_trips_every_first_hop_check() {
        let chain = vec![HopRecord::Fetched(FetchedHop {
            url: "http://bad.com".into(),
            status_code: 200,
            ip: None,
            tls_valid: None,
            cert_issuer: None,
            domain_age_days: 5,
            title: "Login".into(),
            form_actions: vec!["http://evil.com/collect".into()],
        })];

        let result = evaluate(chain, "http://bad.com");

        assert!(!result.safe);
        assert_eq!(
            result.issues,
            vec![
                "Not using HTTPS",
                "Domain age is only 5 days",
                "Generic 'login' page title: 'Login'",
                "Form posts externally to 'http://evil.com/collect'",
            ]
        );
    }

    #[test]
    fn invalid_tls_is_flagged_only_when_known_false() {
        let mut bad = hop("https://example.com/");
        bad.tls_valid = Some(false);
        let result = evaluate(vec![HopRecord::Fetched(bad)], "https://example.com/");
        assert_eq!(result.issues, vec!["TLS certificate invalid or expired"]);

        let mut unknown = hop("https://example.com/");
        unknown.tls_valid = None;
        assert!(evaluate(vec![HopRecord::Fetched(unknown)], "https://example.com/").safe);
    }

    #[test]
    fn domain_age_bounds() {
        for (age, flagged) in [(0, true), (29, true), (30, false), (UNKNOWN_DOMAIN_AGE, false)] {
            let mut h = hop("https://example.com/");
            h.domain_age_days = age;
            let result = evaluate(vec![HopRecord::Fetched(h)], "https://example.com/");
            assert_eq!(!result.safe, flagged, "age {age}");
        }
    }

    #[test]
    fn branded_login_title_is_not_flagged() {
        let mut h = hop("https://bank.example/");
        h.title = "bank.example - Login".into();
        assert!(evaluate(vec![HopRecord::Fetched(h)], "https://bank.example/").safe);
    }

    #[test]
    fn unicode_host_matches_unicode_title_and_forms() {
        let mut h = hop("https://bücher.example/");
        h.title = "Bücher.example Login".into();
        h.form_actions = vec!["https://bücher.example/pay".into()];
        assert!(evaluate(vec![HopRecord::Fetched(h)], "https://bücher.example/").safe);
    }

    #[test]
    fn only_foreign_non_empty_form_actions_are_flagged() {
        let mut h = hop("https://shop.example/");
        h.form_actions = vec![
            "".into(),
            "https://shop.example/cart".into(),
            "https://collector.test/a".into(),
            "/relative".into(),
        ];
        let result = evaluate(vec![HopRecord::Fetched(h)], "https://shop.example/");
        assert_eq!(
            result.issues,
            vec![
                "Form posts externally to 'https://collector.test/a'",
                "Form posts externally to '/relative'",
            ]
        );
    }

    #[test]
    fn long_chain_is_flagged() {
        let mut chain: Vec<HopRecord> = (0..5)
            .map(|i| {
                let mut h = hop(&format!("https://example.com/{i}"));
                h.status_code = 302;
                HopRecord::Fetched(h)
            })
            .collect();
        chain.push(HopRecord::Fetched(hop("https://example.com/final")));

        let result = evaluate(chain, "https://example.com/0");

        assert_eq!(result.issues, vec!["Redirect chain length is 6 (>5)"]);
    }

    #[test]
    fn failed_first_hop_is_tolerated() {
        let chain = vec![HopRecord::Failed(FailedHop {
            url: "https://down.example/".into(),
            error: "connection refused".into(),
        })];

        let result = evaluate(chain, "https://down.example/");

        assert!(result.safe);
        assert_eq!(result.redirect_details.len(), 1);
    }

    #[test]
    fn unparseable_input_is_invalid_and_not_https() {
        let chain = vec![HopRecord::Failed(FailedHop {
            url: "not a url".into(),
            error: "builder error".into(),
        })];

        let result = evaluate(chain, "not a url");

        assert_eq!(result.issues, vec!["Invalid URL format", "Not using HTTPS"]);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let chain = vec![HopRecord::Fetched(FetchedHop {
            title: "Login portal".into(),
            ..hop("http://x.example/")
        })];
        let a = evaluate(chain.clone(), "http://x.example/");
        let b = evaluate(chain, "http://x.example/");
        assert_eq!(a, b);
    }
}
