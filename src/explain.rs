use crate::models::IssueExplanation;

const FALLBACK_EXPLANATION: &str = "Potential risk identified.";

/// Issue templates and their explanations, in checklist order.
const TEMPLATES: &[(&str, &str)] = &[
    (
        "Invalid URL format",
        "The URL provided could not be parsed as a valid HTTP/HTTPS link.",
    ),
    (
        "Not using HTTPS",
        "Without HTTPS, data between the client and server isn't encrypted and could be intercepted.",
    ),
    (
        "TLS certificate invalid or expired",
        "An invalid or expired certificate means the site's identity can't be verified, making it unsafe.",
    ),
    (
        "Domain age",
        "Newly registered domains are often used for phishing campaigns.",
    ),
    (
        "Generic 'login' page title",
        "A generic login page without brand context may indicate a phishing attempt.",
    ),
    (
        "Form posts externally",
        "Forms that submit to a different domain can capture credentials for malicious use.",
    ),
    (
        "Redirect chain length",
        "Long redirect chains can be used to obfuscate the final landing page.",
    ),
];

/// Attach an explanation to every issue, preserving order.
///
/// An issue matches the first template whose leading word equals the
/// issue's leading word. This is deliberately loose: any future issue that
/// starts with e.g. "Domain" will share the domain-age explanation.
pub fn explain(issues: &[String]) -> Vec<IssueExplanation> {
    issues
        .iter()
        .map(|issue| IssueExplanation {
            issue: issue.clone(),
            explanation: explanation_for(issue).to_owned(),
        })
        .collect()
}

fn explanation_for(issue: &str) -> &'static str {
    let Some(word) = issue.split_whitespace().next() else {
        return FALLBACK_EXPLANATION;
    };
    TEMPLATES
        .iter()
        .find(|(key, _)| key.split_whitespace().next() == Some(word))
        .map(|(_, explanation)| *explanation)
        .unwrap_or(FALLBACK_EXPLANATION)
}
