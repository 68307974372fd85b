use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)```(?:javascript|js)?\s*(.*?)```").expect("valid regex");
    static ref NAVIGATE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r#"goto\s*\(\s*['"]([^'"]+)['"]"#).expect("valid regex"),
        Regex::new(r#"navigate\s*\(\s*['"]([^'"]+)['"]"#).expect("valid regex"),
        Regex::new(r#"url\s*:\s*['"]([^'"]+)['"]"#).expect("valid regex"),
        Regex::new(r#"location\.href\s*=\s*['"]([^'"]+)['"]"#).expect("valid regex"),
    ];
    static ref CLICK_PATTERN: Regex =
        Regex::new(r#"click\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid regex");
    static ref TYPE_PATTERN: Regex =
        Regex::new(r#"type\s*\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]*)['"]\s*\)"#)
            .expect("valid regex");
}

/// What a piece of generated code asks the browser to do. Recognized intents
/// run through the typed automation methods; anything else runs as a wrapped
/// in-page script.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserAction {
    Navigate { url: String },
    Click { selector: String },
    Type { selector: String, text: String },
    Script(String),
}

/// Prefix the user command with what we know about the target environment.
pub fn build_context(env_id: Option<&str>, last_url: Option<&str>, command: &str) -> String {
    let mut context = String::new();
    match env_id {
        Some(id) => {
            context.push_str(&format!("Current environment id: {id}\n"));
            if let Some(url) = last_url {
                context.push_str(&format!("Last known URL of this environment: {url}\n"));
            }
        }
        None => context.push_str("No environment selected; produce standalone code.\n"),
    }
    format!("{context}\nUser command: {command}")
}

/// Pull the first fenced code block out of a model reply.
pub fn extract_code_block(reply: &str) -> Option<String> {
    CODE_FENCE
        .captures(reply)
        .map(|c| c[1].trim().to_string())
        .filter(|code| !code.is_empty())
}

/// Translate generated code into a typed action instead of evaluating it
/// verbatim. Navigation wins over click, click over type, matching how the
/// driver-flavored snippets the models produce are structured.
pub fn plan_action(code: &str) -> BrowserAction {
    for pattern in NAVIGATE_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(code) {
            return BrowserAction::Navigate {
                url: captures[1].to_string(),
            };
        }
    }
    if let Some(captures) = CLICK_PATTERN.captures(code) {
        return BrowserAction::Click {
            selector: captures[1].to_string(),
        };
    }
    if let Some(captures) = TYPE_PATTERN.captures(code) {
        return BrowserAction::Type {
            selector: captures[1].to_string(),
            text: captures[2].to_string(),
        };
    }
    BrowserAction::Script(code.to_string())
}

/// Wrap free-form generated code so evaluation always yields a result object
/// instead of throwing into the CDP layer.
pub fn wrap_script(code: &str) -> String {
    format!(
        r#"(async () => {{
  try {{
    {code}
    return {{ success: true, message: 'code executed' }};
  }} catch (error) {{
    return {{ success: false, error: error.toString() }};
  }}
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_js_fence() {
        let reply = "Here you go:\n```js\nawait page.goto('https://example.com');\n```\nDone.";
        let code = extract_code_block(reply).unwrap();
        assert_eq!(code, "await page.goto('https://example.com');");
    }

    #[test]
    fn test_extract_javascript_fence() {
        let reply = "```javascript\nconsole.log(1);\n```";
        assert_eq!(extract_code_block(reply).unwrap(), "console.log(1);");
    }

    #[test]
    fn test_extract_bare_fence() {
        let reply = "```\ndocument.title\n```";
        assert_eq!(extract_code_block(reply).unwrap(), "document.title");
    }

    #[test]
    fn test_extract_none_without_fence() {
        assert!(extract_code_block("just prose, no code").is_none());
        assert!(extract_code_block("```js\n```").is_none());
    }

    #[test]
    fn test_plan_navigation_from_goto() {
        let action = plan_action("await page.goto('https://example.com/shop');");
        assert_eq!(
            action,
            BrowserAction::Navigate {
                url: "https://example.com/shop".into()
            }
        );
    }

    #[test]
    fn test_plan_navigation_from_location_href() {
        let action = plan_action("window.location.href = 'https://example.com';");
        assert_eq!(
            action,
            BrowserAction::Navigate {
                url: "https://example.com".into()
            }
        );
    }

    #[test]
    fn test_plan_click() {
        let action = plan_action("await page.click('#submit-btn');");
        assert_eq!(
            action,
            BrowserAction::Click {
                selector: "#submit-btn".into()
            }
        );
    }

    #[test]
    fn test_plan_type() {
        let action = plan_action("await page.type('#search', 'rust crates');");
        assert_eq!(
            action,
            BrowserAction::Type {
                selector: "#search".into(),
                text: "rust crates".into()
            }
        );
    }

    #[test]
    fn test_navigation_wins_over_click() {
        let code = "await page.goto('https://example.com');\nawait page.click('#ok');";
        assert!(matches!(plan_action(code), BrowserAction::Navigate { .. }));
    }

    #[test]
    fn test_plain_code_becomes_script() {
        let action = plan_action("document.querySelectorAll('a').length");
        assert!(matches!(action, BrowserAction::Script(_)));
    }

    #[test]
    fn test_context_includes_env_and_url() {
        let prompt = build_context(Some("env-1"), Some("https://example.com"), "open the cart");
        assert!(prompt.contains("env-1"));
        assert!(prompt.contains("https://example.com"));
        assert!(prompt.ends_with("User command: open the cart"));
    }

    #[test]
    fn test_context_without_environment() {
        let prompt = build_context(None, None, "do things");
        assert!(prompt.contains("No environment selected"));
    }

    #[test]
    fn test_wrap_script_embeds_code() {
        let wrapped = wrap_script("console.log('hi');");
        assert!(wrapped.contains("console.log('hi');"));
        assert!(wrapped.starts_with("(async () =>"));
    }
}
