//! Web-UI transport: a small set of org settings GitHub does not expose
//! through the REST or GraphQL APIs, read and written by driving a headless
//! browser session. The browser itself is an opaque capability this crate
//! only talks to through `BrowserSession`; the settings table that maps a
//! setting name to where it lives on the page is the only thing owned here.

use std::collections::HashMap;

use otterdog_types::{OtterdogError, Result};
use serde_json::Value;

/// Where one setting lives on a settings page.
#[derive(Debug, Clone)]
pub struct SettingLocator {
    pub selector: String,
    pub value_selector: String,
    pub save_selector: String,
}

/// `page_url_suffix -> setting -> locator`, loaded from an external table
/// file; not evaluated by this crate.
#[derive(Debug, Clone, Default)]
pub struct WebUiSettingsTable {
    pub pages: HashMap<String, HashMap<String, SettingLocator>>,
}

impl WebUiSettingsTable {
    pub fn locate(&self, setting: &str) -> Option<(&str, &SettingLocator)> {
        self.pages.iter().find_map(|(page, settings)| {
            settings
                .get(setting)
                .map(|locator| (page.as_str(), locator))
        })
    }
}

/// The opaque browser-control capability. A real implementation drives a
/// headless browser; this crate only specifies the interface it consumes.
pub trait BrowserSession {
    fn read_checked(&mut self, page_url: &str, selector: &str) -> Result<bool>;
    fn read_value(&mut self, page_url: &str, selector: &str) -> Result<String>;
    fn set_checked(&mut self, page_url: &str, selector: &str, value: bool) -> Result<()>;
    fn fill(&mut self, page_url: &str, selector: &str, value: &str) -> Result<()>;
    /// Clicks the save control. Called twice by `WebUiTransport` per write
    /// (trial then live) to work around client-side enablement that only
    /// arms the real save button after a first, discarded click.
    fn click(&mut self, page_url: &str, selector: &str) -> Result<()>;
}

/// The reference implementation mixes `"True"`/`True` when writing boolean
/// settings through this transport. Both are accepted as equivalent on
/// write; this crate always normalizes to the string form since that is
/// what the page's form fields expect, and does not extend the leniency
/// beyond booleans.
pub fn normalize_bool_for_web(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(if *b { "True".to_string() } else { "False".to_string() }),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some("True".to_string()),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some("False".to_string()),
        _ => None,
    }
}

pub struct WebUiTransport<'a> {
    session: &'a mut dyn BrowserSession,
    table: WebUiSettingsTable,
}

impl<'a> WebUiTransport<'a> {
    pub fn new(session: &'a mut dyn BrowserSession, table: WebUiSettingsTable) -> Self {
        Self { session, table }
    }

    pub fn get_setting(&mut self, setting: &str) -> Result<Value> {
        let (page, locator) = self
            .table
            .locate(setting)
            .ok_or_else(|| OtterdogError::Provider {
                status: 0,
                url: setting.to_string(),
                body: "no web-UI locator for setting".into(),
            })?;
        let (page, selector) = (page.to_string(), locator.value_selector.clone());
        let value = self.session.read_value(&page, &selector)?;
        Ok(Value::String(value))
    }

    pub fn update_setting(&mut self, setting: &str, value: &Value) -> Result<()> {
        let (page, locator) = self
            .table
            .locate(setting)
            .ok_or_else(|| OtterdogError::Provider {
                status: 0,
                url: setting.to_string(),
                body: "no web-UI locator for setting".into(),
            })?
            .to_owned_locator();
        if let Some(normalized) = normalize_bool_for_web(value) {
            self.session.set_checked(&page, &locator.selector, normalized == "True")?;
        } else if let Some(text) = value.as_str() {
            self.session.fill(&page, &locator.selector, text)?;
        }
        // Trial click, then the live save click.
        self.session.click(&page, &locator.save_selector)?;
        self.session.click(&page, &locator.save_selector)?;
        Ok(())
    }
}

trait LocateExt {
    fn to_owned_locator(self) -> (String, SettingLocator);
}

impl LocateExt for (&str, &SettingLocator) {
    fn to_owned_locator(self) -> (String, SettingLocator) {
        (self.0.to_string(), self.1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSession {
        clicks: Vec<(String, String)>,
        checked: HashMap<String, bool>,
        filled: HashMap<String, String>,
    }

    impl FakeSession {
        fn new() -> Self {
            Self {
                clicks: Vec::new(),
                checked: HashMap::new(),
                filled: HashMap::new(),
            }
        }
    }

    impl BrowserSession for FakeSession {
        fn read_checked(&mut self, _page_url: &str, selector: &str) -> Result<bool> {
            Ok(*self.checked.get(selector).unwrap_or(&false))
        }

        fn read_value(&mut self, _page_url: &str, selector: &str) -> Result<String> {
            Ok(self.filled.get(selector).cloned().unwrap_or_default())
        }

        fn set_checked(&mut self, _page_url: &str, selector: &str, value: bool) -> Result<()> {
            self.checked.insert(selector.to_string(), value);
            Ok(())
        }

        fn fill(&mut self, _page_url: &str, selector: &str, value: &str) -> Result<()> {
            self.filled.insert(selector.to_string(), value.to_string());
            Ok(())
        }

        fn click(&mut self, page_url: &str, selector: &str) -> Result<()> {
            self.clicks.push((page_url.to_string(), selector.to_string()));
            Ok(())
        }
    }

    fn table() -> WebUiSettingsTable {
        let mut pages = HashMap::new();
        let mut settings = HashMap::new();
        settings.insert(
            "members_can_create_pages".to_string(),
            SettingLocator {
                selector: "#mccp".to_string(),
                value_selector: "#mccp".to_string(),
                save_selector: "#save".to_string(),
            },
        );
        pages.insert("/organizations/acme/settings/member_privileges".to_string(), settings);
        WebUiSettingsTable { pages }
    }

    #[test]
    fn boolean_settings_normalize_to_capitalized_strings() {
        assert_eq!(
            normalize_bool_for_web(&Value::Bool(true)),
            Some("True".to_string())
        );
        assert_eq!(
            normalize_bool_for_web(&serde_json::json!("true")),
            Some("True".to_string())
        );
        assert_eq!(
            normalize_bool_for_web(&Value::Bool(false)),
            Some("False".to_string())
        );
    }

    #[test]
    fn update_setting_clicks_save_twice() {
        let mut session = FakeSession::new();
        let mut transport = WebUiTransport::new(&mut session, table());
        transport
            .update_setting("members_can_create_pages", &Value::Bool(true))
            .unwrap();
        assert_eq!(session.clicks.len(), 2);
        assert_eq!(session.checked.get("#mccp"), Some(&true));
    }
}
