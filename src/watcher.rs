//! Web-mail navigation watcher.
//!
//! Web mail is a single-page app: opening a message only rewrites the URL
//! fragment. The watcher is fed every observed URL and reports an opened
//! message once per change.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref OPENED_MESSAGE: Regex = Regex::new(r"#(?:inbox|sent|all)/FM").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailOpened {
    pub url: String,
}

#[derive(Debug, Default)]
pub struct MailWatcher {
    last_href: Option<String>,
}

impl MailWatcher {
    /// Start from the URL the page was loaded with; it is not reported.
    pub fn new(initial_href: &str) -> Self {
        Self {
            last_href: Some(initial_href.to_string()),
        }
    }

    pub fn observe(&mut self, href: &str) -> Option<EmailOpened> {
        if self.last_href.as_deref() == Some(href) {
            return None;
        }
        self.last_href = Some(href.to_string());

        if is_opened_message(href) {
            log::debug!("Mail message opened: {}", href);
            Some(EmailOpened {
                url: href.to_string(),
            })
        } else {
            None
        }
    }
}

pub fn is_opened_message(href: &str) -> bool {
    OPENED_MESSAGE.is_match(href)
}
