//! Captured email and page content, as handed over by the content side.

use crate::domain_utils::DomainUtils;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(alias = "text")]
    pub display_text: String,
    #[serde(alias = "href")]
    pub destination_url: String,
}

impl Link {
    pub fn new(display_text: impl Into<String>, destination_url: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            destination_url: destination_url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailContent {
    #[serde(alias = "senderEmail")]
    pub sender_address: String,
    pub sender_domain: String,
    pub subject: String,
    pub body: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub url: String,
    pub domain: String,
    pub title: String,
    pub text: String,
    pub links: Vec<Link>,
    pub has_password_input: bool,
}

/// One captured email or web page. Built through [`ContentRecord::email`] /
/// [`ContentRecord::page`] or deserialized, both of which validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", try_from = "RawContentRecord")]
pub enum ContentRecord {
    Email(EmailContent),
    #[serde(rename = "website")]
    Page(PageContent),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("email has neither a sender address nor a sender domain")]
    MissingSender,
    #[error("page has neither a URL nor a domain")]
    MissingLocation,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawContentRecord {
    Email(RawEmail),
    #[serde(rename = "website", alias = "page")]
    Page(RawPage),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEmail {
    #[serde(default, alias = "senderEmail")]
    sender_address: String,
    #[serde(default)]
    sender_domain: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    #[serde(default)]
    url: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default, alias = "hasPasswordForm")]
    has_password_input: bool,
}

impl TryFrom<RawContentRecord> for ContentRecord {
    type Error = ContentError;

    fn try_from(raw: RawContentRecord) -> Result<Self, Self::Error> {
        match raw {
            RawContentRecord::Email(e) => {
                let sender_domain = if e.sender_domain.trim().is_empty() {
                    DomainUtils::extract_domain(&e.sender_address)
                        .ok_or(ContentError::MissingSender)?
                } else {
                    DomainUtils::canonical_domain(&e.sender_domain)
                };
                Ok(ContentRecord::Email(EmailContent {
                    sender_address: e.sender_address,
                    sender_domain,
                    subject: e.subject,
                    body: e.body,
                    links: e.links,
                }))
            }
            RawContentRecord::Page(p) => {
                let domain = if !p.domain.trim().is_empty() {
                    DomainUtils::canonical_domain(&p.domain)
                } else if !p.url.trim().is_empty() {
                    DomainUtils::canonical_domain(&p.url)
                } else {
                    return Err(ContentError::MissingLocation);
                };
                Ok(ContentRecord::Page(PageContent {
                    url: p.url,
                    domain,
                    title: p.title,
                    text: p.text,
                    links: p.links,
                    has_password_input: p.has_password_input,
                }))
            }
        }
    }
}

impl ContentRecord {
    /// Capture an email. The sender domain is derived from the address.
    pub fn email(
        sender_address: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        links: Vec<Link>,
    ) -> Result<Self, ContentError> {
        let sender_address = sender_address.into();
        let sender_domain =
            DomainUtils::extract_domain(&sender_address).ok_or(ContentError::MissingSender)?;

        Ok(ContentRecord::Email(EmailContent {
            sender_address,
            sender_domain,
            subject: subject.into(),
            body: body.into(),
            links,
        }))
    }

    /// Capture a web page. The domain is derived from the URL.
    pub fn page(
        url: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
        links: Vec<Link>,
        has_password_input: bool,
    ) -> Result<Self, ContentError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ContentError::MissingLocation);
        }
        let domain = DomainUtils::canonical_domain(&url);

        Ok(ContentRecord::Page(PageContent {
            url,
            domain,
            title: title.into(),
            text: text.into(),
            links,
            has_password_input,
        }))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContentRecord::Email(_) => "email",
            ContentRecord::Page(_) => "website",
        }
    }

    pub fn links(&self) -> &[Link] {
        match self {
            ContentRecord::Email(e) => &e.links,
            ContentRecord::Page(p) => &p.links,
        }
    }

    /// Domain the record claims to come from: the sender domain of an email
    /// or the site domain of a page.
    pub fn origin_domain(&self) -> &str {
        match self {
            ContentRecord::Email(e) => &e.sender_domain,
            ContentRecord::Page(p) => &p.domain,
        }
    }

    /// Main readable text: the email body or the page text.
    pub fn main_text(&self) -> &str {
        match self {
            ContentRecord::Email(e) => &e.body,
            ContentRecord::Page(p) => &p.text,
        }
    }

    /// Heading plus main text, joined for keyword scanning.
    pub fn full_text(&self) -> String {
        match self {
            ContentRecord::Email(e) => format!("{}\n{}", e.subject, e.body),
            ContentRecord::Page(p) => format!("{}\n{}", p.title, p.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_derives_sender_domain() {
        let record =
            ContentRecord::email("alerts@PayPa1.com", "Hello", "Body", vec![]).unwrap();
        assert_eq!(record.origin_domain(), "paypa1.com");
        assert_eq!(record.kind(), "email");
    }

    #[test]
    fn test_email_without_sender_rejected() {
        assert_eq!(
            ContentRecord::email("nobody", "s", "b", vec![]),
            Err(ContentError::MissingSender)
        );
    }

    #[test]
    fn test_page_derives_domain() {
        let record = ContentRecord::page(
            "https://www.Login-Bank.com/signin",
            "Sign in",
            "",
            vec![],
            true,
        )
        .unwrap();
        assert_eq!(record.origin_domain(), "login-bank.com");
        assert_eq!(record.kind(), "website");
    }

    #[test]
    fn test_deserialize_email_with_original_field_names() {
        let json = r#"{
            "type": "email",
            "senderEmail": "support@amaz0n.com",
            "senderDomain": "amaz0n.com",
            "subject": "Account locked",
            "body": "Verify now",
            "links": [{"text": "amazon.com", "href": "http://evil.example/x"}]
        }"#;
        let record: ContentRecord = serde_json::from_str(json).unwrap();
        match &record {
            ContentRecord::Email(email) => {
                assert_eq!(email.sender_domain, "amaz0n.com");
                assert_eq!(email.links[0].display_text, "amazon.com");
            }
            _ => panic!("Expected email record"),
        }
    }

    #[test]
    fn test_deserialize_page_and_serialize_tag() {
        let json = r#"{"type":"website","url":"http://example.org/login","hasPasswordInput":true}"#;
        let record: ContentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.origin_domain(), "example.org");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "website");
        assert_eq!(value["hasPasswordInput"], true);
    }

    #[test]
    fn test_deserialize_rejects_anonymous_email() {
        let json = r#"{"type":"email","subject":"hi","body":""}"#;
        assert!(serde_json::from_str::<ContentRecord>(json).is_err());
    }
}
