use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Campaign, EmailPayload, Subscriber};
use crate::settings::SenderSettings;

/// `{name}` placeholders in campaign content and layouts.
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([\p{L}\p{N}_]+?)\}").unwrap());

/// Substitutes known placeholders. Unknown ones, such as literal braces in
/// campaign copy, are kept as written.
fn fill_template(template: &str, vars: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            vars.get(key)
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Layout wrapped around the campaign content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Newsletter,
    Promotional,
    Welcome,
}

impl Template {
    /// Unknown or missing ids fall back to the newsletter layout.
    pub fn from_id(id: Option<&str>) -> Self {
        match id {
            Some("promotional") => Template::Promotional,
            Some("welcome") => Template::Welcome,
            _ => Template::Newsletter,
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Template::Newsletter => include_str!("templates/newsletter.html"),
            Template::Promotional => include_str!("templates/promotional.html"),
            Template::Welcome => include_str!("templates/welcome.html"),
        }
    }
}

pub fn unsubscribe_url(public_url: &str, subscriber_id: i32) -> String {
    format!(
        "{}/unsubscribe?token={subscriber_id}",
        public_url.trim_end_matches('/')
    )
}

/// Renders the campaign for one subscriber.
///
/// The campaign content is rendered first with the subscriber's own fields,
/// then placed into the layout selected by the campaign's template id.
#[must_use]
pub fn build_payload(
    campaign: &Campaign,
    subscriber: &Subscriber,
    public_url: &str,
    sender: &SenderSettings,
) -> EmailPayload {
    let name = subscriber.display_name();
    let sender_name = sender.name.clone().unwrap_or_else(|| sender.email.clone());

    // 1) Render the inner content with subscriber fields
    let mut fields: HashMap<&str, String> = HashMap::new();
    fields.insert("email", subscriber.email.clone());
    fields.insert(
        "first_name",
        subscriber.first_name.clone().unwrap_or_default(),
    );
    fields.insert("last_name", subscriber.last_name.clone().unwrap_or_default());
    fields.insert(
        "subscriber_name",
        name.clone().unwrap_or_else(|| "there".to_string()),
    );
    let content = fill_template(&campaign.content, &fields);

    // 2) Render the layout around it
    let greeting = match name.as_deref() {
        Some(name) => format!("Hi {name},"),
        None => "Hello there,".to_string(),
    };
    let mut layout_fields: HashMap<&str, String> = HashMap::new();
    layout_fields.insert("subject", campaign.subject.clone());
    layout_fields.insert("content", content);
    layout_fields.insert("greeting", greeting);
    layout_fields.insert("sender_name", sender_name);
    layout_fields.insert("unsubscribe_url", unsubscribe_url(public_url, subscriber.id));
    layout_fields.insert("cta_text", "Learn More".to_string());
    layout_fields.insert("cta_url", public_url.to_string());

    let template = Template::from_id(campaign.template_id.as_deref());
    let html_body = fill_template(template.source(), &layout_fields);
    let text_body = html2text::from_read(html_body.as_bytes(), 80)
        .map(|text| text.replace('\u{00a0}', " "))
        .ok();

    EmailPayload {
        recipient: subscriber.email.clone(),
        subject: campaign.subject.clone(),
        html_body,
        text_body,
        sender_email: sender.email.clone(),
        sender_name: sender.name.clone(),
    }
}
