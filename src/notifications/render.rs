use askama::Template;
use unicode_segmentation::UnicodeSegmentation;

use crate::blog::posts::Post;
use crate::blog::subscribers::Subscriber;
use crate::domain::{ApplicationBaseUrl, SubscriberEmail, SubscriberToken};
use crate::notifications::OutgoingEmail;

const EXCERPT_GRAPHEMES: usize = 300;

#[derive(Template)]
#[template(path = "emails/post_notification.txt")]
struct PostNotificationText<'a> {
    title: &'a str,
    excerpt: &'a str,
    url: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/post_notification.html")]
struct PostNotificationHtml<'a> {
    title: &'a str,
    excerpt: &'a str,
    url: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/subscribe_confirm.txt")]
struct SubscribeConfirmText<'a> {
    confirm_url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/subscribe_confirm.html")]
struct SubscribeConfirmHtml<'a> {
    confirm_url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/manage_subscription.txt")]
struct ManageSubscriptionText<'a> {
    manage_url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/manage_subscription.html")]
struct ManageSubscriptionHtml<'a> {
    manage_url: &'a str,
}

/// First 300 graphemes of the content, with a trailing ellipsis when
/// truncated.
pub fn excerpt(content: &str) -> String {
    let mut graphemes = content.grapheme_indices(true);
    match graphemes.nth(EXCERPT_GRAPHEMES) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

pub fn confirm_url(base_url: &ApplicationBaseUrl, token: &SubscriberToken) -> String {
    base_url.absolute(&format!("/blog/subscribe/confirm/{token}"))
}

pub fn unsubscribe_url(base_url: &ApplicationBaseUrl, token: &SubscriberToken) -> String {
    base_url.absolute(&format!("/blog/unsubscribe/{token}"))
}

pub fn manage_url(base_url: &ApplicationBaseUrl, token: &SubscriberToken) -> String {
    base_url.absolute(&format!("/blog/subscribe/manage/{token}"))
}

pub fn post_url(base_url: &ApplicationBaseUrl, post: &Post) -> String {
    base_url.absolute(&post.path())
}

/// Plain-text body used when template rendering fails; delivery is never
/// blocked by a template error.
pub fn fallback_notification_body(
    title: &str,
    excerpt: &str,
    url: &str,
    unsubscribe_url: &str,
) -> String {
    format!("{title}\n\n{excerpt}\n\nRead more: {url}\n\nTo unsubscribe: {unsubscribe_url}")
}

#[tracing::instrument(
    name = "Render post notification",
    skip_all,
    fields(post_slug = %post.slug, recipient = %subscriber.email)
)]
pub fn post_notification(
    post: &Post,
    subscriber: &Subscriber,
    base_url: &ApplicationBaseUrl,
) -> OutgoingEmail {
    let subject = format!("New post: {}", post.title);
    let excerpt = excerpt(&post.content);
    let url = post_url(base_url, post);
    let unsubscribe_url = unsubscribe_url(base_url, &subscriber.token);

    let text_template = PostNotificationText {
        title: &post.title,
        excerpt: &excerpt,
        url: &url,
        unsubscribe_url: &unsubscribe_url,
    };
    let text_body = match text_template.render() {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Falling back to a plain-text notification body: {e}");
            return OutgoingEmail {
                recipient: subscriber.email.clone(),
                subject,
                text_body: fallback_notification_body(
                    &post.title,
                    &excerpt,
                    &url,
                    &unsubscribe_url,
                ),
                html_body: None,
            };
        }
    };
    let html_template = PostNotificationHtml {
        title: &post.title,
        excerpt: &excerpt,
        url: &url,
        unsubscribe_url: &unsubscribe_url,
    };
    let html_body = match html_template.render() {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::warn!("Skipping the html notification body: {e}");
            None
        }
    };

    OutgoingEmail {
        recipient: subscriber.email.clone(),
        subject,
        text_body,
        html_body,
    }
}

pub fn confirmation_email(
    recipient: &SubscriberEmail,
    token: &SubscriberToken,
    base_url: &ApplicationBaseUrl,
) -> OutgoingEmail {
    let confirm_url = confirm_url(base_url, token);
    let text_body = SubscribeConfirmText {
        confirm_url: &confirm_url,
    }
    .render()
    .unwrap_or_else(|e| {
        tracing::warn!("Falling back to a plain-text confirmation body: {e}");
        format!("Please confirm your subscription: {confirm_url}")
    });
    let html_body = SubscribeConfirmHtml {
        confirm_url: &confirm_url,
    }
    .render()
    .ok();

    OutgoingEmail {
        recipient: recipient.clone(),
        subject: "Confirm your subscription".to_string(),
        text_body,
        html_body,
    }
}

pub fn management_email(
    recipient: &SubscriberEmail,
    token: &SubscriberToken,
    base_url: &ApplicationBaseUrl,
) -> OutgoingEmail {
    let manage_url = manage_url(base_url, token);
    let text_body = ManageSubscriptionText {
        manage_url: &manage_url,
    }
    .render()
    .unwrap_or_else(|e| {
        tracing::warn!("Falling back to a plain-text management body: {e}");
        format!("Manage your subscription: {manage_url}")
    });
    let html_body = ManageSubscriptionHtml {
        manage_url: &manage_url,
    }
    .render()
    .ok();

    OutgoingEmail {
        recipient: recipient.clone(),
        subject: "Manage your subscription".to_string(),
        text_body,
        html_body,
    }
}
