//! Message texts and keyboards of the form bot.
//!
//! Texts use the transport's HTML subset (`<b>`, `<code>`, `<a>`). Every
//! user-supplied value is escaped before it is embedded.

use chrono::{DateTime, Utc};
use formdesk_core::admin::AdminAction;
use formdesk_core::form::{FormRecord, FormStatistics, FormStatus, FormStep, FormSummary, SearchField};
use formdesk_core::identity::UserId;
use formdesk_core::transport::{Button, Keyboard};

pub const WELCOME: &str = "Welcome! Please answer the questions below.";
pub const ADMIN_WELCOME: &str = "👨‍💼 Welcome, administrator! Choose an action:";
pub const SUBMITTED: &str = "✅ Your form has been sent. We will contact you soon!";
pub const CAREFUL_CHECK: &str = "⚠️ Your form will be checked with particular care.";
pub const CANCELLED: &str = "The form has been cancelled. Send /start to begin again.";
pub const NO_SESSION: &str = "Send /start to fill in the form.";
pub const ADMIN_ONLY: &str = "⛔ Only administrators can use these buttons.";
pub const CALLBACK_FAILED: &str = "❌ Something went wrong while processing the request.";
pub const SEARCH_FAILED: &str = "❌ Search failed. Please try again.";
pub const REPLY_PROMPT: &str = "Enter the reply text for the user:";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Escapes the characters that are significant in the HTML subset.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Link that opens the profile of `user_id`.
pub fn user_link(user_id: UserId, name: &str) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user_id,
        escape_html(name)
    )
}

fn label(step: FormStep) -> &'static str {
    match step {
        FormStep::Citizenship => "Citizenship",
        FormStep::Age => "Age",
        FormStep::Fullname => "Full name",
        FormStep::City => "Registered in",
        FormStep::Address => "Lives in",
        FormStep::BadHabits => "Habits",
        FormStep::Username => "Username",
        FormStep::Travel => "Business trips",
        FormStep::License => "Driving license",
        FormStep::Phone => "Phone",
        FormStep::Passport => "International passport",
        FormStep::Experience => "Work experience",
        FormStep::PassportFront | FormStep::PassportBack | FormStep::Selfie => "",
    }
}

fn field_lines(record: &FormRecord) -> String {
    FormStep::text_steps()
        .map(|step| {
            let value = match step {
                FormStep::Fullname => user_link(record.user_id, &record.fullname),
                FormStep::Username => format!("@{}", escape_html(&record.username)),
                other => escape_html(record.field(other)),
            };
            format!("<b>{}:</b> {}\n", label(step), value)
        })
        .collect()
}

/// Full notification sent to admins when a form is completed.
pub fn submission_text(record: &FormRecord) -> String {
    format!("<b>📋 New form submitted:</b>\n\n{}", field_lines(record))
}

/// Fallback notification for forms whose full text is too long.
pub fn submission_short_text(record: &FormRecord) -> String {
    format!(
        "<b>📋 New form:</b>\n\n<b>Full name:</b> {}\n<b>User ID:</b> {}",
        user_link(record.user_id, &record.fullname),
        record.user_id
    )
}

/// Picks the full or short notification depending on `limit` (in characters).
pub fn submission_notification(record: &FormRecord, limit: usize) -> String {
    let full = submission_text(record);
    if full.chars().count() > limit {
        submission_short_text(record)
    } else {
        full
    }
}

/// Re-broadcast after a status change.
pub fn status_changed_text(record: &FormRecord, status: FormStatus) -> String {
    format!(
        "<b>📋 Form marked as {}:</b>\n\n{}",
        status.label(),
        field_lines(record)
    )
}

/// Search hit with status and creation time.
pub fn search_result_text(record: &FormRecord) -> String {
    format!(
        "<b>📋 Form:</b>\n\n{}<b>Status:</b> {}\n<b>Created:</b> {}\n",
        field_lines(record),
        record.status,
        format_timestamp(record.created_at)
    )
}

pub fn search_prompt(field: SearchField) -> String {
    format!("Enter the {} to search for:", field.describe())
}

pub fn search_not_found(field: SearchField, query: &str) -> String {
    format!(
        "⚠️ No forms found with {} '{}'.",
        field.describe(),
        escape_html(query)
    )
}

pub fn status_confirmation(status: FormStatus) -> String {
    match status {
        FormStatus::Transferred => "📦 Marked as transferred".to_string(),
        FormStatus::Rejected => "🗑 Marked as rejected".to_string(),
        FormStatus::Pending => "Marked as pending".to_string(),
    }
}

pub fn form_not_found(user_id: UserId) -> String {
    format!("⚠️ No form found for user {}.", user_id)
}

pub fn new_user_notice(user_id: UserId, name: &str) -> String {
    format!(
        "🔔 New user: {}\nID: <code>{}</code>",
        user_link(user_id, name),
        user_id
    )
}

pub fn rejected_before_warning(user_id: UserId) -> String {
    format!(
        "⚠️ This user was previously marked as REJECTED.\nID: <code>{}</code>",
        user_id
    )
}

pub fn admin_reply(text: &str) -> String {
    format!("💬 Reply from the administrator:\n\n{}", text)
}

pub fn reply_delivered(user_id: UserId) -> String {
    format!("✅ Message delivered to user {}", user_id)
}

pub fn reply_failed(error: &str) -> String {
    format!("❌ Delivery failed: {}", escape_html(error))
}

/// Prompt for `step`, preceded by a hint when the previous input had the
/// wrong shape.
pub fn wrong_shape(step: FormStep) -> String {
    let hint = match step.expected_shape() {
        formdesk_core::form::InputShape::Photo => "Please send a photo.",
        formdesk_core::form::InputShape::Text => "Please answer with text.",
    };
    format!("{}\n\n{}", hint, step.prompt())
}

pub fn transferred_summary(period: &str, items: &[FormSummary]) -> String {
    if items.is_empty() {
        return format!("⚠️ No transferred forms {}.", period);
    }
    let lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "- {} ({})",
                escape_html(&item.fullname),
                format_timestamp(item.created_at)
            )
        })
        .collect();
    format!("📅 Transferred {}:\n{}", period, lines.join("\n"))
}

pub fn transferred_count(count: u64) -> String {
    format!("📊 Transferred forms in the last month: {}", count)
}

pub fn statistics_text(stats: &FormStatistics) -> String {
    format!(
        "📊 <b>Bot statistics</b>\n\n\
         👥 Users: <b>{}</b>\n\
         📋 Forms submitted: <b>{}</b>\n\
         🗑 Rejected: <b>{}</b>\n\
         ✅ Transferred: <b>{}</b>",
        stats.total_users, stats.total_forms, stats.rejected, stats.transferred
    )
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Buttons attached to a form notification.
pub fn review_keyboard(user_id: UserId) -> Keyboard {
    let button = |text: &str, action: AdminAction| Button::new(text, action.callback_data());
    Keyboard::new(vec![
        vec![button("✅ Transferred", AdminAction::MarkTransferred(user_id))],
        vec![button("🗑 Rejected", AdminAction::MarkRejected(user_id))],
        vec![button("✉️ Reply", AdminAction::ReplyTo(user_id))],
        vec![
            button("📆 Last week", AdminAction::SummaryWeek),
            button("📅 Last month", AdminAction::SummaryMonth),
        ],
    ])
}

/// Admin control panel shown on `/start`.
pub fn control_keyboard() -> Keyboard {
    let button = |text: &str, action: AdminAction| Button::new(text, action.callback_data());
    Keyboard::new(vec![
        vec![button(
            "🔍 Search by full name",
            AdminAction::Search(SearchField::FullName),
        )],
        vec![button(
            "📱 Search by phone",
            AdminAction::Search(SearchField::Phone),
        )],
        vec![button(
            "📅 Transferred this month",
            AdminAction::ListTransferredMonth,
        )],
        vec![button(
            "📊 Transferred count this month",
            AdminAction::CountTransferredMonth,
        )],
        vec![button("📊 Statistics", AdminAction::Statistics)],
    ])
}
