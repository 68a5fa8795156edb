use std::fmt;
use std::str::FromStr;

use crate::error::FormdeskError;
use crate::form::SearchField;
use crate::identity::UserId;

pub const SUMMARY_WEEK_DAYS: i64 = 7;
pub const SUMMARY_MONTH_DAYS: i64 = 30;

/// An admin keyboard button press, parsed from its callback data.
///
/// The callback strings are part of the wire format of already-sent
/// keyboards and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    MarkTransferred(UserId),
    MarkRejected(UserId),
    ReplyTo(UserId),
    SummaryWeek,
    SummaryMonth,
    ListTransferredMonth,
    CountTransferredMonth,
    Statistics,
    Search(SearchField),
}

impl AdminAction {
    /// Callback data carried by the button for this action.
    pub fn callback_data(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminAction::MarkTransferred(id) => write!(f, "mark_transferred:{}", id),
            AdminAction::MarkRejected(id) => write!(f, "mark_rejected:{}", id),
            AdminAction::ReplyTo(id) => write!(f, "reply_to_user:{}", id),
            AdminAction::SummaryWeek => f.write_str("summary_week"),
            AdminAction::SummaryMonth => f.write_str("summary_month"),
            AdminAction::ListTransferredMonth => f.write_str("list_transferred_month"),
            AdminAction::CountTransferredMonth => f.write_str("count_transferred_month"),
            AdminAction::Statistics => f.write_str("statistics"),
            AdminAction::Search(SearchField::FullName) => f.write_str("search_fullname"),
            AdminAction::Search(SearchField::Phone) => f.write_str("search_phone"),
        }
    }
}

impl FromStr for AdminAction {
    type Err = FormdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((name, arg)) = s.split_once(':') {
            let id: UserId = arg.parse()?;
            return match name {
                "mark_transferred" => Ok(AdminAction::MarkTransferred(id)),
                "mark_rejected" => Ok(AdminAction::MarkRejected(id)),
                "reply_to_user" => Ok(AdminAction::ReplyTo(id)),
                _ => Err(FormdeskError::invalid_input(format!(
                    "unknown admin action '{}'",
                    s
                ))),
            };
        }

        match s {
            "summary_week" => Ok(AdminAction::SummaryWeek),
            "summary_month" => Ok(AdminAction::SummaryMonth),
            "list_transferred_month" => Ok(AdminAction::ListTransferredMonth),
            "count_transferred_month" => Ok(AdminAction::CountTransferredMonth),
            "statistics" => Ok(AdminAction::Statistics),
            "search_fullname" => Ok(AdminAction::Search(SearchField::FullName)),
            "search_phone" => Ok(AdminAction::Search(SearchField::Phone)),
            _ => Err(FormdeskError::invalid_input(format!(
                "unknown admin action '{}'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targeted_actions() {
        assert_eq!(
            "mark_transferred:999".parse::<AdminAction>().unwrap(),
            AdminAction::MarkTransferred(UserId(999))
        );
        assert_eq!(
            "mark_rejected:5".parse::<AdminAction>().unwrap(),
            AdminAction::MarkRejected(UserId(5))
        );
        assert_eq!(
            "reply_to_user:7".parse::<AdminAction>().unwrap(),
            AdminAction::ReplyTo(UserId(7))
        );
    }

    #[test]
    fn test_callback_data_is_stable() {
        let actions = [
            AdminAction::MarkTransferred(UserId(1)),
            AdminAction::MarkRejected(UserId(2)),
            AdminAction::ReplyTo(UserId(3)),
            AdminAction::SummaryWeek,
            AdminAction::SummaryMonth,
            AdminAction::ListTransferredMonth,
            AdminAction::CountTransferredMonth,
            AdminAction::Statistics,
            AdminAction::Search(SearchField::FullName),
            AdminAction::Search(SearchField::Phone),
        ];
        for action in actions {
            assert_eq!(action.callback_data().parse::<AdminAction>().unwrap(), action);
        }
        assert_eq!(
            AdminAction::Search(SearchField::Phone).callback_data(),
            "search_phone"
        );
    }

    #[test]
    fn test_malformed_data_is_rejected() {
        assert!("mark_transferred:abc".parse::<AdminAction>().is_err());
        assert!("delete_everything".parse::<AdminAction>().is_err());
        assert!("launch:1".parse::<AdminAction>().is_err());
    }
}
