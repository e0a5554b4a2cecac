use std::fmt;

use crate::model::board::{Column, Ticket};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AssigneeFilter {
    #[default]
    All,
    Unassigned,
    Email(String),
}

impl AssigneeFilter {
    pub fn parse(value: &str) -> Self {
        match value {
            "all" => AssigneeFilter::All,
            "unassigned" => AssigneeFilter::Unassigned,
            email => AssigneeFilter::Email(email.to_string()),
        }
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        match self {
            AssigneeFilter::All => true,
            AssigneeFilter::Unassigned => ticket.assignee_email.is_none(),
            AssigneeFilter::Email(email) => ticket.assignee_email.as_deref() == Some(email),
        }
    }
}

impl fmt::Display for AssigneeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssigneeFilter::All => f.write_str("all"),
            AssigneeFilter::Unassigned => f.write_str("unassigned"),
            AssigneeFilter::Email(email) => f.write_str(email),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeOption {
    pub filter: AssigneeFilter,
    pub label: String,
}

pub fn filter_tickets<'a>(tickets: &'a [Ticket], filter: &AssigneeFilter) -> Vec<&'a Ticket> {
    tickets.iter().filter(|t| filter.matches(t)).collect()
}

/// Tickets shown in `column` under `filter`.
pub fn column_tickets<'a>(tickets: &'a [Ticket], column: &Column, filter: &AssigneeFilter) -> Vec<&'a Ticket> {
    tickets
        .iter()
        .filter(|t| filter.matches(t) && column.holds(&t.status_id))
        .collect()
}

/// Filter options for the assignee picker.
///
/// Order is "all", then "unassigned" if any ticket lacks an assignee, then
/// `me` if present, then remaining assignees in first-seen order.
pub fn assignee_options(tickets: &[Ticket], me: Option<&str>) -> Vec<AssigneeOption> {
    let mut has_unassigned = false;
    let mut seen: Vec<(&str, &str)> = Vec::new();
    for ticket in tickets {
        match ticket.assignee_email.as_deref() {
            None => has_unassigned = true,
            Some(email) if !seen.iter().any(|(e, _)| *e == email) => {
                let label = ticket.assignee_name.as_deref().unwrap_or(email);
                seen.push((email, label));
            }
            Some(_) => {}
        }
    }

    let mut options = vec![AssigneeOption {
        filter: AssigneeFilter::All,
        label: "All".to_string(),
    }];
    if has_unassigned {
        options.push(AssigneeOption {
            filter: AssigneeFilter::Unassigned,
            label: "Unassigned".to_string(),
        });
    }
    if let Some(pos) = me.and_then(|me| seen.iter().position(|(e, _)| *e == me)) {
        let (email, label) = seen.remove(pos);
        options.push(AssigneeOption {
            filter: AssigneeFilter::Email(email.to_string()),
            label: format!("{label} (me)"),
        });
    }
    options.extend(seen.into_iter().map(|(email, label)| AssigneeOption {
        filter: AssigneeFilter::Email(email.to_string()),
        label: label.to_string(),
    }));
    options
}
