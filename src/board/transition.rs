use crate::error::SyncError;
use crate::model::board::Transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Ticket already sits in the destination's entry status.
    AlreadyInPlace,
    Apply(&'a Transition),
}

/// Pick the transition that moves a ticket into `destination_entry`.
///
/// If more than one cached transition targets the status, the first in
/// fetch order wins.
pub fn resolve<'a>(
    current_status: &str,
    destination_entry: &str,
    transitions: &'a [Transition],
) -> Result<Resolution<'a>, SyncError> {
    if current_status == destination_entry {
        return Ok(Resolution::AlreadyInPlace);
    }
    if transitions.is_empty() {
        return Err(SyncError::TransitionsUnavailable);
    }
    transitions
        .iter()
        .find(|t| t.to_status_id == destination_entry)
        .map(Resolution::Apply)
        .ok_or_else(|| SyncError::NoMatchingTransition {
            status: destination_entry.to_string(),
        })
}
