use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::BookingConflict;

/// Structured detail of a signature attempt blocked by overlapping bookings.
///
/// Carried inside the typed conflict error so callers can show the rendered
/// text and still inspect the underlying list. Retrying the identical sign
/// command without resolving the overlap will fail again; the engine never
/// retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConflictReport {
    conflicts: Vec<BookingConflict>,
}

impl BookingConflictReport {
    pub fn new(conflicts: Vec<BookingConflict>) -> Self {
        Self { conflicts }
    }

    pub fn conflicts(&self) -> &[BookingConflict] {
        &self.conflicts
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for BookingConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot complete booking. The applicant has another contract booked during this period."
        )?;
        for conflict in &self.conflicts {
            write!(
                f,
                "\nContract #{}: {}\u{2013}{} ({})",
                conflict.id, conflict.start_date, conflict.end_date, conflict.status
            )?;
        }
        Ok(())
    }
}
