//! Date-cell selector synthesis for the portal's datepicker widgets
//!
//! The portal spawns a fresh datepicker each time the range picker opens.
//! The first instance lives under a stable class root; every later one is
//! only reachable through a structural offset into `body` that advances by
//! a fixed step per instance. Those offsets are an empirical contract of
//! the portal build and come in through configuration.

use crate::config::CalendarOffsets;
use crate::models::CalendarPosition;

/// Root of the first datepicker instance on the page
const PRIMARY_CALENDAR_ROOT: &str = "body > div.datepicker.dropdown-menu";

/// CSS selector for the day cell at `position` inside datepicker `index`.
///
/// `index` counts datepicker instances opened so far in the session; the
/// cell path below the instance root is identical for all of them.
pub fn date_cell_selector(
    position: CalendarPosition,
    index: usize,
    offsets: CalendarOffsets,
) -> String {
    let root = if index == 0 {
        PRIMARY_CALENDAR_ROOT.to_string()
    } else {
        let offset = offsets.base as usize + (index - 1) * offsets.step as usize;
        format!("body > div:nth-child({offset})")
    };

    format!(
        "{root} > div.datepicker-days > table > tbody > tr:nth-child({}) > td:nth-child({})",
        position.week, position.weekday
    )
}
