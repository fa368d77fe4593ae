//! Per-tooth ignition timing corrector.
//!
//! Owns no state: on every accepted primary tooth it asks the output
//! scheduler to refine any channel whose end tooth was just reached.

use trigger_traits::{OutputScheduler, ScheduleStatus};

use crate::end_tooth::IgnitionEndTable;
use crate::state::EngineStatus;

/// Request refinements for every channel ending on `current_tooth`.
///
/// Returns the number of refinement requests issued.
pub fn check_per_tooth_timing(
    status: &EngineStatus,
    table: &IgnitionEndTable,
    outputs: &mut dyn OutputScheduler,
    crank_angle: i16,
    current_tooth: u16,
) -> u8 {
    if status.fixed_cranking_override || status.rpm == 0 {
        return 0;
    }
    let mut issued = 0;
    for (channel, entry) in table.iter() {
        if entry.end_tooth != current_tooth {
            continue;
        }
        match outputs.status(channel) {
            ScheduleStatus::Pending | ScheduleStatus::Running => {
                outputs.refine(channel, entry.end_angle, crank_angle);
                issued += 1;
            }
            ScheduleStatus::Off => {}
        }
    }
    issued
}
