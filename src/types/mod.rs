// TabSnooze shared type definitions
// Each submodule defines types used across the scheduling core.

pub mod delay;
pub mod delayed_tab;
pub mod errors;
pub mod recurrence;
pub mod settings;
