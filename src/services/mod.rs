// TabSnooze services
// Services provide core functionality: recurrence arithmetic, delay presets, and delay settings.

pub mod delay_presets;
pub mod recurrence_calculator;
pub mod settings_engine;
