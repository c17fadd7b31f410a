//! Screen implementations. Each screen is a top-level Component.

mod alarms;
mod instances;
mod investigation;

pub use alarms::AlarmsScreen;
pub use instances::InstancesScreen;
pub use investigation::InvestigationScreen;

use crate::component::Component;
use crate::screen::ScreenId;

/// Create all screens in tab-bar order.
pub fn create_screens() -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (ScreenId::Instances, Box::new(InstancesScreen::new())),
        (ScreenId::Alarms, Box::new(AlarmsScreen::new())),
        (
            ScreenId::Investigation,
            Box::new(InvestigationScreen::new()),
        ),
    ]
}
