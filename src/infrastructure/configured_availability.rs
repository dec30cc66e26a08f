// Availability gate driven by relay configuration
use crate::application::location_ports::AvailabilityGate;
use crate::infrastructure::config::ProviderSettings;

#[derive(Debug, Clone)]
pub struct ConfiguredAvailabilityGate {
    available: bool,
    unavailable_code: Option<i32>,
    user_resolvable: bool,
}

impl ConfiguredAvailabilityGate {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            available: settings.available,
            unavailable_code: settings.unavailable_code,
            user_resolvable: settings.user_resolvable,
        }
    }
}

impl AvailabilityGate for ConfiguredAvailabilityGate {
    fn is_available(&self) -> bool {
        self.available
    }

    fn unavailable_code(&self) -> Option<i32> {
        if self.available {
            None
        } else {
            self.unavailable_code
        }
    }

    fn is_user_resolvable(&self, _code: i32) -> bool {
        self.user_resolvable
    }

    fn describe_error(&self, code: i32) -> String {
        match code {
            1 => "location services are missing".to_string(),
            2 => "location services need an update".to_string(),
            3 => "location services are disabled".to_string(),
            9 => "location services are invalid".to_string(),
            18 => "location services are updating".to_string(),
            other => format!("location services error {}", other),
        }
    }
}
