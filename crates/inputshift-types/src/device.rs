//! Device descriptor types.

/// Service-client identity of one attached HID device session.
///
/// Two devices are the same device only if their ids are equal; vendor and
/// product ids may collide across physical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub u64);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A HID usage page / usage pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Usage {
    pub page: u32,
    pub usage: u32,
}

impl Usage {
    const GENERIC_DESKTOP: u32 = 0x01;

    pub const POINTER: Self = Self::desktop(0x01);
    pub const MOUSE: Self = Self::desktop(0x02);
    pub const KEYBOARD: Self = Self::desktop(0x06);
    pub const KEYPAD: Self = Self::desktop(0x07);

    const fn desktop(usage: u32) -> Self {
        Self {
            page: Self::GENERIC_DESKTOP,
            usage,
        }
    }
}

/// Properties of a HID service as reported when it is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    /// Product string (e.g. "MX Master 3").
    pub product: Option<String>,
    pub vendor_id: Option<u32>,
    pub product_id: Option<u32>,
    pub serial_number: Option<String>,
    /// Physical port / device instance location.
    pub location_id: Option<u32>,
    pub button_count: Option<u32>,
    /// Usages the service conforms to.
    pub usages: Vec<Usage>,
}

impl DeviceInfo {
    /// A descriptor with only the identity filled in.
    #[must_use]
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            product: None,
            vendor_id: None,
            product_id: None,
            serial_number: None,
            location_id: None,
            button_count: None,
            usages: Vec::new(),
        }
    }

    #[must_use]
    pub fn conforms_to(&self, usage: Usage) -> bool {
        self.usages.contains(&usage)
    }

    #[must_use]
    pub fn is_pointer_device(&self) -> bool {
        self.conforms_to(Usage::MOUSE) || self.conforms_to(Usage::POINTER)
    }

    #[must_use]
    pub fn is_key_device(&self) -> bool {
        self.conforms_to(Usage::KEYBOARD) || self.conforms_to(Usage::KEYPAD)
    }

    /// Informal label shown next to the device in status output.
    #[must_use]
    pub fn category(&self) -> DeviceCategory {
        if self.is_pointer_device() {
            let trackpad = self
                .product
                .as_deref()
                .is_some_and(|name| name.to_ascii_lowercase().contains("trackpad"));
            if trackpad {
                DeviceCategory::Trackpad
            } else {
                DeviceCategory::Mouse
            }
        } else if self.is_key_device() {
            DeviceCategory::Keyboard
        } else {
            DeviceCategory::Other
        }
    }
}

/// Informal device category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCategory {
    Mouse,
    Trackpad,
    Keyboard,
    Other,
}

impl std::fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mouse => write!(f, "mouse"),
            Self::Trackpad => write!(f, "trackpad"),
            Self::Keyboard => write!(f, "keyboard"),
            Self::Other => write!(f, "other"),
        }
    }
}
